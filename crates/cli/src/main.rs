fn main() {
    if let Err(e) = archscope_cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
