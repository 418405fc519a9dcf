pub mod check;
mod host;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "archscope",
    version,
    about = "Cross-file capability resolution for architect-style JavaScript modules",
    long_about = "Archscope reads the consumes/provides declarations of architect modules, infers \
                  what each module registers, and reports what every consumer's `imports` \
                  parameter resolves to."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the imports of every module under a directory
    #[command(
        long_about = "Loads the modules found under DIR, runs inference passes until no more \
                      provider files are scheduled, and prints each consumer's imports binding \
                      together with the resolver's diagnostics."
    )]
    Check {
        /// Workspace directory containing the modules directory
        #[arg(value_name = "DIR")]
        path: PathBuf,

        /// Capability path table (JSON object of `_name` -> relative path).
        /// Derived from the modules' provides declarations when omitted.
        #[arg(long, value_name = "TABLE_JSON")]
        table: Option<PathBuf>,

        /// Resolver configuration file
        #[arg(long, value_name = "CONFIG_JSON")]
        config: Option<PathBuf>,

        /// Start from these files only and let providers load on demand
        #[arg(long, value_name = "FILE")]
        entry: Vec<PathBuf>,

        /// Upper bound on inference passes
        #[arg(long, default_value_t = 16)]
        max_passes: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let to_stderr = match &cli.command {
        Commands::Check { json, .. } => !json,
    };
    let _guard = archscope_core::logging::init_logging("cli", to_stderr);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Check {
            path,
            table,
            config,
            entry,
            max_passes,
            json,
        } => rt.block_on(check::run(check::CheckArgs {
            root: path,
            table,
            config,
            entries: entry,
            max_passes,
            json,
        })),
    }
}
