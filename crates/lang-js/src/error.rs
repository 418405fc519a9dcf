use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Grammar error: {0}")]
    Language(String),
    #[error("Parsing error: {0}")]
    Parsing(String),
    #[error("Type store error: {0}")]
    Types(#[from] archscope_api::ApiError),
}

pub type Result<T> = std::result::Result<T, JsError>;
