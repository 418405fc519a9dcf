use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchscopeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Type store error: {0}")]
    Types(#[from] archscope_api::ApiError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Host channel error: {0}")]
    Host(String),
    #[error("Request already in flight: {0}")]
    RequestInFlight(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ArchscopeError>;
