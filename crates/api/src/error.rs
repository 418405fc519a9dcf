#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unknown type id: {0}")]
    UnknownType(u32),
    #[error("Unknown value id: {0}")]
    UnknownValue(u32),
    #[error("Not an object type: {0}")]
    NotAnObject(u32),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
