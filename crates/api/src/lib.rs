pub mod error;
pub mod models;
pub mod plugin;
pub mod syntax;

// Re-export commonly used types
pub use error::{ApiError, ApiResult};
pub use models::*;
pub use plugin::{DocFilter, EnginePlugin, InferenceHost};
