pub mod capability;
pub mod source;
pub mod types;

pub use capability::*;
pub use source::*;
pub use types::*;
