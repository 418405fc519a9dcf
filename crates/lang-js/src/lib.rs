//! JavaScript support: tree-sitter parsing, shallow type inference and an
//! inference session that hosts [`archscope_api::EnginePlugin`]s.

pub mod doc;
pub mod engine;
pub mod error;
pub mod inference;
pub mod parser;

pub use doc::JsDocFilter;
pub use engine::{AnalysisReport, JsEngine};
pub use error::{JsError, Result};
pub use parser::JsParser;
