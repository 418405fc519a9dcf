use crate::models::{SourceFile, TypeStore, ValueId};
use std::any::Any;
use std::sync::Arc;

/// The side of an inference session that plugins talk to.
///
/// Node ids are tree-sitter node ids of the named file's current tree.
pub trait InferenceHost {
    fn types(&self) -> &TypeStore;

    fn types_mut(&mut self) -> &mut TypeStore;

    /// A loaded file by name.
    fn file(&self, name: &str) -> Option<Arc<SourceFile>>;

    /// Names of all loaded files, in load order.
    fn file_names(&self) -> Vec<String>;

    /// Value the engine inferred for an expression node.
    fn expression_value(&self, file: &str, node_id: usize) -> Option<ValueId>;

    /// A variable declared directly in the scope created by `scope_node_id`
    /// (a function or the program root). Enclosing scopes are not searched.
    fn scope_binding(&self, file: &str, scope_node_id: usize, name: &str) -> Option<ValueId>;

    /// Comment blocks immediately preceding `byte_offset`, outermost first.
    fn comments_before(&self, file: &str, byte_offset: usize) -> Vec<String>;

    /// Queue a file for loading into this session. `text` of `None` means
    /// the engine reads it itself. Already loaded or queued paths are
    /// ignored; the return value tells whether the file was newly queued.
    fn add_file(&mut self, path: &str, text: Option<String>, origin: Option<&str>) -> bool;
}

/// A pass hooked into an inference session.
///
/// Hooks may run any number of times per file and per program; plugins must
/// tolerate being re-entered with unchanged input.
pub trait EnginePlugin: Any {
    fn name(&self) -> &str;

    /// A file is about to be inferred.
    fn before_load(&mut self, _host: &mut dyn InferenceHost, _file: &str) {}

    /// A file has been parsed and inferred.
    fn after_load(&mut self, _host: &mut dyn InferenceHost, _file: &str) {}

    /// Every loaded file has been inferred.
    fn post_infer(&mut self, _host: &mut dyn InferenceHost) {}

    fn as_any(&self) -> &dyn Any;
}

/// Turns a raw comment block into documentation text.
pub trait DocFilter: Send + Sync {
    /// `None` when the comment carries no documentation.
    fn filter(&self, raw: &str) -> Option<String>;
}
