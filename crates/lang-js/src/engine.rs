//! An inference session over a set of JavaScript files.
//!
//! Files are queued with [`JsEngine::add_file`] and loaded by
//! [`JsEngine::analyze`]: each queued file is parsed, announced to the
//! plugins (`before_load`), inferred, and announced again (`after_load`).
//! Once the queue is drained, every plugin's `post_infer` runs once. Files
//! queued during `post_infer` wait for the next `analyze` call.

use crate::error::Result;
use crate::inference::{FileInference, infer_file};
use crate::parser::{JsParser, comments_before};
use archscope_api::{EnginePlugin, InferenceHost, SourceFile, TypeStore, ValueId};
use indexmap::IndexMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

struct LoadedFile {
    source: Arc<SourceFile>,
    inference: FileInference,
    origin: Option<String>,
}

#[derive(Debug, Clone)]
struct PendingFile {
    path: String,
    text: Option<String>,
    origin: Option<String>,
}

/// Summary of one [`JsEngine::analyze`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    /// Files loaded by this call, in load order.
    pub loaded: Vec<String>,
    /// Files that could not be read or parsed.
    pub failed: Vec<String>,
    /// Files queued for the next call.
    pub queued: usize,
}

pub struct JsEngine {
    parser: JsParser,
    store: TypeStore,
    files: IndexMap<String, LoadedFile>,
    queue: VecDeque<PendingFile>,
    /// Paths that could not be read or parsed; not queued again from disk.
    failed: HashSet<String>,
    plugins: Vec<Box<dyn EnginePlugin>>,
}

impl JsEngine {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: JsParser::new()?,
            store: TypeStore::new(),
            files: IndexMap::new(),
            queue: VecDeque::new(),
            failed: HashSet::new(),
            plugins: Vec::new(),
        })
    }

    pub fn with_plugin(mut self, plugin: impl EnginePlugin) -> Self {
        self.register_plugin(Box::new(plugin));
        self
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn EnginePlugin>) {
        debug!("Registering inference plugin {}", plugin.name());
        self.plugins.push(plugin);
    }

    /// A registered plugin of a concrete type.
    pub fn plugin<T: EnginePlugin>(&self) -> Option<&T> {
        self.plugins
            .iter()
            .find_map(|plugin| plugin.as_any().downcast_ref::<T>())
    }

    /// Replace the text of a file. A loaded file goes back to the queue and
    /// is re-inferred by the next [`JsEngine::analyze`].
    pub fn update_file(&mut self, path: &str, text: impl Into<String>) {
        let origin = self
            .files
            .shift_remove(path)
            .and_then(|loaded| loaded.origin);
        self.queue.retain(|pending| pending.path != path);
        self.failed.remove(path);
        self.queue.push_back(PendingFile {
            path: path.to_string(),
            text: Some(text.into()),
            origin,
        });
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn is_queued(&self, path: &str) -> bool {
        self.queue.iter().any(|pending| pending.path == path)
    }

    pub fn has_failed(&self, path: &str) -> bool {
        self.failed.contains(path)
    }

    pub fn queued(&self) -> Vec<&str> {
        self.queue.iter().map(|p| p.path.as_str()).collect()
    }

    /// File that asked for `path` to be loaded, if any.
    pub fn origin_of(&self, path: &str) -> Option<&str> {
        if let Some(loaded) = self.files.get(path) {
            return loaded.origin.as_deref();
        }
        self.queue
            .iter()
            .find(|pending| pending.path == path)
            .and_then(|pending| pending.origin.as_deref())
    }

    /// Load everything queued, then run the post-inference pass once.
    pub fn analyze(&mut self) -> AnalysisReport {
        let mut report = AnalysisReport::default();
        while let Some(pending) = self.queue.pop_front() {
            let path = pending.path.clone();
            match self.load(pending) {
                Ok(()) => {
                    self.failed.remove(&path);
                    report.loaded.push(path);
                }
                Err(e) => {
                    warn!("Failed to load {}: {}", path, e);
                    self.failed.insert(path.clone());
                    report.failed.push(path);
                }
            }
        }

        self.dispatch(|plugin, host| plugin.post_infer(host));
        report.queued = self.queue.len();
        report
    }

    fn load(&mut self, pending: PendingFile) -> Result<()> {
        let text = match pending.text {
            Some(text) => text,
            None => std::fs::read_to_string(&pending.path)?,
        };
        let tree = self.parser.parse(&text)?;
        if tree.root_node().has_error() {
            debug!("{} has syntax errors, inferring what parsed", pending.path);
        }
        let source = Arc::new(SourceFile::new(pending.path.clone(), text, tree));
        self.files.insert(
            pending.path.clone(),
            LoadedFile {
                source: Arc::clone(&source),
                inference: FileInference::default(),
                origin: pending.origin,
            },
        );

        let path = pending.path;
        self.dispatch(|plugin, host| plugin.before_load(host, &path));

        let inference = infer_file(&source, &mut self.store)?;
        if let Some(loaded) = self.files.get_mut(&path) {
            loaded.inference = inference;
        }

        self.dispatch(|plugin, host| plugin.after_load(host, &path));
        Ok(())
    }

    fn dispatch(&mut self, mut hook: impl FnMut(&mut dyn EnginePlugin, &mut dyn InferenceHost)) {
        let mut plugins = std::mem::take(&mut self.plugins);
        for plugin in plugins.iter_mut() {
            hook(plugin.as_mut(), &mut *self);
        }
        plugins.append(&mut self.plugins);
        self.plugins = plugins;
    }
}

impl InferenceHost for JsEngine {
    fn types(&self) -> &TypeStore {
        &self.store
    }

    fn types_mut(&mut self) -> &mut TypeStore {
        &mut self.store
    }

    fn file(&self, name: &str) -> Option<Arc<SourceFile>> {
        self.files.get(name).map(|loaded| Arc::clone(&loaded.source))
    }

    fn file_names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn expression_value(&self, file: &str, node_id: usize) -> Option<ValueId> {
        self.files.get(file)?.inference.expression(node_id)
    }

    fn scope_binding(&self, file: &str, scope_node_id: usize, name: &str) -> Option<ValueId> {
        self.files.get(file)?.inference.scopes.own(scope_node_id, name)
    }

    fn comments_before(&self, file: &str, byte_offset: usize) -> Vec<String> {
        match self.files.get(file) {
            Some(loaded) => comments_before(loaded.source.root(), &loaded.source.text, byte_offset),
            None => Vec::new(),
        }
    }

    fn add_file(&mut self, path: &str, text: Option<String>, origin: Option<&str>) -> bool {
        if self.is_loaded(path) || self.is_queued(path) {
            return false;
        }
        if text.is_none() && self.has_failed(path) {
            debug!("Not queueing {} again: it failed to load", path);
            return false;
        }
        debug!("Queueing {} (requested by {:?})", path, origin);
        self.queue.push_back(PendingFile {
            path: path.to_string(),
            text,
            origin: origin.map(str::to_string),
        });
        true
    }
}
