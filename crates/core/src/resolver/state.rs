use super::binder::ImportsBinding;
use super::diagnostics::{Diagnostic, ResolveWarning, Severity};
use super::registry::ProviderRegistry;
use archscope_api::TypeId;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::{error, warn};

/// Names already warned about in this session.
#[derive(Debug, Default)]
pub struct WarnedSet(HashSet<String>);

impl WarnedSet {
    /// Returns `true` the first time a name is seen.
    pub fn first(&mut self, name: &str) -> bool {
        self.0.insert(name.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileStage {
    #[default]
    Unparsed,
    Parsed,
    Bound,
}

/// Everything the resolver remembers across files and passes.
#[derive(Debug, Default)]
pub struct ResolverState {
    pub registry: ProviderRegistry,
    /// File being bound; recorded as the origin of files it schedules.
    pub current_origin: Option<String>,
    warned_capabilities: WarnedSet,
    warned_files: WarnedSet,
    table_error_reported: bool,
    stages: HashMap<String, FileStage>,
    imports_objects: HashMap<String, TypeId>,
    bindings: IndexMap<String, ImportsBinding>,
    diagnostics: Vec<Diagnostic>,
}

impl ResolverState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, file: &str) -> FileStage {
        self.stages.get(file).copied().unwrap_or_default()
    }

    pub fn set_stage(&mut self, file: &str, stage: FileStage) {
        self.stages.insert(file.to_string(), stage);
    }

    /// Forget what was derived from a file's previous contents.
    pub fn reset_file(&mut self, file: &str) {
        self.stages.insert(file.to_string(), FileStage::Unparsed);
        self.imports_objects.remove(file);
        self.bindings.shift_remove(file);
    }

    pub fn imports_object(&self, file: &str) -> Option<TypeId> {
        self.imports_objects.get(file).copied()
    }

    pub fn set_imports_object(&mut self, file: &str, obj: TypeId) {
        self.imports_objects.insert(file.to_string(), obj);
    }

    pub fn binding(&self, file: &str) -> Option<&ImportsBinding> {
        self.bindings.get(file)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &ImportsBinding> + '_ {
        self.bindings.values()
    }

    pub fn store_binding(&mut self, binding: ImportsBinding) {
        self.stages.insert(binding.file.clone(), FileStage::Bound);
        self.bindings.insert(binding.file.clone(), binding);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warned_about(&self, capability: &str) -> bool {
        self.warned_capabilities.contains(capability)
    }

    /// Record a warning about a capability unless one was already recorded.
    pub fn warn_capability(&mut self, file: &str, warning: ResolveWarning) {
        let first = match warning.capability() {
            Some(name) => self.warned_capabilities.first(name),
            None => true,
        };
        if first {
            self.report(Some(file), warning);
        }
    }

    /// Record a warning about a file unless the same warning was already
    /// recorded for it.
    pub fn warn_file(&mut self, file: &str, warning: ResolveWarning) {
        if self.warned_files.first(&format!("{}: {}", file, warning)) {
            self.report(Some(file), warning);
        }
    }

    pub fn report_table_unavailable(&mut self, file: &str) {
        if !self.table_error_reported {
            self.table_error_reported = true;
            self.report(Some(file), ResolveWarning::PathTableUnavailable);
        }
    }

    pub fn report(&mut self, file: Option<&str>, warning: ResolveWarning) {
        let diagnostic = Diagnostic::new(file, warning);
        let location = diagnostic.file.as_deref().unwrap_or("<session>");
        match diagnostic.severity {
            Severity::Warning => warn!("{}: {}", location, diagnostic.message),
            Severity::Error => error!("{}: {}", location, diagnostic.message),
        }
        self.diagnostics.push(diagnostic);
    }
}
