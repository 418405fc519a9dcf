use serde::Serialize;
use thiserror::Error;

/// Problems found while resolving capabilities. None of them abort
/// inference; they are logged and kept for reporting.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveWarning {
    #[error("{entry}.consumes not defined")]
    ConsumesUndeclared { entry: String },
    #[error("could not resolve \"{name}\" plugin")]
    Unresolved { name: String },
    #[error("could not resolve \"{name}\" plugin: expected consumer to be in {modules_dir}/ dir")]
    OutsideModulesDir { name: String, modules_dir: String },
    #[error("freezePublicAPI() without a provides declaration")]
    ProvidesUndeclared,
    #[error("exporting {count} client-side plugins with freezePublicAPI() is not supported")]
    AmbiguousFreeze { count: usize },
    #[error("register() object #{index} matches no provides entry")]
    UnattributedRegistration { index: usize },
    #[error("capability path table not available")]
    PathTableUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl ResolveWarning {
    pub fn severity(&self) -> Severity {
        match self {
            ResolveWarning::PathTableUnavailable => Severity::Error,
            _ => Severity::Warning,
        }
    }

    /// Capability the warning is about, if it concerns a single one.
    pub fn capability(&self) -> Option<&str> {
        match self {
            ResolveWarning::Unresolved { name } | ResolveWarning::OutsideModulesDir { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: Option<String>,
    pub severity: Severity,
    pub message: String,
    pub warning: ResolveWarning,
}

impl Diagnostic {
    pub fn new(file: Option<&str>, warning: ResolveWarning) -> Self {
        Self {
            file: file.map(str::to_string),
            severity: warning.severity(),
            message: warning.to_string(),
            warning,
        }
    }
}
