use crate::error::{ArchscopeError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of the architect resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Name under which the resolver registers with the engine and appears
    /// in the host's inference plugin list.
    pub plugin_name: String,
    /// Top-level directory all modules live under. Capability paths from the
    /// host are relative to its parent.
    pub modules_dir: String,
    /// Appended to relative capability paths.
    pub module_extension: String,
    /// Function names recognised as a module's entry function.
    pub entry_names: Vec<String>,
    /// Entry function name whose `imports` parameter gets bound.
    pub consumer_entry: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            plugin_name: "architect_resolver".to_string(),
            modules_dir: "plugins".to_string(),
            module_extension: ".js".to_string(),
            entry_names: vec!["main".to_string(), "plugin".to_string()],
            consumer_entry: "main".to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.modules_dir.is_empty() || self.modules_dir.contains('/') {
            return Err(ArchscopeError::Config(format!(
                "modules_dir must be a single directory name, got {:?}",
                self.modules_dir
            )));
        }
        if self.entry_names.is_empty() {
            return Err(ArchscopeError::Config(
                "entry_names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Pattern capturing everything up to and including the last `/` before
    /// the modules directory.
    pub fn root_pattern(&self) -> Result<Regex> {
        Ok(Regex::new(&format!(
            "^(.*/){}/",
            regex::escape(&self.modules_dir)
        ))?)
    }
}
