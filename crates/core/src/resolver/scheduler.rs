//! Turning a missing capability into a file to load.

use super::diagnostics::ResolveWarning;
use super::state::ResolverState;
use crate::config::ResolverConfig;
use crate::host::{CapabilityPaths, PendingReply, ReplyState};
use archscope_api::InferenceHost;
use regex::Regex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathLookup {
    Found(String),
    Missing,
    NotYetAvailable,
}

enum TableSource {
    NotRequested,
    Requested(PendingReply<CapabilityPaths>),
}

/// The host's capability path table, as far as it has arrived.
pub struct PathTable {
    source: TableSource,
}

impl Default for PathTable {
    fn default() -> Self {
        Self::not_requested()
    }
}

impl PathTable {
    pub fn not_requested() -> Self {
        Self {
            source: TableSource::NotRequested,
        }
    }

    pub fn requested(reply: PendingReply<CapabilityPaths>) -> Self {
        Self {
            source: TableSource::Requested(reply),
        }
    }

    pub fn fixed(paths: CapabilityPaths) -> Self {
        Self::requested(PendingReply::ready(paths))
    }

    pub fn is_available(&mut self) -> bool {
        self.paths().is_some()
    }

    fn paths(&mut self) -> Option<&CapabilityPaths> {
        match &mut self.source {
            TableSource::NotRequested => None,
            TableSource::Requested(reply) => match reply.poll() {
                ReplyState::Ready(paths) => Some(paths),
                _ => None,
            },
        }
    }

    pub fn resolve(&mut self, name: &str) -> PathLookup {
        match self.paths() {
            Some(paths) => match paths.get(name) {
                Some(relative) => PathLookup::Found(relative.to_string()),
                None => PathLookup::Missing,
            },
            None => PathLookup::NotYetAvailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Newly queued with the engine.
    Scheduled(String),
    /// Already loaded or queued.
    AlreadyKnown(String),
    Unresolvable,
}

pub struct CrossFileScheduler<'a> {
    config: &'a ResolverConfig,
    root_pattern: &'a Regex,
}

impl<'a> CrossFileScheduler<'a> {
    pub fn new(config: &'a ResolverConfig, root_pattern: &'a Regex) -> Self {
        Self {
            config,
            root_pattern,
        }
    }

    /// Directory containing the consumer's modules directory, with a
    /// trailing `/`.
    pub fn modules_root(&self, consumer: &str) -> Option<String> {
        self.root_pattern
            .captures(consumer)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Ask the engine to load the provider of `name` for `consumer`. Failures
    /// are warned about once per capability.
    pub fn schedule(
        &self,
        host: &mut dyn InferenceHost,
        state: &mut ResolverState,
        table: &mut PathTable,
        name: &str,
        consumer: &str,
    ) -> ScheduleOutcome {
        let relative = match table.resolve(name) {
            PathLookup::Found(relative) => relative,
            PathLookup::Missing => {
                state.warn_capability(
                    consumer,
                    ResolveWarning::Unresolved {
                        name: name.to_string(),
                    },
                );
                return ScheduleOutcome::Unresolvable;
            }
            PathLookup::NotYetAvailable => {
                state.report_table_unavailable(consumer);
                state.warn_capability(
                    consumer,
                    ResolveWarning::Unresolved {
                        name: name.to_string(),
                    },
                );
                return ScheduleOutcome::Unresolvable;
            }
        };

        let Some(base) = self.modules_root(consumer) else {
            state.warn_capability(
                consumer,
                ResolveWarning::OutsideModulesDir {
                    name: name.to_string(),
                    modules_dir: self.config.modules_dir.clone(),
                },
            );
            return ScheduleOutcome::Unresolvable;
        };

        let path = format!("{}{}{}", base, relative, self.config.module_extension);
        let origin = state.current_origin.clone();
        if host.add_file(&path, None, origin.as_deref()) {
            debug!("Scheduled {} to provide {} for {}", path, name, consumer);
            ScheduleOutcome::Scheduled(path)
        } else {
            ScheduleOutcome::AlreadyKnown(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archscope_js::JsEngine;

    fn table() -> PathTable {
        PathTable::fixed([("fs", "plugins/c9.fs/fs")].into_iter().collect())
    }

    #[test]
    fn test_resolve_states() {
        assert_eq!(PathTable::not_requested().resolve("fs"), PathLookup::NotYetAvailable);
        let mut table = table();
        assert!(table.is_available());
        assert_eq!(table.resolve("fs"), PathLookup::Found("plugins/c9.fs/fs".to_string()));
        assert_eq!(table.resolve("ui"), PathLookup::Missing);
    }

    #[test]
    fn test_schedule_builds_path_from_consumer_root() {
        let config = ResolverConfig::default();
        let pattern = config.root_pattern().unwrap();
        let scheduler = CrossFileScheduler::new(&config, &pattern);
        let mut engine = JsEngine::new().unwrap();
        let mut state = ResolverState::new();
        state.current_origin = Some("/ws/plugins/c9.ide/main.js".to_string());

        let outcome = scheduler.schedule(
            &mut engine,
            &mut state,
            &mut table(),
            "fs",
            "/ws/plugins/c9.ide/main.js",
        );
        assert_eq!(
            outcome,
            ScheduleOutcome::Scheduled("/ws/plugins/c9.fs/fs.js".to_string())
        );
        assert_eq!(
            engine.origin_of("/ws/plugins/c9.fs/fs.js"),
            Some("/ws/plugins/c9.ide/main.js")
        );

        let again = scheduler.schedule(
            &mut engine,
            &mut state,
            &mut table(),
            "fs",
            "/ws/plugins/c9.ide/main.js",
        );
        assert!(matches!(again, ScheduleOutcome::AlreadyKnown(_)));
    }

    #[test]
    fn test_consumer_outside_modules_dir() {
        let config = ResolverConfig::default();
        let pattern = config.root_pattern().unwrap();
        let scheduler = CrossFileScheduler::new(&config, &pattern);
        let mut engine = JsEngine::new().unwrap();
        let mut state = ResolverState::new();

        let outcome = scheduler.schedule(&mut engine, &mut state, &mut table(), "fs", "/ws/lib/x.js");
        assert_eq!(outcome, ScheduleOutcome::Unresolvable);
        assert!(engine.queued().is_empty());
        assert!(matches!(
            state.diagnostics()[0].warning,
            ResolveWarning::OutsideModulesDir { .. }
        ));
    }

    #[test]
    fn test_table_unavailable_reported_once() {
        let config = ResolverConfig::default();
        let pattern = config.root_pattern().unwrap();
        let scheduler = CrossFileScheduler::new(&config, &pattern);
        let mut engine = JsEngine::new().unwrap();
        let mut state = ResolverState::new();
        let mut table = PathTable::not_requested();

        for name in ["fs", "ui"] {
            scheduler.schedule(&mut engine, &mut state, &mut table, name, "/ws/plugins/a.js");
        }
        let errors = state
            .diagnostics()
            .iter()
            .filter(|d| d.warning == ResolveWarning::PathTableUnavailable)
            .count();
        assert_eq!(errors, 1);
        assert_eq!(state.diagnostics().len(), 3);
    }
}
