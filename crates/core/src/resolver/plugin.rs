use super::binder::{ImportsBinding, InjectionBinder};
use super::diagnostics::Diagnostic;
use super::registry::ProviderRegistry;
use super::scheduler::PathTable;
use super::state::{FileStage, ResolverState};
use super::synthesis::ProviderSynthesizer;
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::host::{HostLink, InferencePluginInfo, PendingReply, ReplyState};
use archscope_api::{DocFilter, EnginePlugin, InferenceHost};
use regex::Regex;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Engine plugin resolving architect capabilities across module files.
pub struct ArchitectResolver {
    config: ResolverConfig,
    root_pattern: Regex,
    doc_filter: Arc<dyn DocFilter>,
    state: ResolverState,
    paths: PathTable,
    plugin_list: Option<PendingReply<Vec<InferencePluginInfo>>>,
}

impl ArchitectResolver {
    pub fn new(config: ResolverConfig, doc_filter: Arc<dyn DocFilter>) -> Result<Self> {
        config.validate()?;
        let root_pattern = config.root_pattern()?;
        Ok(Self {
            config,
            root_pattern,
            doc_filter,
            state: ResolverState::new(),
            paths: PathTable::not_requested(),
            plugin_list: None,
        })
    }

    pub fn with_paths(mut self, paths: PathTable) -> Self {
        self.paths = paths;
        self
    }

    /// Ask the host for the capability path table and the plugin list.
    /// Either may still be missing when inference starts.
    pub fn connect(mut self, link: &HostLink) -> Self {
        match link.request_capability_paths() {
            Ok(reply) => self.paths = PathTable::requested(reply),
            Err(e) => error!("Could not request capability paths: {}", e),
        }
        match link.request_inference_plugins() {
            Ok(reply) => self.plugin_list = Some(reply),
            Err(e) => error!("Could not request inference plugin list: {}", e),
        }
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn state(&self) -> &ResolverState {
        &self.state
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.state.registry
    }

    pub fn imports_binding(&self, file: &str) -> Option<&ImportsBinding> {
        self.state.binding(file)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.state.diagnostics()
    }

    /// Disabled only when the host's plugin list says so.
    pub fn is_enabled(&mut self) -> bool {
        let Some(reply) = self.plugin_list.as_mut() else {
            return true;
        };
        match reply.poll() {
            ReplyState::Ready(plugins) => plugins
                .iter()
                .find(|plugin| plugin.name == self.config.plugin_name)
                .is_none_or(|plugin| plugin.enabled),
            _ => true,
        }
    }
}

impl EnginePlugin for ArchitectResolver {
    fn name(&self) -> &str {
        &self.config.plugin_name
    }

    fn before_load(&mut self, _host: &mut dyn InferenceHost, file: &str) {
        if !self.is_enabled() {
            return;
        }
        self.state.reset_file(file);
    }

    fn after_load(&mut self, host: &mut dyn InferenceHost, file: &str) {
        if !self.is_enabled() {
            return;
        }
        let synthesizer = ProviderSynthesizer::new(&self.config, self.doc_filter.as_ref());
        if let Err(e) = synthesizer.synthesize(host, &mut self.state, file) {
            error!("Failed to register providers of {}: {}", file, e);
        }
        self.state.set_stage(file, FileStage::Parsed);
    }

    fn post_infer(&mut self, host: &mut dyn InferenceHost) {
        if !self.is_enabled() {
            debug!("{} disabled by host", self.config.plugin_name);
            return;
        }
        let binder = InjectionBinder::new(&self.config, &self.root_pattern);
        binder.bind_program(host, &mut self.state, &mut self.paths);
        info!(
            "Bound {} consumers against {} providers",
            self.state.bindings().count(),
            self.state.registry.len()
        );
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
