//! Binding the `imports` parameter of consumer entry functions to the
//! provider types of the capabilities they declare.

use super::declarations::{CapabilityKind, extract_declaration};
use super::diagnostics::ResolveWarning;
use super::entry::{EntryFunction, IMPORTS_PARAM, find_entry_functions, import_aliases};
use super::scheduler::{CrossFileScheduler, PathTable};
use super::state::ResolverState;
use crate::config::ResolverConfig;
use crate::error::Result;
use archscope_api::{InferenceHost, TypeId, ValueId};
use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, error};

/// What a consumer's `imports` resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportsBinding {
    pub file: String,
    entries: IndexMap<String, Option<TypeId>>,
}

impl ImportsBinding {
    pub fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            entries: IndexMap::new(),
        }
    }

    fn insert(&mut self, name: &str, ty: Option<TypeId>) {
        self.entries.insert(name.to_string(), ty);
    }

    /// Names completion offers on `imports.`: the resolved capabilities in
    /// declaration order.
    pub fn enumerate(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, ty)| ty.is_some())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<TypeId> {
        self.entries.get(name).copied().flatten()
    }

    pub fn declared(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn unresolved(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, ty)| ty.is_none())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<TypeId>)> + '_ {
        self.entries.iter().map(|(name, ty)| (name.as_str(), *ty))
    }
}

/// The `imports` parameter of one entry function and the locals that alias
/// its members.
struct ConsumerSite {
    file: String,
    imports: ValueId,
    aliases: Vec<(String, ValueId)>,
}

impl ConsumerSite {
    fn locate(host: &dyn InferenceHost, file: &str, entry: &EntryFunction, text: &str) -> Option<Self> {
        let imports = host.scope_binding(file, entry.scope_id(), IMPORTS_PARAM)?;
        let aliases = import_aliases(entry, text)
            .into_iter()
            .filter_map(|(local, property)| {
                host.scope_binding(file, entry.scope_id(), &local)
                    .map(|value| (property, value))
            })
            .collect();
        Some(Self {
            file: file.to_string(),
            imports,
            aliases,
        })
    }
}

pub struct InjectionBinder<'a> {
    config: &'a ResolverConfig,
    scheduler: CrossFileScheduler<'a>,
}

impl<'a> InjectionBinder<'a> {
    pub fn new(config: &'a ResolverConfig, root_pattern: &'a Regex) -> Self {
        Self {
            config,
            scheduler: CrossFileScheduler::new(config, root_pattern),
        }
    }

    /// Bind every loaded file. A failure in one file is logged and does not
    /// stop the others.
    pub fn bind_program(&self, host: &mut dyn InferenceHost, state: &mut ResolverState, table: &mut PathTable) {
        for file in host.file_names() {
            state.current_origin = Some(file.clone());
            if let Err(e) = self.bind_file(host, state, table, &file) {
                error!("Failed to bind imports of {}: {}", file, e);
            }
        }
        state.current_origin = None;
    }

    pub fn bind_file(
        &self,
        host: &mut dyn InferenceHost,
        state: &mut ResolverState,
        table: &mut PathTable,
        file: &str,
    ) -> Result<()> {
        let Some(source) = host.file(file) else {
            return Ok(());
        };
        let entries = find_entry_functions(
            source.root(),
            &source.text,
            std::slice::from_ref(&self.config.consumer_entry),
        );
        if entries.is_empty() {
            return Ok(());
        }

        let consumes = extract_declaration(&source, CapabilityKind::Consumes, &self.config.entry_names);
        let Some(names) = consumes.names() else {
            state.warn_file(
                file,
                ResolveWarning::ConsumesUndeclared {
                    entry: self.config.consumer_entry.clone(),
                },
            );
            return Ok(());
        };

        for entry in &entries {
            let Some(site) = ConsumerSite::locate(&*host, file, entry, &source.text) else {
                continue;
            };
            let binding = self.bind_entry(host, state, table, &site, names)?;
            debug!(
                "{}: imports bound to [{}]",
                file,
                binding.enumerate().join(", ")
            );
            state.store_binding(binding);
        }
        Ok(())
    }

    fn bind_entry(
        &self,
        host: &mut dyn InferenceHost,
        state: &mut ResolverState,
        table: &mut PathTable,
        site: &ConsumerSite,
        names: &[String],
    ) -> Result<ImportsBinding> {
        let file = site.file.as_str();
        let imports = site.imports;
        let imports_obj = match state.imports_object(file) {
            Some(obj) => obj,
            None => {
                let obj = host.types_mut().new_obj(Some(IMPORTS_PARAM), Some(file));
                state.set_imports_object(file, obj);
                obj
            }
        };
        host.types_mut().add_type(imports, imports_obj)?;

        let mut binding = ImportsBinding::new(file);
        for name in names {
            let ty = match state.registry.lookup(name) {
                Some(ty) => Some(ty),
                None => {
                    self.scheduler.schedule(host, state, table, name, file);
                    state.registry.lookup(name)
                }
            };
            binding.insert(name, ty);
            let previous = state.binding(file).and_then(|bound| bound.get(name));
            if previous == ty {
                continue;
            }

            let types = host.types_mut();
            let prop = types.value_prop(imports, name)?;
            let member = types.ensure_obj_prop(imports_obj, name)?;
            let aliases = site
                .aliases
                .iter()
                .filter(|(property, _)| property == name)
                .map(|(_, alias)| *alias);
            let targets = [prop, member].into_iter().chain(aliases);
            for target in targets {
                // A provider that was reloaded or replaced leaves no trace.
                if let Some(previous) = previous {
                    types.remove_type(target, previous)?;
                }
                if let Some(ty) = ty {
                    types.add_type(target, ty)?;
                }
            }
        }

        host.types_mut().set_enumeration(imports, binding.enumerate())?;
        Ok(binding)
    }
}
