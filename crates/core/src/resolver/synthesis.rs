//! Building provider types from `register(null, {...})` and
//! `plugin.freezePublicAPI({...})` calls inside entry functions.

use super::declarations::{CapabilityKind, extract_declaration};
use super::diagnostics::ResolveWarning;
use super::entry::{EntryFunction, REGISTER_PARAM, calls_within, find_entry_functions};
use super::state::ResolverState;
use crate::config::ResolverConfig;
use crate::error::Result;
use archscope_api::syntax::{identifier_name, named_children, property_key_name};
use archscope_api::{DocFilter, InferenceHost, TypeId};
use tree_sitter::Node;
use tracing::debug;

const FREEZE_METHOD: &str = "freezePublicAPI";

#[derive(Debug)]
struct ObjectLiteral {
    node_id: usize,
    keys: Vec<String>,
}

#[derive(Debug)]
struct FreezeCall {
    literal: ObjectLiteral,
    start_byte: usize,
}

#[derive(Debug, Default)]
struct ProviderCalls {
    registrations: Vec<ObjectLiteral>,
    freezes: Vec<FreezeCall>,
}

pub struct ProviderSynthesizer<'a> {
    config: &'a ResolverConfig,
    doc_filter: &'a dyn DocFilter,
}

impl<'a> ProviderSynthesizer<'a> {
    pub fn new(config: &'a ResolverConfig, doc_filter: &'a dyn DocFilter) -> Self {
        Self { config, doc_filter }
    }

    /// Register the capabilities a freshly inferred file provides.
    ///
    /// `register(...)` objects are handled before `freezePublicAPI(...)`, so
    /// a frozen API replaces a registration of the same capability.
    pub fn synthesize(&self, host: &mut dyn InferenceHost, state: &mut ResolverState, file: &str) -> Result<()> {
        let Some(source) = host.file(file) else {
            return Ok(());
        };
        let entries = find_entry_functions(source.root(), &source.text, &self.config.entry_names);
        if entries.is_empty() {
            return Ok(());
        }

        let mut calls = ProviderCalls::default();
        for entry in &entries {
            collect_calls(entry, &source.text, &mut calls);
        }
        if calls.registrations.is_empty() && calls.freezes.is_empty() {
            return Ok(());
        }
        let provides = extract_declaration(&source, CapabilityKind::Provides, &self.config.entry_names);
        let declared = provides.names();

        let mut position = 0;
        for literal in &calls.registrations {
            let members = literal_members(&*host, file, literal);
            let keyed = match declared {
                None => true,
                Some(names) => literal.keys.iter().any(|key| names.contains(key)),
            };
            if keyed {
                for (name, ty) in members {
                    if let Some(ty) = ty {
                        debug!("{} registers {} as {}", file, name, host.types().describe(ty));
                        state.registry.register_from(&name, ty, Some(file));
                    }
                }
                continue;
            }

            let index = position;
            position += 1;
            match declared.and_then(|names| names.get(index)) {
                Some(name) => {
                    let obj = provider_object(host, file, &members)?;
                    debug!("{} registers {} positionally", file, name);
                    state.registry.register_from(name, obj, Some(file));
                }
                None => state.warn_file(file, ResolveWarning::UnattributedRegistration { index }),
            }
        }

        for freeze in &calls.freezes {
            let name = match declared {
                None => {
                    state.warn_file(file, ResolveWarning::ProvidesUndeclared);
                    continue;
                }
                Some([name]) => name,
                Some(names) => {
                    state.warn_file(file, ResolveWarning::AmbiguousFreeze { count: names.len() });
                    continue;
                }
            };
            let members = literal_members(&*host, file, &freeze.literal);
            let obj = provider_object(host, file, &members)?;
            if host.types().doc(obj).is_none()
                && let Some(doc) = self.leading_doc(&*host, file, freeze.start_byte)
            {
                host.types_mut().set_doc(obj, doc);
            }
            debug!("{} freezes public API of {}", file, name);
            state.registry.register_from(name, obj, Some(file));
        }
        Ok(())
    }

    fn leading_doc(&self, host: &dyn InferenceHost, file: &str, offset: usize) -> Option<String> {
        let comments = host.comments_before(file, offset);
        let nearest = comments.last()?;
        self.doc_filter.filter(nearest)
    }
}

fn collect_calls(entry: &EntryFunction, text: &str, calls: &mut ProviderCalls) {
    let Some(body) = entry.body() else {
        return;
    };
    for call in calls_within(body) {
        let (Some(callee), Some(arguments)) = (
            call.child_by_field_name("function"),
            call.child_by_field_name("arguments"),
        ) else {
            continue;
        };
        let args = named_children(&arguments);

        if callee.kind() == "identifier" && identifier_name(&callee, text) == Some(REGISTER_PARAM) {
            if let Some(object) = args.get(1).filter(|a| a.kind() == "object") {
                calls.registrations.push(object_literal(object, text));
            }
            continue;
        }

        let is_freeze = callee.kind() == "member_expression"
            && callee
                .child_by_field_name("property")
                .and_then(|p| identifier_name(&p, text))
                == Some(FREEZE_METHOD);
        if is_freeze && let Some(object) = args.first().filter(|a| a.kind() == "object") {
            calls.freezes.push(FreezeCall {
                literal: object_literal(object, text),
                start_byte: call.start_byte(),
            });
        }
    }
}

fn object_literal(node: &Node, text: &str) -> ObjectLiteral {
    let keys = named_children(node)
        .iter()
        .filter_map(|member| match member.kind() {
            "pair" => member
                .child_by_field_name("key")
                .and_then(|key| property_key_name(&key, text)),
            "method_definition" => member
                .child_by_field_name("name")
                .and_then(|key| property_key_name(&key, text)),
            "shorthand_property_identifier" => property_key_name(member, text),
            _ => None,
        })
        .collect();
    ObjectLiteral {
        node_id: node.id(),
        keys,
    }
}

/// The inferred type of each key of an object literal.
fn literal_members(host: &dyn InferenceHost, file: &str, literal: &ObjectLiteral) -> Vec<(String, Option<TypeId>)> {
    let obj = host
        .expression_value(file, literal.node_id)
        .and_then(|value| host.types().first_type(value));
    literal
        .keys
        .iter()
        .map(|key| {
            let ty = obj.and_then(|o| host.types().member_type(o, key));
            (key.clone(), ty)
        })
        .collect()
}

fn provider_object(host: &mut dyn InferenceHost, file: &str, members: &[(String, Option<TypeId>)]) -> Result<TypeId> {
    let types = host.types_mut();
    let obj = types.new_obj(None, Some(file));
    for (name, ty) in members {
        let slot = types.ensure_obj_prop(obj, name)?;
        if let Some(ty) = ty {
            types.add_type(slot, *ty)?;
        }
    }
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use archscope_js::{JsDocFilter, JsEngine};

    fn run(text: &str) -> (JsEngine, ResolverState) {
        let mut engine = JsEngine::new().unwrap();
        engine.add_file("/ws/plugins/p.js", Some(text.to_string()), None);
        engine.analyze();
        let config = ResolverConfig::default();
        let filter = JsDocFilter;
        let mut state = ResolverState::new();
        ProviderSynthesizer::new(&config, &filter)
            .synthesize(&mut engine, &mut state, "/ws/plugins/p.js")
            .unwrap();
        (engine, state)
    }

    #[test]
    fn test_positional_registration() {
        let (engine, state) = run(
            r#"main.provides = ["thing"];
            function main(options, imports, register) {
                function foo() {}
                register(null, { foo: foo, bar: 1 });
            }"#,
        );
        let ty = state.registry.lookup("thing").unwrap();
        assert!(engine.types().member_type(ty, "foo").is_some());
        assert!(engine.types().member_type(ty, "bar").is_some());
    }

    #[test]
    fn test_keyed_registration() {
        let (engine, state) = run(
            r#"main.provides = ["fs"];
            function main(options, imports, register) {
                var plugin = new Plugin("Ajax.org", main.consumes);
                register(null, { fs: plugin });
            }"#,
        );
        let ty = state.registry.lookup("fs").unwrap();
        assert_eq!(engine.types().describe(ty), "Plugin");
    }

    #[test]
    fn test_freeze_takes_doc_and_wins() {
        let (engine, state) = run(
            r#"main.provides = ["logger"];
            function main(options, imports, register) {
                var plugin = {};
                register(null, { logger: plugin });
                /**
                 * Writes log lines.
                 * @singleton
                 */
                plugin.freezePublicAPI({ log: function(msg) {} });
            }"#,
        );
        let ty = state.registry.lookup("logger").unwrap();
        assert_eq!(engine.types().doc(ty), Some("Writes log lines."));
        assert!(engine.types().member_type(ty, "log").is_some());
    }

    #[test]
    fn test_ambiguous_freeze_registers_nothing() {
        let (_engine, state) = run(
            r#"main.provides = ["a", "b"];
            function main(options, imports, register) {
                plugin.freezePublicAPI({ x: 1 });
            }"#,
        );
        assert!(state.registry.is_empty());
        assert_eq!(
            state.diagnostics()[0].warning,
            ResolveWarning::AmbiguousFreeze { count: 2 }
        );
    }

    #[test]
    fn test_unattributed_registration_reported() {
        let (_engine, state) = run(
            r#"main.provides = [];
            function main(options, imports, register) {
                register(null, { x: 1 });
            }"#,
        );
        assert!(state.registry.is_empty());
        assert_eq!(
            state.diagnostics()[0].warning,
            ResolveWarning::UnattributedRegistration { index: 0 }
        );
    }
}
