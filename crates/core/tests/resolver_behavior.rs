//! End-to-end behavior of the architect resolver inside a JavaScript engine.

mod common;

use archscope_api::InferenceHost;
use archscope_core::resolver::{FileStage, ResolveWarning};
use common::*;

const PLUGIN_JS: &str = "/ws/plugins/c9.core/plugin.js";
const FS_JS: &str = "/ws/plugins/c9.fs/fs.js";
const UI_JS: &str = "/ws/plugins/c9.ui/ui.js";
const IDE_JS: &str = "/ws/plugins/c9.ide/main.js";

fn logger_warnings(engine: &archscope_js::JsEngine) -> usize {
    resolver_of(engine)
        .diagnostics()
        .iter()
        .filter(|d| d.message.contains("logger"))
        .count()
}

#[test]
fn test_imports_enumerate_exactly_consumes() {
    let consumer = consumer(&["Plugin", "ui", "fs"]);
    let mut engine = engine_with(
        resolver(table(&[])),
        &[
            (PLUGIN_JS, PLUGIN_PROVIDER),
            (FS_JS, FS_PROVIDER),
            (UI_JS, UI_PROVIDER),
            (IDE_JS, consumer.as_str()),
        ],
    );
    engine.analyze();

    let imports = imports_value(&engine, IDE_JS);
    assert_eq!(
        engine.types().gather_properties(imports),
        vec!["Plugin", "ui", "fs"]
    );

    let binding = resolver_of(&engine).imports_binding(IDE_JS).unwrap();
    assert_eq!(binding.enumerate(), vec!["Plugin", "ui", "fs"]);
    assert!(binding.unresolved().is_empty());
    assert_eq!(resolver_of(&engine).state().stage(IDE_JS), FileStage::Bound);
}

#[test]
fn test_unresolvable_capability_warned_once() {
    let consumer = consumer(&["Plugin", "fs", "logger"]);
    let mut engine = engine_with(
        resolver(table(&[
            ("Plugin", "plugins/c9.core/plugin"),
            ("fs", "plugins/c9.fs/fs"),
        ])),
        &[
            (PLUGIN_JS, PLUGIN_PROVIDER),
            (FS_JS, FS_PROVIDER),
            (IDE_JS, consumer.as_str()),
        ],
    );
    engine.analyze();

    let imports = imports_value(&engine, IDE_JS);
    assert_eq!(engine.types().gather_properties(imports), vec!["Plugin", "fs"]);
    assert_eq!(logger_warnings(&engine), 1);

    // Re-inferring the consumer binds again without a second warning.
    engine.update_file(IDE_JS, consumer.clone());
    engine.analyze();
    engine.analyze();
    assert_eq!(logger_warnings(&engine), 1);
    let imports = imports_value(&engine, IDE_JS);
    assert_eq!(engine.types().gather_properties(imports), vec!["Plugin", "fs"]);
}

#[test]
fn test_binding_twice_is_idempotent() {
    let consumer = consumer(&["Plugin", "fs"]);
    let mut engine = engine_with(
        resolver(table(&[])),
        &[
            (PLUGIN_JS, PLUGIN_PROVIDER),
            (FS_JS, FS_PROVIDER),
            (IDE_JS, consumer.as_str()),
        ],
    );
    engine.analyze();
    let imports = imports_value(&engine, IDE_JS);
    let before: Vec<_> = engine.types().value(imports).unwrap().types().collect();
    let fs_types: Vec<_> = engine.types().lookup_member(imports, "fs");

    engine.analyze();
    let after: Vec<_> = engine.types().value(imports).unwrap().types().collect();
    assert_eq!(before, after);
    assert_eq!(before.len(), 1);
    assert_eq!(engine.types().lookup_member(imports, "fs"), fs_types);
    assert_eq!(engine.types().gather_properties(imports), vec!["Plugin", "fs"]);
}

#[test]
fn test_frozen_api_carries_doc_to_consumer() {
    let consumer = consumer(&["fs"]);
    let mut engine = engine_with(
        resolver(table(&[])),
        &[
            (PLUGIN_JS, PLUGIN_PROVIDER),
            (FS_JS, FS_PROVIDER),
            (IDE_JS, consumer.as_str()),
        ],
    );
    engine.analyze();

    let fs = resolver_of(&engine).registry().lookup("fs").unwrap();
    assert_eq!(engine.types().doc(fs), Some("File system access for the workspace."));
    assert!(engine.types().member_type(fs, "readFile").is_some());
    assert_eq!(
        resolver_of(&engine).registry().entry("fs").unwrap().origin.as_deref(),
        Some(FS_JS)
    );

    let imports = imports_value(&engine, IDE_JS);
    assert_eq!(engine.types().lookup_member(imports, "fs"), vec![fs]);
}

#[test]
fn test_alias_of_imports_member_is_bound() {
    let consumer = consumer(&["fs"]);
    let mut engine = engine_with(
        resolver(table(&[])),
        &[(FS_JS, FS_PROVIDER), (IDE_JS, consumer.as_str())],
    );
    engine.analyze();

    let fs = resolver_of(&engine).registry().lookup("fs").unwrap();
    let local = entry_local(&engine, IDE_JS, "fs");
    assert_eq!(engine.types().first_type(local), Some(fs));
}

#[test]
fn test_edited_provider_replaces_type_seen_by_consumer() {
    let consumer = consumer(&["fs"]);
    let mut engine = engine_with(
        resolver(table(&[])),
        &[(FS_JS, FS_PROVIDER), (IDE_JS, consumer.as_str())],
    );
    engine.analyze();
    let old_fs = resolver_of(&engine).registry().lookup("fs").unwrap();

    engine.update_file(FS_JS, FS_PROVIDER.replace("readFile", "statFile"));
    engine.analyze();

    let new_fs = resolver_of(&engine).registry().lookup("fs").unwrap();
    assert_ne!(old_fs, new_fs);
    assert!(engine.types().member_type(new_fs, "statFile").is_some());

    let imports = imports_value(&engine, IDE_JS);
    assert_eq!(engine.types().lookup_member(imports, "fs"), vec![new_fs]);
    let local = entry_local(&engine, IDE_JS, "fs");
    assert_eq!(engine.types().value(local).unwrap().types().collect::<Vec<_>>(), vec![new_fs]);
    assert_eq!(resolver_of(&engine).imports_binding(IDE_JS).unwrap().get("fs"), Some(new_fs));
}

#[test]
fn test_positional_registration_in_consumer_view() {
    let consumer = consumer(&["ui"]);
    let mut engine = engine_with(
        resolver(table(&[])),
        &[(UI_JS, UI_PROVIDER), (IDE_JS, consumer.as_str())],
    );
    engine.analyze();

    let ui = resolver_of(&engine).registry().lookup("ui").unwrap();
    assert!(engine.types().member_type(ui, "insertCss").is_some());
    let imports = imports_value(&engine, IDE_JS);
    assert_eq!(engine.types().lookup_member(imports, "ui"), vec![ui]);
}

#[test]
fn test_missing_consumes_warns_once_per_file() {
    let no_consumes = r#"define(function(require, exports, module) {
    return main;
    function main(options, imports, register) { register(null, {}); }
});"#;
    let mut engine = engine_with(resolver(table(&[])), &[(IDE_JS, no_consumes)]);
    engine.analyze();
    engine.analyze();

    let undeclared: Vec<_> = resolver_of(&engine)
        .diagnostics()
        .iter()
        .filter(|d| matches!(d.warning, ResolveWarning::ConsumesUndeclared { .. }))
        .collect();
    assert_eq!(undeclared.len(), 1);
    assert_eq!(undeclared[0].file.as_deref(), Some(IDE_JS));
    assert!(resolver_of(&engine).imports_binding(IDE_JS).is_none());
}

#[test]
fn test_ambiguous_freeze_leaves_registry_untouched() {
    let provider = r#"main.provides = ["a", "b"];
function main(options, imports, register) {
    var plugin = {};
    plugin.freezePublicAPI({ x: 1 });
}"#;
    let mut engine = engine_with(resolver(table(&[])), &[("/ws/plugins/ab.js", provider)]);
    engine.analyze();
    engine.update_file("/ws/plugins/ab.js", provider.to_string());
    engine.analyze();

    let resolver = resolver_of(&engine);
    assert!(resolver.registry().is_empty());
    let ambiguous = resolver
        .diagnostics()
        .iter()
        .filter(|d| d.warning == ResolveWarning::AmbiguousFreeze { count: 2 })
        .count();
    assert_eq!(ambiguous, 1);
}

#[test]
fn test_non_module_files_are_ignored() {
    let mut engine = engine_with(
        resolver(table(&[])),
        &[("/ws/lib/util.js", "function helper(a, b) { return a + b; }")],
    );
    let report = engine.analyze();
    assert_eq!(report.loaded, vec!["/ws/lib/util.js"]);
    let resolver = resolver_of(&engine);
    assert!(resolver.diagnostics().is_empty());
    assert!(resolver.registry().is_empty());
    assert_eq!(resolver.state().stage("/ws/lib/util.js"), FileStage::Parsed);
}

#[test]
fn test_register_literal_members_match_inferred_types() {
    let provider = r#"main.provides = ["thing"];
function main(options, imports, register) {
    function fn(a, b) {}
    register(null, { foo: fn, bar: 3 });
}"#;
    let mut engine = engine_with(resolver(table(&[])), &[("/ws/plugins/thing.js", provider)]);
    engine.analyze();

    let thing = resolver_of(&engine).registry().lookup("thing").unwrap();
    let types = engine.types();
    let foo = types.member_type(thing, "foo").unwrap();
    let bar = types.member_type(thing, "bar").unwrap();
    assert_eq!(types.describe(foo), "fn(a, b)");
    assert_eq!(types.describe(bar), "number");
}
