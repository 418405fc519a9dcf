use archscope_api::{InferenceHost, ValueId};
use archscope_core::resolver::{ArchitectResolver, PathTable, find_entry_functions};
use archscope_core::{CapabilityPaths, ResolverConfig};
use archscope_js::{JsDocFilter, JsEngine};
use std::sync::Arc;

pub const PLUGIN_PROVIDER: &str = r#"define(function(require, exports, module) {
    main.consumes = [];
    main.provides = ["Plugin"];
    return main;

    function main(options, imports, register) {
        function Plugin(developer, deps) {}
        register(null, { Plugin: Plugin });
    }
});"#;

pub const FS_PROVIDER: &str = r#"define(function(require, exports, module) {
    main.consumes = ["Plugin"];
    main.provides = ["fs"];
    return main;

    function main(options, imports, register) {
        var plugin = new imports.Plugin("Ajax.org", main.consumes);

        /**
         * File system access for the workspace.
         * @singleton
         */
        plugin.freezePublicAPI({
            readFile: function(path, callback) {},
            writeFile: function(path, data, callback) {}
        });

        register(null, { fs: plugin });
    }
});"#;

pub const UI_PROVIDER: &str = r#"define(function(require, exports, module) {
    main.provides = ["ui"];
    return main;

    function main(options, imports, register) {
        register(null, { insertCss: function(css) {} });
    }
});"#;

#[allow(dead_code)]
pub fn consumer(consumes: &[&str]) -> String {
    let list: Vec<String> = consumes.iter().map(|name| format!("\"{}\"", name)).collect();
    format!(
        r#"define(function(require, exports, module) {{
    main.consumes = [{}];
    main.provides = [];
    return main;

    function main(options, imports, register) {{
        var fs = imports.fs;
        register(null, {{}});
    }}
}});"#,
        list.join(", ")
    )
}

#[allow(dead_code)]
pub fn resolver(paths: PathTable) -> ArchitectResolver {
    ArchitectResolver::new(ResolverConfig::default(), Arc::new(JsDocFilter))
        .unwrap()
        .with_paths(paths)
}

#[allow(dead_code)]
pub fn table(entries: &[(&str, &str)]) -> PathTable {
    PathTable::fixed(entries.iter().copied().collect::<CapabilityPaths>())
}

#[allow(dead_code)]
pub fn engine_with(resolver: ArchitectResolver, files: &[(&str, &str)]) -> JsEngine {
    let mut engine = JsEngine::new().unwrap().with_plugin(resolver);
    for (path, text) in files {
        engine.add_file(path, Some(text.to_string()), None);
    }
    engine
}

/// The `imports` parameter of a file's `main` entry function.
#[allow(dead_code)]
pub fn imports_value(engine: &JsEngine, file: &str) -> ValueId {
    let source = engine.file(file).expect("file loaded");
    let names = vec!["main".to_string()];
    let entries = find_entry_functions(source.root(), &source.text, &names);
    let entry = entries.first().expect("entry function");
    engine
        .scope_binding(file, entry.scope_id(), "imports")
        .expect("imports parameter")
}

/// A local declared in a file's `main` entry function.
#[allow(dead_code)]
pub fn entry_local(engine: &JsEngine, file: &str, name: &str) -> ValueId {
    let source = engine.file(file).expect("file loaded");
    let names = vec!["main".to_string()];
    let entries = find_entry_functions(source.root(), &source.text, &names);
    engine
        .scope_binding(file, entries[0].scope_id(), name)
        .expect("local binding")
}

#[allow(dead_code)]
pub fn resolver_of(engine: &JsEngine) -> &ArchitectResolver {
    engine.plugin::<ArchitectResolver>().expect("resolver registered")
}
