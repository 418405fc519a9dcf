use crate::host::LocalHost;
use archscope_api::{InferenceHost, SourceFile, TypeId, TypeStore};
use archscope_core::ResolverConfig;
use archscope_core::host::{CapabilityPaths, InferencePluginInfo};
use archscope_core::resolver::{
    ArchitectResolver, CapabilityKind, Declaration, Diagnostic, extract_declaration,
};
use archscope_js::{JsDocFilter, JsEngine, JsParser};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::{info, warn};
use walkdir::WalkDir;

pub struct CheckArgs {
    pub root: PathBuf,
    pub table: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub entries: Vec<PathBuf>,
    pub max_passes: usize,
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub passes: usize,
    pub loaded: usize,
    pub providers: Vec<ProviderReport>,
    pub consumers: Vec<ConsumerReport>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Serialize)]
pub struct ProviderReport {
    pub name: String,
    pub ty: String,
    pub origin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConsumerReport {
    pub file: String,
    pub imports: Vec<ImportReport>,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub name: String,
    pub resolved: bool,
    pub ty: Option<String>,
    pub members: Vec<String>,
    pub doc: Option<String>,
}

#[derive(Tabled)]
struct ImportRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Import")]
    name: String,
    #[tabled(rename = "Type")]
    ty: String,
    #[tabled(rename = "Members")]
    members: String,
}

pub async fn run(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => ResolverConfig::from_file(path)?,
        None => ResolverConfig::default(),
    };
    let root = args.root.canonicalize()?;
    let modules = discover_modules(&root, &config);
    info!("Found {} modules under {}", modules.len(), root.display());

    let paths = match &args.table {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => derive_table(&modules, &config)?,
    };

    let host = LocalHost::spawn(
        paths,
        vec![InferencePluginInfo {
            name: config.plugin_name.clone(),
            enabled: true,
            path: None,
        }],
    );
    let resolver = ArchitectResolver::new(config, Arc::new(JsDocFilter))?.connect(&host.link);
    if !host.settle(Duration::from_secs(5)).await {
        warn!("Host did not answer in time; continuing without its replies");
    }

    let mut engine = JsEngine::new()?.with_plugin(resolver);
    let initial: Vec<PathBuf> = if args.entries.is_empty() {
        modules
    } else {
        args.entries
            .iter()
            .map(|entry| entry.canonicalize())
            .collect::<std::io::Result<_>>()?
    };
    for path in &initial {
        engine.add_file(&path.to_string_lossy(), None, None);
    }

    let report = run_passes(&mut engine, args.max_passes);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Analyze until nothing new is queued or the pass limit is hit.
pub fn run_passes(engine: &mut JsEngine, max_passes: usize) -> CheckReport {
    let mut passes = 0;
    let mut loaded = 0;
    while passes < max_passes.max(1) {
        let pass = engine.analyze();
        passes += 1;
        loaded += pass.loaded.len();
        for failed in &pass.failed {
            warn!("Could not load {}", failed);
        }
        if pass.queued == 0 {
            break;
        }
    }
    if !engine.queued().is_empty() {
        warn!("Stopped after {} passes with {} files still queued", passes, engine.queued().len());
    }
    build_report(engine, passes, loaded)
}

fn build_report(engine: &JsEngine, passes: usize, loaded: usize) -> CheckReport {
    let types = engine.types();
    let Some(resolver) = engine.plugin::<ArchitectResolver>() else {
        return CheckReport {
            passes,
            loaded,
            providers: Vec::new(),
            consumers: Vec::new(),
            diagnostics: Vec::new(),
        };
    };

    let registry = resolver.registry();
    let providers = registry
        .names()
        .filter_map(|name| {
            let entry = registry.entry(name)?;
            Some(ProviderReport {
                name: name.to_string(),
                ty: types.describe(entry.ty),
                origin: entry.origin.clone(),
            })
        })
        .collect();

    let consumers = resolver
        .state()
        .bindings()
        .map(|binding| ConsumerReport {
            file: binding.file.clone(),
            imports: binding
                .entries()
                .map(|(name, ty)| import_report(types, name, ty))
                .collect(),
        })
        .collect();

    CheckReport {
        passes,
        loaded,
        providers,
        consumers,
        diagnostics: resolver.diagnostics().to_vec(),
    }
}

fn import_report(types: &TypeStore, name: &str, ty: Option<TypeId>) -> ImportReport {
    ImportReport {
        name: name.to_string(),
        resolved: ty.is_some(),
        ty: ty.map(|ty| types.describe(ty)),
        members: ty
            .and_then(|ty| types.obj(ty))
            .map(|obj| obj.props.keys().cloned().collect())
            .unwrap_or_default(),
        doc: ty.and_then(|ty| types.doc(ty)).map(str::to_string),
    }
}

fn print_report(report: &CheckReport) {
    let rows: Vec<ImportRow> = report
        .consumers
        .iter()
        .flat_map(|consumer| {
            consumer.imports.iter().map(|import| ImportRow {
                file: consumer.file.clone(),
                name: import.name.clone(),
                ty: import.ty.clone().unwrap_or_else(|| "<unresolved>".to_string()),
                members: import.members.join(", "),
            })
        })
        .collect();

    println!(
        "Loaded {} files in {} passes; {} providers registered.",
        report.loaded,
        report.passes,
        report.providers.len()
    );
    if rows.is_empty() {
        println!("No consumers found.");
    } else {
        println!("{}", Table::new(rows));
    }

    if !report.diagnostics.is_empty() {
        println!("\nDiagnostics:");
        for diagnostic in &report.diagnostics {
            println!(
                "  [{:?}] {}: {}",
                diagnostic.severity,
                diagnostic.file.as_deref().unwrap_or("-"),
                diagnostic.message
            );
        }
    }
}

/// Module files under the modules directory.
pub fn discover_modules(root: &Path, config: &ResolverConfig) -> Vec<PathBuf> {
    let marker = format!("/{}/", config.modules_dir);
    let mut modules: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0 || !(name.starts_with('.') || name == "node_modules")
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let text = path.to_string_lossy();
            text.ends_with(&config.module_extension) && text.contains(&marker)
        })
        .collect();
    modules.sort();
    modules
}

/// Build the capability path table from the modules' provides declarations.
pub fn derive_table(modules: &[PathBuf], config: &ResolverConfig) -> Result<CapabilityPaths, Box<dyn std::error::Error>> {
    let parser = JsParser::new()?;
    let root_pattern = config.root_pattern()?;
    let mut paths = CapabilityPaths::new();

    for module in modules {
        let file = module.to_string_lossy().to_string();
        let Some(base) = root_pattern
            .captures(&file)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().len())
        else {
            continue;
        };
        let text = match std::fs::read_to_string(module) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: {}", file, e);
                continue;
            }
        };
        let tree = parser.parse(&text)?;
        let source = SourceFile::new(file.clone(), text, tree);
        let Declaration::Declared(names) =
            extract_declaration(&source, CapabilityKind::Provides, &config.entry_names)
        else {
            continue;
        };

        let relative = &file[base..];
        let relative = relative
            .strip_suffix(&config.module_extension)
            .unwrap_or(relative);
        for name in names {
            paths.insert(&name, relative);
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVIDER: &str = r#"main.provides = ["fs"];
function main(options, imports, register) {
    register(null, { fs: { readFile: function(path) {} } });
}"#;

    const CONSUMER: &str = r#"main.consumes = ["fs", "missing"];
function main(options, imports, register) {
    var fs = imports.fs;
}"#;

    fn write(root: &Path, relative: &str, text: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_discover_and_derive_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        write(&root, "plugins/c9.fs/fs.js", PROVIDER);
        write(&root, "plugins/c9.ide/main.js", CONSUMER);
        write(&root, "lib/util.js", "var x;");
        write(&root, "plugins/node_modules/dep/index.js", "var y;");

        let config = ResolverConfig::default();
        let modules = discover_modules(&root, &config);
        assert_eq!(modules.len(), 2);

        let table = derive_table(&modules, &config).unwrap();
        assert_eq!(table.get("fs"), Some("plugins/c9.fs/fs"));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_entry_pulls_in_provider() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        write(&root, "plugins/c9.fs/fs.js", PROVIDER);
        let consumer = write(&root, "plugins/c9.ide/main.js", CONSUMER);

        let config = ResolverConfig::default();
        let table = derive_table(&discover_modules(&root, &config), &config).unwrap();
        let host = LocalHost::spawn(table, Vec::new());
        let resolver = ArchitectResolver::new(config, Arc::new(JsDocFilter))
            .unwrap()
            .connect(&host.link);
        assert!(host.settle(Duration::from_secs(5)).await);

        let mut engine = JsEngine::new().unwrap().with_plugin(resolver);
        engine.add_file(&consumer.to_string_lossy(), None, None);
        let report = run_passes(&mut engine, 8);

        assert_eq!(report.passes, 2);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.consumers.len(), 1);
        let imports = &report.consumers[0].imports;
        assert_eq!(imports[0].name, "fs");
        assert!(imports[0].resolved);
        assert_eq!(imports[0].members, vec!["readFile"]);
        assert!(!imports[1].resolved);
        assert!(
            report
                .diagnostics
                .iter()
                .any(|d| d.message.contains("missing"))
        );
    }
}
