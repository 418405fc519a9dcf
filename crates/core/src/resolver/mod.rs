//! Architect capability resolution.
//!
//! Modules declare what they consume and provide:
//!
//! ```js
//! main.consumes = ["Plugin", "fs"];
//! main.provides = ["thing"];
//! function main(options, imports, register) { ... }
//! ```
//!
//! After a file is inferred its providers are registered by capability
//! name. After each inference pass every consumer's `imports` parameter is
//! bound to the registered types; a capability nobody has registered yet is
//! looked up in the host's path table and its file scheduled for loading,
//! so it binds on a later pass.

pub mod binder;
pub mod declarations;
pub mod diagnostics;
pub mod entry;
pub mod plugin;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod synthesis;

pub use binder::{ImportsBinding, InjectionBinder};
pub use declarations::{CapabilityKind, Declaration, extract_declaration, extract_declaration_in};
pub use diagnostics::{Diagnostic, ResolveWarning, Severity};
pub use entry::{EntryFunction, find_entry_functions};
pub use plugin::ArchitectResolver;
pub use registry::{ProviderEntry, ProviderRegistry};
pub use scheduler::{CrossFileScheduler, PathLookup, PathTable, ScheduleOutcome};
pub use state::{FileStage, ResolverState, WarnedSet};
pub use synthesis::ProviderSynthesizer;
