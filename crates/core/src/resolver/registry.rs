use archscope_api::{CapabilityKey, TypeId};
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEntry {
    pub ty: TypeId,
    /// File whose registration produced the entry.
    pub origin: Option<String>,
}

/// Session-wide map from capability name to the type provided for it.
/// Registering a name again replaces the previous entry.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    entries: IndexMap<CapabilityKey, ProviderEntry>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, ty: TypeId) -> Option<ProviderEntry> {
        self.register_from(name, ty, None)
    }

    pub fn register_from(&mut self, name: &str, ty: TypeId, origin: Option<&str>) -> Option<ProviderEntry> {
        self.entries.insert(
            CapabilityKey::of(name),
            ProviderEntry {
                ty,
                origin: origin.map(str::to_string),
            },
        )
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.entry(name).map(|entry| entry.ty)
    }

    pub fn entry(&self, name: &str) -> Option<&ProviderEntry> {
        self.entries.get(&CapabilityKey::of(name))
    }

    /// Capability names in first-registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(CapabilityKey::name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
