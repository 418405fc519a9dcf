use serde::{Deserialize, Serialize};
use std::fmt;

/// Key under which a capability is stored in provider registries and in the
/// host's capability path table.
///
/// The wire form is the capability name prefixed with an underscore, so that
/// names like `constructor` never collide with anything else the host keeps
/// in the same table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityKey(String);

impl CapabilityKey {
    pub const PREFIX: char = '_';

    pub fn of(name: &str) -> Self {
        Self(format!("{}{}", Self::PREFIX, name))
    }

    /// Parse a wire key. Keys without the prefix are rejected.
    pub fn from_wire(key: &str) -> Option<Self> {
        key.strip_prefix(Self::PREFIX).map(Self::of)
    }

    pub fn name(&self) -> &str {
        &self.0[Self::PREFIX.len_utf8()..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
