//! Function scopes of a single file.

use archscope_api::{TypeStore, ValueId};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Identifier for a scope: the tree-sitter id of the node creating it.
pub type ScopeId = usize;

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub parent_id: Option<ScopeId>,
    pub vars: IndexMap<String, ValueId>,
}

/// Manages the scopes of a file: the program scope and one per function.
#[derive(Debug, Default, Clone)]
pub struct ScopeManager {
    scopes: HashMap<ScopeId, Scope>,
    root: Option<ScopeId>,
}

impl ScopeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_scope(&mut self, node_id: usize, parent: Option<ScopeId>) -> ScopeId {
        if parent.is_none() && self.root.is_none() {
            self.root = Some(node_id);
        }
        self.scopes.entry(node_id).or_insert_with(|| Scope {
            id: node_id,
            parent_id: parent,
            vars: IndexMap::new(),
        });
        node_id
    }

    pub fn root(&self) -> Option<ScopeId> {
        self.root
    }

    pub fn get(&self, scope: ScopeId) -> Option<&Scope> {
        self.scopes.get(&scope)
    }

    /// Declare a variable in `scope`, reusing an existing declaration.
    pub fn declare(&mut self, store: &mut TypeStore, scope: ScopeId, name: &str) -> Option<ValueId> {
        let entry = self.scopes.get_mut(&scope)?;
        if let Some(existing) = entry.vars.get(name) {
            return Some(*existing);
        }
        let value = store.new_value();
        entry.vars.insert(name.to_string(), value);
        Some(value)
    }

    /// Variable declared directly in `scope`.
    pub fn own(&self, scope: ScopeId, name: &str) -> Option<ValueId> {
        self.scopes.get(&scope)?.vars.get(name).copied()
    }

    /// Look up a variable starting from `scope` and walking up.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<ValueId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scopes.get(&id)?;
            if let Some(value) = scope.vars.get(name) {
                return Some(*value);
            }
            current = scope.parent_id;
        }
        None
    }
}
