//! Static extraction of `main.consumes = [...]` / `main.provides = [...]`.

use archscope_api::SourceFile;
use archscope_api::syntax::{identifier_name, named_children, string_literal_value};
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    Provides,
    Consumes,
}

impl CapabilityKind {
    pub fn property(&self) -> &'static str {
        match self {
            CapabilityKind::Provides => "provides",
            CapabilityKind::Consumes => "consumes",
        }
    }
}

/// Outcome of looking for a capability declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// The names from the last qualifying assignment, in source order.
    Declared(Vec<String>),
    Undeclared,
}

impl Declaration {
    pub fn names(&self) -> Option<&[String]> {
        match self {
            Declaration::Declared(names) => Some(names),
            Declaration::Undeclared => None,
        }
    }

    pub fn is_declared(&self) -> bool {
        matches!(self, Declaration::Declared(_))
    }
}

pub fn extract_declaration(source: &SourceFile, kind: CapabilityKind, owners: &[String]) -> Declaration {
    extract_declaration_in(&source.root(), &source.text, kind, owners)
}

/// Find the last `<owner>.<kind> = [ ... ]` in a subtree, where `<owner>`
/// is one of the entry function names. Non-string elements are skipped.
pub fn extract_declaration_in(
    node: &Node,
    text: &str,
    kind: CapabilityKind,
    owners: &[String],
) -> Declaration {
    let mut found = Declaration::Undeclared;
    visit(node, text, kind, owners, &mut found);
    found
}

fn visit(node: &Node, text: &str, kind: CapabilityKind, owners: &[String], found: &mut Declaration) {
    if node.kind() == "assignment_expression"
        && let Some(names) = declared_names(node, text, kind, owners)
    {
        *found = Declaration::Declared(names);
    }
    for child in named_children(node) {
        visit(&child, text, kind, owners, found);
    }
}

fn declared_names(
    assignment: &Node,
    text: &str,
    kind: CapabilityKind,
    owners: &[String],
) -> Option<Vec<String>> {
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "member_expression" {
        return None;
    }
    let object = left.child_by_field_name("object")?;
    let property = left.child_by_field_name("property")?;
    let owner = identifier_name(&object, text)?;
    if object.kind() != "identifier" || !owners.iter().any(|o| o == owner) {
        return None;
    }
    if identifier_name(&property, text)? != kind.property() {
        return None;
    }

    let right = assignment.child_by_field_name("right")?;
    if right.kind() != "array" {
        return None;
    }
    Some(
        named_children(&right)
            .iter()
            .filter_map(|element| string_literal_value(element, text))
            .filter(|name| !name.is_empty())
            .collect(),
    )
}
