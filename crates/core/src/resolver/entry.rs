//! Locating a module's entry function: `function main(options, imports, register)`.

use archscope_api::syntax::{
    function_parameters, identifier_name, named_children, parameter_name,
};
use tree_sitter::Node;

pub const IMPORTS_PARAM: &str = "imports";
pub const REGISTER_PARAM: &str = "register";

#[derive(Debug, Clone)]
pub struct EntryFunction<'t> {
    pub node: Node<'t>,
    pub name: String,
}

impl<'t> EntryFunction<'t> {
    /// Id of the node that owns the entry function's scope.
    pub fn scope_id(&self) -> usize {
        self.node.id()
    }

    pub fn body(&self) -> Option<Node<'t>> {
        self.node.child_by_field_name("body")
    }
}

/// Every function declaration named like an entry function with exactly the
/// three entry parameters, at any nesting depth.
pub fn find_entry_functions<'t>(root: Node<'t>, text: &str, names: &[String]) -> Vec<EntryFunction<'t>> {
    let mut found = Vec::new();
    collect(root, text, names, &mut found);
    found
}

fn collect<'t>(node: Node<'t>, text: &str, names: &[String], found: &mut Vec<EntryFunction<'t>>) {
    if node.kind() == "function_declaration"
        && let Some(entry) = as_entry(node, text, names)
    {
        found.push(entry);
    }
    for child in named_children(&node) {
        collect(child, text, names, found);
    }
}

fn as_entry<'t>(node: Node<'t>, text: &str, names: &[String]) -> Option<EntryFunction<'t>> {
    let name = node
        .child_by_field_name("name")
        .and_then(|n| identifier_name(&n, text))?;
    if !names.iter().any(|candidate| candidate == name) {
        return None;
    }

    let params = function_parameters(&node);
    if params.len() != 3 {
        return None;
    }
    let imports = parameter_name(&params[1], text)?;
    let register = parameter_name(&params[2], text)?;
    if imports != IMPORTS_PARAM || register != REGISTER_PARAM {
        return None;
    }

    Some(EntryFunction {
        node,
        name: name.to_string(),
    })
}

/// `var local = imports.name;` statements directly in the entry body, as
/// `(local, name)` pairs.
pub fn import_aliases(entry: &EntryFunction, text: &str) -> Vec<(String, String)> {
    let Some(body) = entry.body() else {
        return Vec::new();
    };
    let mut aliases = Vec::new();
    for statement in named_children(&body) {
        if !matches!(statement.kind(), "variable_declaration" | "lexical_declaration") {
            continue;
        }
        for declarator in named_children(&statement) {
            if let Some(alias) = alias_of(&declarator, text) {
                aliases.push(alias);
            }
        }
    }
    aliases
}

fn alias_of(declarator: &Node, text: &str) -> Option<(String, String)> {
    if declarator.kind() != "variable_declarator" {
        return None;
    }
    let local = identifier_name(&declarator.child_by_field_name("name")?, text)?;
    let value = declarator.child_by_field_name("value")?;
    if value.kind() != "member_expression" {
        return None;
    }
    let object = value.child_by_field_name("object")?;
    if object.kind() != "identifier" || identifier_name(&object, text)? != IMPORTS_PARAM {
        return None;
    }
    let property = identifier_name(&value.child_by_field_name("property")?, text)?;
    Some((local.to_string(), property.to_string()))
}

/// All calls inside a subtree, outermost first.
pub fn calls_within<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut calls = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.kind() == "call_expression" {
            calls.push(current);
        }
        let mut children = named_children(&current);
        children.reverse();
        stack.extend(children);
    }
    calls
}
