//! Small helpers over tree-sitter JavaScript syntax trees, shared by the
//! engine and its plugins.

use tree_sitter::Node;

/// Named children of a node, excluding comments.
pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Text of an identifier-like node (`identifier`, `property_identifier`, ...).
pub fn identifier_name<'s>(node: &Node, source: &'s str) -> Option<&'s str> {
    match node.kind() {
        "identifier"
        | "property_identifier"
        | "shorthand_property_identifier"
        | "shorthand_property_identifier_pattern"
        | "private_property_identifier" => node.utf8_text(source.as_bytes()).ok(),
        _ => None,
    }
}

/// Value of a plain string literal node. Template strings are not literals.
pub fn string_literal_value(node: &Node, source: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let raw = node.utf8_text(source.as_bytes()).ok()?;
    let inner = raw.get(1..raw.len().checked_sub(1)?)?;
    Some(unescape(inner))
}

/// Name of an object literal key: identifiers, strings and numbers.
/// Computed keys have no static name.
pub fn property_key_name(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "string" => string_literal_value(node, source),
        "number" => node.utf8_text(source.as_bytes()).ok().map(str::to_string),
        _ => identifier_name(node, source).map(str::to_string),
    }
}

/// Whether a node is a function of any syntactic form.
pub fn is_function(node: &Node) -> bool {
    matches!(
        node.kind(),
        "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "function"
            | "generator_function"
            | "arrow_function"
            | "method_definition"
    )
}

/// Parameter nodes of a function, including the bare parameter of
/// `x => ...` arrows.
pub fn function_parameters<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    if let Some(single) = node.child_by_field_name("parameter") {
        return vec![single];
    }
    node.child_by_field_name("parameters")
        .map(|params| named_children(&params))
        .unwrap_or_default()
}

/// Bound name of a parameter node. Destructuring patterns have none.
pub fn parameter_name<'s>(param: &Node, source: &'s str) -> Option<&'s str> {
    match param.kind() {
        "identifier" => identifier_name(param, source),
        "assignment_pattern" => param
            .child_by_field_name("left")
            .and_then(|left| identifier_name(&left, source)),
        "rest_pattern" => named_children(param)
            .first()
            .and_then(|inner| identifier_name(inner, source)),
        _ => None,
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
