//! Shallow type inference for JavaScript files.
//!
//! One pass over the syntax tree assigns abstract values to variables,
//! parameters and expressions. Types flow forward only: a value receives
//! the types its source held at the time the assignment was walked. That is
//! enough for the shapes the resolver needs (object literals, hoisted
//! functions, `new` instances, member reads and writes).
//!
//! # Usage
//!
//! ```ignore
//! let inference = infer_file(&source_file, &mut store)?;
//! let value = inference.expression(node.id());
//! ```

pub mod scope;

use crate::error::Result;
use archscope_api::syntax::{
    function_parameters, identifier_name, is_function, named_children, parameter_name,
    property_key_name,
};
use archscope_api::{Primitive, SourceFile, Type, TypeId, TypeStore, ValueId};
use scope::{ScopeId, ScopeManager};
use std::collections::HashMap;
use tree_sitter::Node;

/// Everything inferred for one file.
#[derive(Debug, Default, Clone)]
pub struct FileInference {
    pub scopes: ScopeManager,
    expressions: HashMap<usize, ValueId>,
}

impl FileInference {
    /// Value of an expression node, by tree-sitter node id.
    pub fn expression(&self, node_id: usize) -> Option<ValueId> {
        self.expressions.get(&node_id).copied()
    }
}

pub fn infer_file(source: &SourceFile, store: &mut TypeStore) -> Result<FileInference> {
    let root = source.root();
    let mut inferrer = Inferrer {
        text: &source.text,
        file: &source.name,
        store,
        scopes: ScopeManager::new(),
        expressions: HashMap::new(),
        functions: HashMap::new(),
        returns: Vec::new(),
    };
    let scope = inferrer.scopes.register_scope(root.id(), None);
    inferrer.hoist(&root, scope)?;
    inferrer.walk_children(&root, scope)?;

    Ok(FileInference {
        scopes: inferrer.scopes,
        expressions: inferrer.expressions,
    })
}

struct Inferrer<'a> {
    text: &'a str,
    file: &'a str,
    store: &'a mut TypeStore,
    scopes: ScopeManager,
    expressions: HashMap<usize, ValueId>,
    /// Function types created while hoisting, by declaration node id.
    functions: HashMap<usize, TypeId>,
    /// Return values of the functions being walked, innermost last.
    returns: Vec<ValueId>,
}

fn is_expression(kind: &str) -> bool {
    matches!(
        kind,
        "identifier"
            | "this"
            | "number"
            | "string"
            | "template_string"
            | "regex"
            | "true"
            | "false"
            | "null"
            | "undefined"
            | "object"
            | "array"
            | "function_expression"
            | "function"
            | "generator_function"
            | "arrow_function"
            | "class"
            | "call_expression"
            | "new_expression"
            | "member_expression"
            | "subscript_expression"
            | "assignment_expression"
            | "augmented_assignment_expression"
            | "binary_expression"
            | "unary_expression"
            | "update_expression"
            | "ternary_expression"
            | "parenthesized_expression"
            | "sequence_expression"
            | "await_expression"
    )
}

impl<'a> Inferrer<'a> {
    fn text_of(&self, node: &Node) -> &'a str {
        let text: &'a str = self.text;
        node.utf8_text(text.as_bytes()).unwrap_or_default()
    }

    fn value_of(&mut self, ty: TypeId) -> Result<ValueId> {
        let value = self.store.new_value();
        self.store.add_type(value, ty)?;
        Ok(value)
    }

    fn literal(&mut self, prim: Primitive) -> Result<ValueId> {
        let ty = self.store.prim(prim);
        self.value_of(ty)
    }

    /// Declare `var` names and function declarations of a function body (or
    /// the program) ahead of walking it. Nested functions keep their own.
    fn hoist(&mut self, node: &Node, scope: ScopeId) -> Result<()> {
        let text: &'a str = self.text;
        for child in named_children(node) {
            match child.kind() {
                "function_declaration" | "generator_function_declaration" => {
                    let ty = self.function_type(&child);
                    self.functions.insert(child.id(), ty);
                    let name = child
                        .child_by_field_name("name")
                        .and_then(|n| identifier_name(&n, text));
                    if let Some(name) = name {
                        if let Some(binding) = self.scopes.declare(self.store, scope, name) {
                            self.store.add_type(binding, ty)?;
                        }
                    }
                }
                "variable_declaration" => {
                    for declarator in named_children(&child) {
                        let name = declarator
                            .child_by_field_name("name")
                            .and_then(|n| identifier_name(&n, text));
                        if let Some(name) = name {
                            self.scopes.declare(self.store, scope, name);
                        }
                    }
                }
                "class_declaration" | "class" => {}
                _ if is_function(&child) => {}
                _ => self.hoist(&child, scope)?,
            }
        }
        Ok(())
    }

    fn function_type(&mut self, node: &Node) -> TypeId {
        let text: &'a str = self.text;
        let name = node
            .child_by_field_name("name")
            .and_then(|n| identifier_name(&n, text));
        let params = function_parameters(node)
            .iter()
            .map(|p| parameter_name(p, text).unwrap_or("?").to_string())
            .collect();
        self.store.new_fn(name, params, Some(self.file))
    }

    fn walk_children(&mut self, node: &Node, scope: ScopeId) -> Result<()> {
        for child in named_children(node) {
            self.walk(&child, scope)?;
        }
        Ok(())
    }

    fn walk(&mut self, node: &Node, scope: ScopeId) -> Result<()> {
        match node.kind() {
            "variable_declaration" | "lexical_declaration" => {
                for declarator in named_children(node) {
                    self.declarator(&declarator, scope)?;
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                self.function(node, scope)?;
            }
            "return_statement" => {
                if let Some(argument) = named_children(node).first() {
                    let value = self.expr(argument, scope)?;
                    if let Some(ret) = self.returns.last().copied() {
                        self.store.propagate(value, ret)?;
                    }
                }
            }
            kind if is_expression(kind) => {
                self.expr(node, scope)?;
            }
            _ => self.walk_children(node, scope)?,
        }
        Ok(())
    }

    fn declarator(&mut self, declarator: &Node, scope: ScopeId) -> Result<()> {
        if declarator.kind() != "variable_declarator" {
            return Ok(());
        }
        let text: &'a str = self.text;
        let binding = declarator
            .child_by_field_name("name")
            .and_then(|n| identifier_name(&n, text))
            .and_then(|name| self.scopes.declare(self.store, scope, name));
        if let Some(value_node) = declarator.child_by_field_name("value") {
            let value = self.expr(&value_node, scope)?;
            if let Some(binding) = binding {
                self.store.propagate(value, binding)?;
            }
        }
        Ok(())
    }

    fn expr(&mut self, node: &Node, scope: ScopeId) -> Result<ValueId> {
        let value = match node.kind() {
            "number" => self.literal(Primitive::Number)?,
            "string" | "template_string" => self.literal(Primitive::String)?,
            "true" | "false" => self.literal(Primitive::Bool)?,
            "identifier" => {
                let name = self.text_of(node);
                match self.scopes.lookup(scope, name) {
                    Some(binding) => binding,
                    None => self.store.new_value(),
                }
            }
            "parenthesized_expression" | "sequence_expression" => {
                let mut last = None;
                for child in named_children(node) {
                    last = Some(self.expr(&child, scope)?);
                }
                match last {
                    Some(value) => value,
                    None => self.store.new_value(),
                }
            }
            "object" => self.object(node, scope)?,
            "array" => {
                for element in named_children(node) {
                    self.walk(&element, scope)?;
                }
                let array = self.store.new_obj(Some("Array"), Some(self.file));
                self.value_of(array)?
            }
            "function_expression" | "function" | "generator_function" | "arrow_function" => {
                self.function(node, scope)?
            }
            "member_expression" => self.member(node, scope)?,
            "call_expression" => self.call(node, scope)?,
            "new_expression" => self.construct(node, scope)?,
            "assignment_expression" => self.assign(node, scope)?,
            "ternary_expression" => {
                if let Some(condition) = node.child_by_field_name("condition") {
                    self.expr(&condition, scope)?;
                }
                let value = self.store.new_value();
                for field in ["consequence", "alternative"] {
                    if let Some(branch) = node.child_by_field_name(field) {
                        let branch_value = self.expr(&branch, scope)?;
                        self.store.propagate(branch_value, value)?;
                    }
                }
                value
            }
            _ => {
                self.walk_children(node, scope)?;
                self.store.new_value()
            }
        };
        self.expressions.insert(node.id(), value);
        Ok(value)
    }

    fn function(&mut self, node: &Node, scope: ScopeId) -> Result<ValueId> {
        let text: &'a str = self.text;
        let fn_ty = match self.functions.get(&node.id()) {
            Some(ty) => *ty,
            None => self.function_type(node),
        };
        let fn_scope = self.scopes.register_scope(node.id(), Some(scope));

        // A named function expression sees its own name.
        if !matches!(
            node.kind(),
            "function_declaration" | "generator_function_declaration"
        ) {
            let own_name = node
                .child_by_field_name("name")
                .and_then(|n| identifier_name(&n, text));
            if let Some(name) = own_name {
                if let Some(binding) = self.scopes.declare(self.store, fn_scope, name) {
                    self.store.add_type(binding, fn_ty)?;
                }
            }
        }

        for param in function_parameters(node) {
            let Some(name) = parameter_name(&param, text) else {
                continue;
            };
            let binding = self.scopes.declare(self.store, fn_scope, name);
            if param.kind() == "assignment_pattern" {
                if let Some(default) = param.child_by_field_name("right") {
                    let value = self.expr(&default, fn_scope)?;
                    if let Some(binding) = binding {
                        self.store.propagate(value, binding)?;
                    }
                }
            }
        }

        let ret = match self.store.get(fn_ty) {
            Some(Type::Fn(func)) => func.ret,
            _ => self.store.new_value(),
        };
        if let Some(body) = node.child_by_field_name("body") {
            self.returns.push(ret);
            let walked = if body.kind() == "statement_block" {
                self.hoist(&body, fn_scope)
                    .and_then(|_| self.walk_children(&body, fn_scope))
            } else {
                self.expr(&body, fn_scope)
                    .and_then(|value| Ok(self.store.propagate(value, ret)?))
            };
            self.returns.pop();
            walked?;
        }

        let value = self.value_of(fn_ty)?;
        self.expressions.insert(node.id(), value);
        Ok(value)
    }

    fn object(&mut self, node: &Node, scope: ScopeId) -> Result<ValueId> {
        let text: &'a str = self.text;
        let obj = self.store.new_obj(None, Some(self.file));
        for child in named_children(node) {
            match child.kind() {
                "pair" => {
                    let key = child
                        .child_by_field_name("key")
                        .and_then(|k| property_key_name(&k, text));
                    let value = match child.child_by_field_name("value") {
                        Some(value_node) => Some(self.expr(&value_node, scope)?),
                        None => None,
                    };
                    if let (Some(key), Some(value)) = (key, value) {
                        let member = self.store.ensure_obj_prop(obj, &key)?;
                        self.store.propagate(value, member)?;
                    }
                }
                "shorthand_property_identifier" => {
                    let name = self.text_of(&child);
                    let member = self.store.ensure_obj_prop(obj, name)?;
                    if let Some(binding) = self.scopes.lookup(scope, name) {
                        self.store.propagate(binding, member)?;
                    }
                }
                "method_definition" => {
                    let key = child
                        .child_by_field_name("name")
                        .and_then(|k| property_key_name(&k, text));
                    let value = self.function(&child, scope)?;
                    if let Some(key) = key {
                        let member = self.store.ensure_obj_prop(obj, &key)?;
                        self.store.propagate(value, member)?;
                    }
                }
                _ => self.walk(&child, scope)?,
            }
        }
        self.value_of(obj)
    }

    fn member(&mut self, node: &Node, scope: ScopeId) -> Result<ValueId> {
        let text: &'a str = self.text;
        let object = match node.child_by_field_name("object") {
            Some(object) => self.expr(&object, scope)?,
            None => self.store.new_value(),
        };
        let value = self.store.new_value();
        let name = node
            .child_by_field_name("property")
            .and_then(|p| identifier_name(&p, text));
        if let Some(name) = name {
            for ty in self.store.lookup_member(object, name) {
                self.store.add_type(value, ty)?;
            }
        }
        Ok(value)
    }

    fn call(&mut self, node: &Node, scope: ScopeId) -> Result<ValueId> {
        let callee = match node.child_by_field_name("function") {
            Some(function) => self.expr(&function, scope)?,
            None => self.store.new_value(),
        };
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for argument in named_children(&arguments) {
                self.walk(&argument, scope)?;
            }
        }

        let result = self.store.new_value();
        let callee_types: Vec<TypeId> = self
            .store
            .value(callee)
            .map(|v| v.types().collect())
            .unwrap_or_default();
        for ty in callee_types {
            let ret = match self.store.get(ty) {
                Some(Type::Fn(func)) => Some(func.ret),
                _ => None,
            };
            if let Some(ret) = ret {
                self.store.propagate(ret, result)?;
            }
        }
        Ok(result)
    }

    fn construct(&mut self, node: &Node, scope: ScopeId) -> Result<ValueId> {
        let text: &'a str = self.text;
        let constructor = node.child_by_field_name("constructor");
        let name = constructor.and_then(|c| match c.kind() {
            "member_expression" => c
                .child_by_field_name("property")
                .and_then(|p| identifier_name(&p, text)),
            _ => identifier_name(&c, text),
        });
        if let Some(constructor) = constructor {
            self.expr(&constructor, scope)?;
        }
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for argument in named_children(&arguments) {
                self.walk(&argument, scope)?;
            }
        }
        let instance = self.store.new_obj(name, Some(self.file));
        self.value_of(instance)
    }

    fn assign(&mut self, node: &Node, scope: ScopeId) -> Result<ValueId> {
        let text: &'a str = self.text;
        let right = match node.child_by_field_name("right") {
            Some(right) => self.expr(&right, scope)?,
            None => self.store.new_value(),
        };
        let Some(left) = node.child_by_field_name("left") else {
            return Ok(right);
        };

        match left.kind() {
            "identifier" => {
                let name = self.text_of(&left);
                let binding = match self.scopes.lookup(scope, name) {
                    Some(binding) => Some(binding),
                    // Implicit global.
                    None => self
                        .scopes
                        .root()
                        .and_then(|root| self.scopes.declare(self.store, root, name)),
                };
                if let Some(binding) = binding {
                    self.store.propagate(right, binding)?;
                    self.expressions.insert(left.id(), binding);
                }
            }
            "member_expression" => {
                let object = match left.child_by_field_name("object") {
                    Some(object) => self.expr(&object, scope)?,
                    None => return Ok(right),
                };
                let name = left
                    .child_by_field_name("property")
                    .and_then(|p| identifier_name(&p, text));
                if let Some(name) = name {
                    let targets: Vec<TypeId> = self
                        .store
                        .value(object)
                        .map(|v| v.types().collect())
                        .unwrap_or_default();
                    for ty in targets {
                        if self.store.obj(ty).is_none() {
                            continue;
                        }
                        let member = self.store.ensure_obj_prop(ty, name)?;
                        self.store.propagate(right, member)?;
                    }
                }
            }
            _ => self.walk(&left, scope)?,
        }
        Ok(right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::JsParser;

    fn infer(source: &str) -> (SourceFile, TypeStore, FileInference) {
        let tree = JsParser::new().unwrap().parse(source).unwrap();
        let file = SourceFile::new("/ws/plugins/a.js", source, tree);
        let mut store = TypeStore::new();
        let inference = infer_file(&file, &mut store).unwrap();
        (file, store, inference)
    }

    fn find<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        if node.kind() == kind {
            return Some(node);
        }
        named_children(&node)
            .into_iter()
            .find_map(|child| find(child, kind))
    }

    #[test]
    fn test_object_literal_members() {
        let (file, store, inference) = infer("var api = { size: 3, name: 'x', run: function(a, b) {} };");
        let object = find(file.root(), "object").unwrap();
        let value = inference.expression(object.id()).unwrap();
        let obj = store.first_type(value).unwrap();

        let size = store.member_type(obj, "size").unwrap();
        assert_eq!(store.describe(size), "number");
        let name = store.member_type(obj, "name").unwrap();
        assert_eq!(store.describe(name), "string");
        let run = store.member_type(obj, "run").unwrap();
        assert_eq!(store.describe(run), "fn(a, b)");
    }

    #[test]
    fn test_hoisted_function_visible_before_declaration() {
        let (file, store, inference) = infer("var api = { go: go };\nfunction go(x) { return 1; }");
        let object = find(file.root(), "object").unwrap();
        let obj = store
            .first_type(inference.expression(object.id()).unwrap())
            .unwrap();
        let go = store.member_type(obj, "go").unwrap();
        assert_eq!(store.describe(go), "fn(x)");
    }

    #[test]
    fn test_function_scope_bindings() {
        let source = "function main(options, imports, register) { var fs = imports.fs; }";
        let (file, _store, inference) = infer(source);
        let func = find(file.root(), "function_declaration").unwrap();
        for name in ["options", "imports", "register", "fs"] {
            assert!(inference.scopes.own(func.id(), name).is_some(), "{name}");
        }
        let root = inference.scopes.root().unwrap();
        assert!(inference.scopes.own(root, "main").is_some());
        assert!(inference.scopes.own(root, "fs").is_none());
    }

    #[test]
    fn test_new_expression_and_member_assignment() {
        let source = "var p = new Plugin('a');\np.version = 2;\nvar v = p.version;";
        let (_file, store, inference) = infer(source);
        let root = inference.scopes.root().unwrap();
        let p = inference.scopes.own(root, "p").unwrap();
        let instance = store.first_type(p).unwrap();
        assert_eq!(store.describe(instance), "Plugin");

        let v = inference.scopes.own(root, "v").unwrap();
        let version = store.first_type(v).unwrap();
        assert_eq!(store.describe(version), "number");
    }

    #[test]
    fn test_call_returns_function_result() {
        let source = "function make() { return { a: 1 }; }\nvar made = make();";
        let (_file, store, inference) = infer(source);
        let root = inference.scopes.root().unwrap();
        let made = inference.scopes.own(root, "made").unwrap();
        let obj = store.first_type(made).unwrap();
        assert!(store.member_type(obj, "a").is_some());
    }
}
