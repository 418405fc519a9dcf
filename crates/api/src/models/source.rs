use tree_sitter::{Node, Tree};

/// A parsed source file as held by an inference session.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path of the file, as given to the session.
    pub name: String,
    pub text: String,
    pub tree: Tree,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>, tree: Tree) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            tree,
        }
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by a node of this file's tree.
    pub fn node_text(&self, node: &Node) -> &str {
        node.utf8_text(self.text.as_bytes()).unwrap_or_default()
    }
}
