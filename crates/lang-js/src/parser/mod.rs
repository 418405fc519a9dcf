use crate::error::{JsError, Result};
use tree_sitter::{Parser, Tree};

pub mod comments;

pub use comments::comments_before;

#[derive(Clone)]
pub struct JsParser {
    pub language: tree_sitter::Language,
}

impl JsParser {
    pub fn new() -> Result<Self> {
        let language: tree_sitter::Language = tree_sitter_javascript::LANGUAGE.into();
        // Fail early on an ABI mismatch rather than on the first file.
        Parser::new()
            .set_language(&language)
            .map_err(|e| JsError::Language(e.to_string()))?;
        Ok(Self { language })
    }

    /// Parse a whole file. Syntax errors do not fail the parse; they show up
    /// as `ERROR` nodes in the returned tree.
    pub fn parse(&self, source: &str) -> Result<Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| JsError::Language(e.to_string()))?;
        parser
            .parse(source, None)
            .ok_or_else(|| JsError::Parsing("parser returned no tree".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_module_wrapper() {
        let source = r#"
            define(function(require, exports, module) {
                main.consumes = ["Plugin"];
                return main;
                function main(options, imports, register) {}
            });
        "#;
        let parser = JsParser::new().unwrap();
        let tree = parser.parse(source).unwrap();
        assert_eq!(tree.root_node().kind(), "program");
        assert!(!tree.root_node().has_error());
    }
}
