use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use crate::types::{IndexError, ParseError, Result};

/// Grammar flavour, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    TypeScript,
    Tsx,
}

impl Dialect {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tsx") | Some("jsx") => Dialect::Tsx,
            _ => Dialect::TypeScript,
        }
    }

    pub fn language(self) -> tree_sitter::Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// `tree_sitter::Parser` is not `Sync`, so every call gets its own.
pub fn parse_tree(text: &str, dialect: Dialect) -> Result<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&dialect.language())?;

    parser
        .parse(text, None)
        .ok_or_else(|| IndexError::Internal("tree-sitter returned no tree".to_string()))
}

/// First `ERROR` or missing node in document order, as a diagnostic.
pub fn first_syntax_error(tree: &Tree, text: &str, file: &str) -> Option<ParseError> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }

    let node = find_error_node(root)?;
    let position = node.start_position();
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let snippet = text
            .get(node.byte_range())
            .and_then(|s| s.lines().next())
            .unwrap_or_default();
        let snippet: String = snippet.chars().take(40).collect();
        format!("unexpected `{snippet}`")
    };

    Some(ParseError::new(
        file,
        position.row as u32 + 1,
        position.column as u32 + 1,
        message,
    ))
}

fn find_error_node(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .find_map(find_error_node);
    found
}
