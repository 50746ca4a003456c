use std::collections::HashMap;
use std::sync::OnceLock;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor, QueryError, Tree};

use crate::types::{IndexError, Resource, Result};

use super::classify::{
    has_ancestor_of_kind, is_declaration_name, is_qualified_type_member, text,
};
use super::syntax::Dialect;

/// Candidate identifier references. Member names (`b` in `a.b`) are
/// `property_identifier` nodes and never match, except class field names.
const USAGE_QUERY: &str = r#"
(identifier) @usage
(type_identifier) @usage
(shorthand_property_identifier) @usage
(public_field_definition name: (property_identifier) @usage)
"#;

/// Subtrees whose identifiers name bindings of other modules.
const EXCLUDED_CONTAINERS: &[&str] = &[
    "import_statement",
    "import_require_clause",
    "export_clause",
    "namespace_export",
];

fn usage_query(dialect: Dialect) -> Result<&'static Query> {
    static TYPESCRIPT: OnceLock<std::result::Result<Query, QueryError>> = OnceLock::new();
    static TSX: OnceLock<std::result::Result<Query, QueryError>> = OnceLock::new();

    let cell = match dialect {
        Dialect::TypeScript => &TYPESCRIPT,
        Dialect::Tsx => &TSX,
    };

    cell.get_or_init(|| Query::new(&dialect.language(), USAGE_QUERY))
        .as_ref()
        .map_err(|e| IndexError::Internal(format!("invalid usage query: {e}")))
}

fn is_usage(node: Node) -> bool {
    if has_ancestor_of_kind(node, EXCLUDED_CONTAINERS) {
        return false;
    }
    // `export default X;`, `export = X;` and `export as namespace X;`
    if node.parent().is_some_and(|p| p.kind() == "export_statement") {
        return false;
    }
    !is_declaration_name(node) && !is_qualified_type_member(node)
}

/// Adds identifier usages to the resource that owns them. `owners` maps the
/// syntax node of every nested resource to its index path below `root`.
pub fn collect_usages(
    tree: &Tree,
    src: &str,
    dialect: Dialect,
    owners: &HashMap<usize, Vec<usize>>,
    root: &mut Resource,
) -> Result<()> {
    let query = usage_query(dialect)?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, tree.root_node(), src.as_bytes());

    while let Some(m) = matches.next() {
        for capture in m.captures {
            let node = capture.node;
            if !is_usage(node) {
                continue;
            }

            let name = text(node, src);
            if name.is_empty() {
                continue;
            }

            let owner = owner_path(node, owners);
            resource_at(root, owner).usages.insert(name.to_string());
        }
    }

    Ok(())
}

fn owner_path<'o>(node: Node, owners: &'o HashMap<usize, Vec<usize>>) -> &'o [usize] {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if let Some(path) = owners.get(&ancestor.id()) {
            return path;
        }
        current = ancestor.parent();
    }
    &[]
}

fn resource_at<'r>(root: &'r mut Resource, path: &[usize]) -> &'r mut Resource {
    let mut current = root;
    for &idx in path {
        if idx >= current.resources.len() {
            break;
        }
        current = &mut current.resources[idx];
    }
    current
}
