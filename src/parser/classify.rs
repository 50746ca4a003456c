//! Stateless helpers over TypeScript syntax nodes.

use tree_sitter::Node;

use crate::types::{Location, Visibility};

/// Node kinds whose `name` field introduces a binding rather than using one.
const NAMED_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "abstract_class_declaration",
    "class",
    "interface_declaration",
    "type_alias_declaration",
    "enum_declaration",
    "function_declaration",
    "generator_function_declaration",
    "function_signature",
    "function_expression",
    "generator_function",
    "internal_module",
    "module",
    "type_parameter",
];

/// Kinds that open a new function or class scope.
const SCOPE_BOUNDARIES: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
    "class_declaration",
    "abstract_class_declaration",
    "class",
];

pub fn text<'a>(node: Node, src: &'a str) -> &'a str {
    src.get(node.byte_range()).unwrap_or_default()
}

pub fn location(node: Node) -> Location {
    Location::new(node.start_byte(), node.end_byte())
}

pub fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner;
        }
    }
    trimmed
}

pub fn field_text(node: Node, field: &str, src: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|child| unquote(text(child, src)).to_string())
}

pub fn same_node(a: Node, b: Node) -> bool {
    a.id() == b.id()
}

/// Anonymous keyword tokens written before the node's `name`, e.g.
/// `static`, `async`, `get`, `readonly`, `abstract`.
pub fn modifiers(node: Node) -> Vec<&'static str> {
    let name = node.child_by_field_name("name");
    let mut cursor = node.walk();
    let mut found = Vec::new();

    for child in node.children(&mut cursor) {
        if name.is_some_and(|n| same_node(n, child)) {
            break;
        }
        if !child.is_named() {
            found.push(child.kind());
        }
    }
    found
}

/// Whether any direct anonymous child is the given token.
pub fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

pub fn named_children_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .filter(|child| kinds.contains(&child.kind()))
        .collect();
    found
}

pub fn first_named_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == kind);
    found
}

pub fn visibility(node: Node, src: &str) -> Visibility {
    let name_is_private = node
        .child_by_field_name("name")
        .is_some_and(|n| n.kind() == "private_property_identifier");
    if name_is_private {
        return Visibility::Private;
    }

    match first_named_child_of_kind(node, "accessibility_modifier").map(|m| text(m, src)) {
        Some("private") => Visibility::Private,
        Some("protected") => Visibility::Protected,
        _ => Visibility::Public,
    }
}

/// Text of the type inside a `: T` annotation, a type predicate, or an
/// `asserts` clause.
pub fn annotation_text(annotation: Node, src: &str) -> Option<String> {
    match annotation.kind() {
        "type_annotation" | "type_predicate_annotation" | "asserts_annotation"
        | "omitting_type_annotation" | "adding_type_annotation"
        | "opting_type_annotation" => annotation
            .named_child(0)
            .map(|inner| text(inner, src).to_string()),
        _ => Some(text(annotation, src).to_string()),
    }
}

pub fn field_annotation(node: Node, field: &str, src: &str) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|annotation| annotation_text(annotation, src))
}

pub fn type_parameters(node: Node, src: &str) -> Vec<String> {
    let Some(params) = node.child_by_field_name("type_parameters") else {
        return Vec::new();
    };

    named_children_of_kind(params, &["type_parameter"])
        .into_iter()
        .filter_map(|param| field_text(param, "name", src))
        .collect()
}

pub fn is_scope_boundary(kind: &str) -> bool {
    SCOPE_BOUNDARIES.contains(&kind)
}

/// Whether the node sits in the `name` slot of a declaration, including
/// every segment of a dotted namespace name like `A.B.C`.
pub fn is_declaration_name(node: Node) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.kind() != "nested_identifier" {
            break;
        }
        current = parent;
    }

    let Some(parent) = current.parent() else {
        return false;
    };
    NAMED_DECLARATIONS.contains(&parent.kind())
        && parent
            .child_by_field_name("name")
            .is_some_and(|name| same_node(name, current))
}

/// The `B` of a qualified type `A.B`.
pub fn is_qualified_type_member(node: Node) -> bool {
    node.parent().is_some_and(|parent| {
        parent.kind() == "nested_type_identifier"
            && parent
                .child_by_field_name("name")
                .is_some_and(|name| same_node(name, node))
    })
}

pub fn has_ancestor_of_kind(node: Node, kinds: &[&str]) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if kinds.contains(&parent.kind()) {
            return true;
        }
        current = parent.parent();
    }
    false
}
