use serde::{Deserialize, Serialize};

use super::declaration::Location;
use super::import::SymbolSpecifier;

/// `export * from "X"` or `export * as ns from "X"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllExport {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub location: Location,
}

/// `export {a, b as c}` with or without a `from` clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedExport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub specifiers: Vec<SymbolSpecifier>,
    pub is_type_only: bool,
    pub location: Location,
}

/// What an `export = name` statement points at inside its own resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum AssignedTarget {
    /// Position in the owning resource's `declarations`.
    Declaration(usize),
    /// Position in the owning resource's nested `resources`.
    Resource(usize),
}

/// `export = expr`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignedExport {
    pub name: String,
    pub targets: Vec<AssignedTarget>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Export {
    All(AllExport),
    Named(NamedExport),
    Assigned(AssignedExport),
}

impl Export {
    /// The module specifier this export re-exports from, if any.
    pub fn source_module(&self) -> Option<&str> {
        match self {
            Export::All(e) => Some(&e.from),
            Export::Named(e) => e.from.as_deref(),
            Export::Assigned(_) => None,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Export::All(e) => e.location,
            Export::Named(e) => e.location,
            Export::Assigned(e) => e.location,
        }
    }
}
