use serde::{Deserialize, Serialize};

use super::declaration::Location;

/// One `name as alias` entry of an import or export clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolSpecifier {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl SymbolSpecifier {
    pub fn new(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            name: name.into(),
            alias,
        }
    }

    /// The name this specifier binds on the receiving side.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// `import "m";`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StringImport {
    pub library_name: String,
    pub location: Location,
}

/// `import {a, b as c} from "m"`, optionally with a leading default binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedImport {
    pub library_name: String,
    pub specifiers: Vec<SymbolSpecifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_alias: Option<String>,
    pub is_type_only: bool,
    pub location: Location,
}

/// `import * as NS from "m"`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamespaceImport {
    pub library_name: String,
    pub alias: String,
    pub is_type_only: bool,
    pub location: Location,
}

/// `import D from "m"`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefaultImport {
    pub library_name: String,
    pub alias: String,
    pub location: Location,
}

/// `import x = require("m")`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalModuleImport {
    pub library_name: String,
    pub alias: String,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Import {
    String(StringImport),
    Named(NamedImport),
    Namespace(NamespaceImport),
    Default(DefaultImport),
    ExternalModule(ExternalModuleImport),
}

impl Import {
    pub fn library_name(&self) -> &str {
        match self {
            Import::String(i) => &i.library_name,
            Import::Named(i) => &i.library_name,
            Import::Namespace(i) => &i.library_name,
            Import::Default(i) => &i.library_name,
            Import::ExternalModule(i) => &i.library_name,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Import::String(i) => i.location,
            Import::Named(i) => i.location,
            Import::Namespace(i) => i.location,
            Import::Default(i) => i.location,
            Import::ExternalModule(i) => i.location,
        }
    }

    /// Local names this import introduces, in source order.
    pub fn local_names(&self) -> Vec<&str> {
        match self {
            Import::String(_) => Vec::new(),
            Import::Named(i) => i
                .default_alias
                .as_deref()
                .into_iter()
                .chain(i.specifiers.iter().map(SymbolSpecifier::local_name))
                .collect(),
            Import::Namespace(i) => vec![i.alias.as_str()],
            Import::Default(i) => vec![i.alias.as_str()],
            Import::ExternalModule(i) => vec![i.alias.as_str()],
        }
    }
}
