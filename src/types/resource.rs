use std::path::PathBuf;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::declaration::{Declaration, Location};
use super::export::{AssignedTarget, Export};
use super::import::Import;
use crate::index::module_key::module_key;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Namespace,
    Module,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::File => write!(f, "file"),
            ResourceKind::Namespace => write!(f, "namespace"),
            ResourceKind::Module => write!(f, "module"),
        }
    }
}

/// Parsed structure of one file or of a namespace/module nested in it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<PathBuf>,

    #[serde(default)]
    pub exported: bool,

    #[serde(default)]
    pub ambient: bool,

    pub declarations: Vec<Declaration>,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub usages: IndexSet<String>,
    pub resources: Vec<Resource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Resource {
    pub fn file(file_path: PathBuf, root_path: PathBuf) -> Self {
        Self {
            file_path: Some(file_path),
            root_path: Some(root_path),
            ..Self::empty(ResourceKind::File)
        }
    }

    pub fn nested(kind: ResourceKind, name: String, location: Location) -> Self {
        Self {
            name: Some(name),
            location: Some(location),
            ..Self::empty(kind)
        }
    }

    fn empty(kind: ResourceKind) -> Self {
        Self {
            kind,
            name: None,
            file_path: None,
            root_path: None,
            exported: false,
            ambient: false,
            declarations: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            usages: IndexSet::new(),
            resources: Vec::new(),
            location: None,
        }
    }

    /// Module key for files, declared name for namespaces and modules.
    pub fn identifier(&self) -> String {
        match (&self.file_path, &self.root_path) {
            (Some(file), Some(root)) => module_key(file, root),
            _ => self.name.clone().unwrap_or_default(),
        }
    }

    /// Import alias for a module name: `my-lib_utils` becomes `myLibUtils`.
    pub fn namespace_alias(&self) -> String {
        let name = self.name.as_deref().unwrap_or_default();
        let name = name.rsplit('/').next().unwrap_or(name);

        name.split(['-', '_', '.'])
            .filter(|part| !part.is_empty())
            .enumerate()
            .map(|(idx, part)| {
                let lower = part.to_lowercase();
                if idx == 0 {
                    return lower;
                }
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect()
    }

    /// Copy with the transient identity fields removed, recursively.
    pub fn without_paths(&self) -> Self {
        let mut copy = self.clone();
        copy.strip_paths();
        copy
    }

    fn strip_paths(&mut self) {
        self.file_path = None;
        self.root_path = None;
        for nested in &mut self.resources {
            nested.strip_paths();
        }
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name() == Some(name))
    }

    /// Declarations and nested resources an `export =` target refers to.
    pub fn assigned_targets(
        &self,
        targets: &[AssignedTarget],
    ) -> (Vec<&Declaration>, Vec<&Resource>) {
        let mut declarations = Vec::new();
        let mut resources = Vec::new();
        for target in targets {
            match *target {
                AssignedTarget::Declaration(idx) => {
                    declarations.extend(self.declarations.get(idx));
                }
                AssignedTarget::Resource(idx) => {
                    resources.extend(self.resources.get(idx));
                }
            }
        }
        (declarations, resources)
    }
}
