//! Immutable result of one index build, shared with readers by `Arc`.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::types::{Declaration, Resource};

use super::resolve::{ExportSurface, ModuleTable};

/// One declaration reachable under an exported name.
#[derive(Debug, Clone, Serialize)]
pub struct DeclarationInfo {
    pub declaration: Arc<Declaration>,
    /// Module whose export surface provides the name.
    pub module: String,
    /// Module that declares it.
    pub origin: String,
}

impl DeclarationInfo {
    /// Specifier to import the declaration from: `module` without a
    /// trailing `/index`.
    pub fn import_path(&self) -> &str {
        match self.module.strip_suffix("/index") {
            Some("") => "/",
            Some(path) => path,
            None => &self.module,
        }
    }

    fn same_as(&self, other: &DeclarationInfo) -> bool {
        Arc::ptr_eq(&self.declaration, &other.declaration) && self.module == other.module
    }
}

/// The value of an `export = name` statement.
#[derive(Debug, Clone, Serialize)]
pub struct AssignedValue {
    pub name: String,
    pub declarations: Vec<Arc<Declaration>>,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Default, Serialize)]
pub struct IndexSnapshot {
    parsed_resources: IndexMap<String, Arc<Resource>>,
    index: IndexMap<String, Vec<DeclarationInfo>>,
    defaults: IndexMap<String, DeclarationInfo>,
    assigned: IndexMap<String, AssignedValue>,
    conflicts: Vec<String>,
}

impl IndexSnapshot {
    pub(crate) fn assemble(
        table: &ModuleTable,
        surfaces: &IndexMap<String, Arc<ExportSurface>>,
    ) -> Self {
        let mut snapshot = Self {
            parsed_resources: table
                .modules
                .iter()
                .map(|(key, entry)| (key.clone(), Arc::clone(&entry.resource)))
                .collect(),
            ..Self::default()
        };

        for (key, surface) in surfaces {
            for (name, bindings) in &surface.named {
                for binding in bindings {
                    snapshot.insert(
                        name,
                        DeclarationInfo {
                            declaration: Arc::clone(&binding.declaration),
                            module: key.clone(),
                            origin: binding.origin.clone(),
                        },
                    );
                }
            }

            if let Some(binding) = &surface.default {
                snapshot.defaults.insert(
                    key.clone(),
                    DeclarationInfo {
                        declaration: Arc::clone(&binding.declaration),
                        module: key.clone(),
                        origin: binding.origin.clone(),
                    },
                );
            }
            if let Some(value) = &surface.assigned {
                snapshot.assigned.insert(key.clone(), value.clone());
            }
            if surface.conflict {
                snapshot.conflicts.push(key.clone());
            }
        }

        for entry in table.modules.values() {
            let (Some(alias), Some(declared_in)) = (&entry.alias, &entry.declared_in) else {
                continue;
            };
            if let Some(name) = alias.name() {
                snapshot.insert(
                    name,
                    DeclarationInfo {
                        declaration: Arc::clone(alias),
                        module: entry.key.clone(),
                        origin: declared_in.clone(),
                    },
                );
            }
        }

        snapshot
    }

    fn insert(&mut self, name: &str, info: DeclarationInfo) {
        let list = self.index.entry(name.to_string()).or_default();
        if !list.iter().any(|existing| existing.same_as(&info)) {
            list.push(info);
        }
    }

    pub fn parsed_resources(&self) -> &IndexMap<String, Arc<Resource>> {
        &self.parsed_resources
    }

    pub fn resource(&self, key: &str) -> Option<&Resource> {
        self.parsed_resources.get(key).map(Arc::as_ref)
    }

    /// Every declaration exported under `name`; empty when unknown.
    pub fn lookup(&self, name: &str) -> &[DeclarationInfo] {
        self.index.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn index(&self) -> &IndexMap<String, Vec<DeclarationInfo>> {
        &self.index
    }

    pub fn default_export(&self, key: &str) -> Option<&DeclarationInfo> {
        self.defaults.get(key)
    }

    pub fn assigned_export(&self, key: &str) -> Option<&AssignedValue> {
        self.assigned.get(key)
    }

    /// Modules that mix `export =` with named or star exports.
    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
