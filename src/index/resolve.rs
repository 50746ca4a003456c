//! Export surfaces: what each module makes importable, after following
//! re-exports through the module graph.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, warn};

use crate::types::{
    AssignedTarget, Declaration, Export, Import, ModuleDeclaration, Resource, ResourceKind,
};

use super::module_key::{is_declaration_file, ModuleResolver};
use super::snapshot::AssignedValue;

const DEFAULT_NAME: &str = "default";

#[derive(Debug, Clone)]
pub struct Binding {
    pub declaration: Arc<Declaration>,
    /// Module that declares the binding.
    pub origin: String,
}

impl Binding {
    fn new(declaration: &Arc<Declaration>, origin: &str) -> Self {
        Self {
            declaration: Arc::clone(declaration),
            origin: origin.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ExportSurface {
    pub named: IndexMap<String, Vec<Binding>>,
    pub default: Option<Binding>,
    pub assigned: Option<AssignedValue>,
    /// `export =` mixed with named exports; the named surface was dropped.
    pub conflict: bool,
}

impl ExportSurface {
    fn bind(&mut self, name: &str, binding: Binding) {
        if name == DEFAULT_NAME {
            if self.default.is_none() {
                self.default = Some(binding);
            }
            return;
        }

        let list = self.named.entry(name.to_string()).or_default();
        if !list
            .iter()
            .any(|b| Arc::ptr_eq(&b.declaration, &binding.declaration))
        {
            list.push(binding);
        }
    }

    fn bind_all(&mut self, name: &str, bindings: impl IntoIterator<Item = Binding>) {
        for binding in bindings {
            self.bind(name, binding);
        }
    }

    /// Bindings a re-export of `name` picks up from this surface.
    fn exported_as(&self, name: &str) -> Vec<Binding> {
        if name == DEFAULT_NAME {
            return self.default.iter().cloned().collect();
        }
        self.named.get(name).cloned().unwrap_or_default()
    }

    fn binding_count(&self) -> usize {
        self.named.values().map(Vec::len).sum::<usize>() + usize::from(self.default.is_some())
    }
}

/// A module ready for resolution: its resource plus shared handles for
/// every declaration and pre-resolved `from` specifiers.
#[derive(Debug)]
pub struct ModuleEntry {
    pub key: String,
    pub resource: Arc<Resource>,
    /// One shared handle per entry of `resource.declarations`.
    pub locals: Vec<Arc<Declaration>>,
    /// `Module` bindings per entry of `resource.resources`.
    pub nested: Vec<Arc<Declaration>>,
    /// Resolved target per entry of `resource.exports`.
    pub export_targets: Vec<Option<String>>,
    /// `export * as ns` bindings, by export position.
    pub star_aliases: HashMap<usize, Arc<Declaration>>,
    /// Resolved target per entry of `resource.imports`.
    pub import_targets: Vec<Option<String>>,
    /// `import * as ns` and `import ns = require()` bindings, by import
    /// position.
    pub namespace_imports: HashMap<usize, Arc<Declaration>>,
    /// File a hoisted ambient module was declared in.
    pub declared_in: Option<String>,
    /// Namespace alias binding of a hoisted ambient module.
    pub alias: Option<Arc<Declaration>>,
}

impl ModuleEntry {
    fn new(
        key: String,
        resource: Resource,
        declared_in: Option<String>,
        resolver: &dyn ModuleResolver,
        is_known: &dyn Fn(&str) -> bool,
    ) -> Self {
        let locals = resource
            .declarations
            .iter()
            .cloned()
            .map(Arc::new)
            .collect();
        let nested = resource
            .resources
            .iter()
            .map(|child| {
                let name = child.name.clone().unwrap_or_default();
                Arc::new(Declaration::Module(ModuleDeclaration {
                    target: name.clone(),
                    name,
                    exported: child.exported,
                    location: child.location.unwrap_or_default(),
                }))
            })
            .collect();

        let export_targets: Vec<Option<String>> = resource
            .exports
            .iter()
            .map(|export| {
                let specifier = export.source_module()?;
                let target = resolver.resolve(&key, specifier, is_known);
                if target.is_none() {
                    debug!(module = %key, specifier, "unresolved export specifier, dropping edge");
                }
                target
            })
            .collect();

        let star_aliases = resource
            .exports
            .iter()
            .zip(&export_targets)
            .enumerate()
            .filter_map(|(idx, (export, target))| match (export, target) {
                (Export::All(all), Some(target)) => {
                    let alias = all.alias.as_ref()?;
                    let binding = Arc::new(Declaration::Module(ModuleDeclaration {
                        name: alias.clone(),
                        exported: true,
                        target: target.clone(),
                        location: all.location,
                    }));
                    Some((idx, binding))
                }
                _ => None,
            })
            .collect();

        let import_targets: Vec<Option<String>> = resource
            .imports
            .iter()
            .map(|import| resolver.resolve(&key, import.library_name(), is_known))
            .collect();

        let namespace_imports = resource
            .imports
            .iter()
            .zip(&import_targets)
            .enumerate()
            .filter_map(|(idx, (import, target))| {
                let target = target.as_ref()?;
                let alias = match import {
                    Import::Namespace(ns) => &ns.alias,
                    Import::ExternalModule(ext) => &ext.alias,
                    _ => return None,
                };
                let binding = Arc::new(Declaration::Module(ModuleDeclaration {
                    name: alias.clone(),
                    exported: true,
                    target: target.clone(),
                    location: import.location(),
                }));
                Some((idx, binding))
            })
            .collect();

        let alias = declared_in.as_ref().and_then(|_| {
            let alias = resource.namespace_alias();
            if alias.is_empty() {
                return None;
            }
            Some(Arc::new(Declaration::Module(ModuleDeclaration {
                name: alias,
                exported: true,
                target: key.clone(),
                location: resource.location.unwrap_or_default(),
            })))
        });

        Self {
            key,
            resource: Arc::new(resource),
            locals,
            nested,
            export_targets,
            star_aliases,
            import_targets,
            namespace_imports,
            declared_in,
            alias,
        }
    }

    fn export_target(&self, idx: usize) -> Option<&str> {
        self.export_targets.get(idx).and_then(Option::as_deref)
    }
}

/// Every module of one build, keyed by module key in input order.
#[derive(Debug, Default)]
pub struct ModuleTable {
    pub modules: IndexMap<String, ModuleEntry>,
}

impl ModuleTable {
    pub fn build(
        resources: Vec<Resource>,
        hoist_ambient_modules: bool,
        resolver: &dyn ModuleResolver,
    ) -> Self {
        let mut files: IndexMap<String, Resource> = IndexMap::new();
        let mut ambient: IndexMap<String, (Resource, String)> = IndexMap::new();

        for resource in resources {
            let key = resource.identifier();
            let is_typings = resource
                .file_path
                .as_deref()
                .is_some_and(is_declaration_file);

            if hoist_ambient_modules && is_typings {
                for module in resource.resources.iter().filter(|r| is_ambient_module(r)) {
                    let name = module.identifier();
                    match ambient.get_mut(&name) {
                        Some((existing, _)) => merge_augmentation(existing, module.clone()),
                        None => {
                            ambient.insert(name, (module.clone(), key.clone()));
                        }
                    }
                }
            }

            if files.insert(key.clone(), resource).is_some() {
                debug!(module = %key, "duplicate module key, keeping the later file");
            }
        }

        let ambient: Vec<_> = ambient
            .into_iter()
            .filter(|(name, _)| {
                let shadowed = files.contains_key(name);
                if shadowed {
                    debug!(module = %name, "ambient module shadowed by a file of the same key");
                }
                !shadowed
            })
            .collect();

        let known: HashSet<String> = files
            .keys()
            .chain(ambient.iter().map(|(name, _)| name))
            .cloned()
            .collect();
        let is_known = |key: &str| known.contains(key);

        let mut modules = IndexMap::new();
        for (key, resource) in files {
            let entry = ModuleEntry::new(key.clone(), resource, None, resolver, &is_known);
            modules.insert(key, entry);
        }
        for (name, (resource, declared_in)) in ambient {
            let entry = ModuleEntry::new(
                name.clone(),
                resource,
                Some(declared_in),
                resolver,
                &is_known,
            );
            modules.insert(name, entry);
        }

        Self { modules }
    }
}

fn is_ambient_module(resource: &Resource) -> bool {
    resource.kind == ResourceKind::Module && resource.ambient && resource.name.is_some()
}

/// Folds a later `declare module "x"` block into an earlier one. Assigned
/// targets are shifted to stay valid against the merged lists.
fn merge_augmentation(into: &mut Resource, mut from: Resource) {
    let declaration_offset = into.declarations.len();
    let resource_offset = into.resources.len();

    for export in &mut from.exports {
        if let Export::Assigned(assigned) = export {
            for target in &mut assigned.targets {
                *target = match *target {
                    AssignedTarget::Declaration(idx) => {
                        AssignedTarget::Declaration(idx + declaration_offset)
                    }
                    AssignedTarget::Resource(idx) => AssignedTarget::Resource(idx + resource_offset),
                };
            }
        }
    }

    into.declarations.append(&mut from.declarations);
    into.imports.append(&mut from.imports);
    into.exports.append(&mut from.exports);
    into.resources.append(&mut from.resources);
    into.usages.extend(from.usages);
}

/// Resolves export surfaces over a `ModuleTable`.
///
/// Modules are grouped into strongly connected components of the module
/// graph and resolved one component at a time, dependencies first. Members
/// of a cyclic component are recomputed together until none of them gains a
/// binding, so each sees the names of every other member. Every surface is
/// stored once, when its component is finished.
pub struct ExportResolver<'t> {
    table: &'t ModuleTable,
    done: HashMap<String, Arc<ExportSurface>>,
    empty: ExportSurface,
}

impl<'t> ExportResolver<'t> {
    pub fn new(table: &'t ModuleTable) -> Self {
        Self {
            table,
            done: HashMap::new(),
            empty: ExportSurface::default(),
        }
    }

    pub fn resolve_all(mut self) -> IndexMap<String, Arc<ExportSurface>> {
        let table = self.table;
        let graph = self.module_graph();

        // Components come out in postorder: a component's targets are done
        // before it is visited.
        for component in tarjan_scc(&graph) {
            let keys: Vec<&'t str> = component
                .iter()
                .filter_map(|node| table.modules.get_index(node.index()))
                .map(|(key, _)| key.as_str())
                .collect();

            let cyclic = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&node| graph.contains_edge(node, node));
            if cyclic {
                self.resolve_cycle(&keys);
            } else {
                for key in keys {
                    self.resolve_module(key);
                }
            }
        }

        table
            .modules
            .keys()
            .map(|key| {
                let surface = self.done.remove(key).unwrap_or_default();
                (key.clone(), surface)
            })
            .collect()
    }

    /// One node per module in table order, with an edge to every module
    /// named by its exports or imports.
    fn module_graph(&self) -> DiGraph<(), ()> {
        let modules = &self.table.modules;
        let mut graph = DiGraph::with_capacity(modules.len(), modules.len());
        for _ in 0..modules.len() {
            graph.add_node(());
        }

        for (from, entry) in modules.values().enumerate() {
            let targets = entry
                .export_targets
                .iter()
                .chain(&entry.import_targets)
                .flatten();
            for target in targets {
                if let Some(to) = modules.get_index_of(target.as_str()) {
                    graph.update_edge(NodeIndex::new(from), NodeIndex::new(to), ());
                }
            }
        }
        graph
    }

    fn resolve_module(&mut self, key: &str) {
        let table = self.table;
        let Some(entry) = table.modules.get(key) else {
            return;
        };
        let surface = self.compute(entry, &HashMap::new());
        self.done.insert(key.to_string(), Arc::new(surface));
    }

    fn resolve_cycle(&mut self, keys: &[&'t str]) {
        debug!(modules = ?keys, "resolving export cycle");
        let table = self.table;
        let mut pending: HashMap<String, ExportSurface> = keys
            .iter()
            .map(|key| (key.to_string(), ExportSurface::default()))
            .collect();

        // Bindings only accumulate, so the total is bounded and the loop
        // stops on the first round that adds nothing.
        let mut bound = 0;
        loop {
            for &key in keys {
                let Some(entry) = table.modules.get(key) else {
                    continue;
                };
                let surface = self.compute(entry, &pending);
                pending.insert(key.to_string(), surface);
            }

            let total: usize = pending.values().map(ExportSurface::binding_count).sum();
            if total <= bound {
                break;
            }
            bound = total;
        }

        for (key, surface) in pending {
            self.done.insert(key, Arc::new(surface));
        }
    }

    /// Surface of `key` as far as it is known: the in-flight cycle state
    /// first, then finished components.
    fn source<'s>(
        &'s self,
        key: &str,
        pending: &'s HashMap<String, ExportSurface>,
    ) -> &'s ExportSurface {
        pending
            .get(key)
            .or_else(|| self.done.get(key).map(Arc::as_ref))
            .unwrap_or(&self.empty)
    }

    fn compute(
        &self,
        entry: &ModuleEntry,
        pending: &HashMap<String, ExportSurface>,
    ) -> ExportSurface {
        let resource = entry.resource.as_ref();
        let mut surface = ExportSurface::default();

        let assigned = resource.exports.iter().find_map(|export| match export {
            Export::Assigned(assigned) => Some(assigned),
            _ => None,
        });
        if let Some(assigned) = assigned {
            let (_, resources) = resource.assigned_targets(&assigned.targets);
            let declarations = assigned
                .targets
                .iter()
                .filter_map(|target| match *target {
                    AssignedTarget::Declaration(idx) => entry.locals.get(idx).cloned(),
                    AssignedTarget::Resource(_) => None,
                })
                .collect();
            surface.assigned = Some(AssignedValue {
                name: assigned.name.clone(),
                declarations,
                resources: resources.into_iter().cloned().collect(),
            });

            if has_named_exports(resource) {
                warn!(
                    module = %entry.key,
                    "module mixes `export =` with named exports, keeping only the assigned value"
                );
                surface.conflict = true;
            }
            return surface;
        }

        for (declaration, shared) in resource.declarations.iter().zip(&entry.locals) {
            if declaration.is_default() {
                surface.bind(DEFAULT_NAME, Binding::new(shared, &entry.key));
            } else if declaration.is_exported() {
                if let Some(name) = declaration.name() {
                    surface.bind(name, Binding::new(shared, &entry.key));
                }
            }
        }

        for (child, shared) in resource.resources.iter().zip(&entry.nested) {
            if let (true, Some(name)) = (child.exported, child.name.as_deref()) {
                surface.bind(name, Binding::new(shared, &entry.key));
            }
        }

        for (idx, export) in resource.exports.iter().enumerate() {
            match export {
                Export::All(all) => {
                    let Some(target) = entry.export_target(idx) else {
                        continue;
                    };
                    if let Some(alias) = &all.alias {
                        if let Some(shared) = entry.star_aliases.get(&idx) {
                            surface.bind(alias, Binding::new(shared, &entry.key));
                        }
                        continue;
                    }

                    let source = self.source(target, pending);
                    for (name, bindings) in &source.named {
                        surface.bind_all(name, bindings.iter().cloned());
                    }
                }
                Export::Named(named) if named.from.is_some() => {
                    let Some(target) = entry.export_target(idx) else {
                        continue;
                    };
                    let source = self.source(target, pending);
                    for specifier in &named.specifiers {
                        surface.bind_all(specifier.local_name(), source.exported_as(&specifier.name));
                    }
                }
                Export::Named(named) => {
                    for specifier in &named.specifiers {
                        let found = self.local_bindings(entry, &specifier.name, pending);
                        surface.bind_all(specifier.local_name(), found);
                    }
                }
                Export::Assigned(_) => {}
            }
        }

        surface
    }

    /// What a local name refers to: own declarations and namespaces first,
    /// then whatever an import statement bound to it.
    fn local_bindings(
        &self,
        entry: &ModuleEntry,
        name: &str,
        pending: &HashMap<String, ExportSurface>,
    ) -> Vec<Binding> {
        let resource = entry.resource.as_ref();

        let own: Vec<Binding> = resource
            .declarations
            .iter()
            .zip(&entry.locals)
            .filter(|(declaration, _)| !declaration.is_default() && declaration.name() == Some(name))
            .map(|(_, shared)| Binding::new(shared, &entry.key))
            .chain(
                resource
                    .resources
                    .iter()
                    .zip(&entry.nested)
                    .filter(|(child, _)| child.name.as_deref() == Some(name))
                    .map(|(_, shared)| Binding::new(shared, &entry.key)),
            )
            .collect();
        if !own.is_empty() {
            return own;
        }

        for (idx, (import, target)) in resource.imports.iter().zip(&entry.import_targets).enumerate() {
            let Some(target) = target else {
                continue;
            };
            let imported = match import {
                Import::Named(named) if named.default_alias.as_deref() == Some(name) => {
                    Some(DEFAULT_NAME)
                }
                Import::Named(named) => named
                    .specifiers
                    .iter()
                    .find(|spec| spec.local_name() == name)
                    .map(|spec| spec.name.as_str()),
                Import::Default(default) if default.alias == name => Some(DEFAULT_NAME),
                Import::Namespace(ns) if ns.alias == name => return namespace_binding(entry, idx),
                Import::ExternalModule(ext) if ext.alias == name => {
                    return namespace_binding(entry, idx)
                }
                _ => None,
            };

            if let Some(imported) = imported {
                return self.source(target, pending).exported_as(imported);
            }
        }

        debug!(module = %entry.key, name, "export of unknown local name");
        Vec::new()
    }
}

fn namespace_binding(entry: &ModuleEntry, import_idx: usize) -> Vec<Binding> {
    entry
        .namespace_imports
        .get(&import_idx)
        .map(|shared| vec![Binding::new(shared, &entry.key)])
        .unwrap_or_default()
}

fn has_named_exports(resource: &Resource) -> bool {
    resource
        .exports
        .iter()
        .any(|export| !matches!(export, Export::Assigned(_)))
        || resource
            .declarations
            .iter()
            .any(|d| d.is_exported() && !d.is_default())
        || resource.resources.iter().any(|r| r.exported)
}
