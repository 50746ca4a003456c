use std::collections::HashMap;
use std::path::Path;

use tree_sitter::Node;

use crate::types::{
    AccessorDeclaration, AccessorKind, AllExport, AssignedExport, AssignedTarget,
    ClassDeclaration, ConstructorDeclaration, Declaration, DefaultDeclaration, DefaultImport,
    EnumDeclaration, Export, ExternalModuleImport, FunctionDeclaration, Import,
    InterfaceDeclaration, Location, MethodDeclaration, NamedExport, NamedImport, NamespaceImport,
    ParameterDeclaration, PropertyDeclaration, Resource, ResourceKind, StringImport,
    SymbolSpecifier, TypeAliasDeclaration, VariableDeclaration, VariableScope,
};

use super::classify::{
    field_annotation, field_text, first_named_child_of_kind, has_token, is_scope_boundary,
    location, modifiers, named_children_of_kind, text, type_parameters, unquote, visibility,
};

/// Name given to the inner declaration of `export default class {}`.
const ANONYMOUS_DEFAULT: &str = "default";

/// Builds the `Resource` tree of one file in a single walk over its
/// statement containers.
pub struct Extractor<'a> {
    src: &'a str,
    /// Syntax node id of each nested resource, mapped to its index path.
    owners: HashMap<usize, Vec<usize>>,
}

impl<'a> Extractor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            owners: HashMap::new(),
        }
    }

    pub fn extract(
        mut self,
        root: Node,
        file_path: &Path,
        root_path: &Path,
    ) -> (Resource, HashMap<usize, Vec<usize>>) {
        let mut resource = Resource::file(file_path.to_path_buf(), root_path.to_path_buf());
        self.collect(root, &mut resource, &[], false);
        (resource, self.owners)
    }

    fn text(&self, node: Node) -> &'a str {
        text(node, self.src)
    }

    /// Walks the statements of a program or namespace body into `resource`.
    fn collect(
        &mut self,
        container: Node,
        resource: &mut Resource,
        path: &[usize],
        implicit_export: bool,
    ) {
        let mut cursor = container.walk();
        let statements: Vec<Node> = container.named_children(&mut cursor).collect();

        for statement in statements {
            match statement.kind() {
                "import_statement" => resource.imports.extend(self.imports(statement)),
                "export_statement" => self.export_statement(statement, resource, path),
                "expression_statement" => {
                    if let Some(inner) = first_named_child_of_kind(statement, "internal_module") {
                        self.nested(inner, resource, path, implicit_export, false);
                    }
                }
                "internal_module" | "module" => {
                    self.nested(statement, resource, path, implicit_export, false);
                }
                "ambient_declaration" => {
                    self.ambient(statement, resource, path, implicit_export);
                }
                _ => {
                    for declaration in self.declarations(statement, implicit_export, None) {
                        push_declaration(resource, declaration);
                    }
                }
            }
        }

        mark_local_exports(resource);
        attach_assigned_targets(resource);
    }

    fn nested(
        &mut self,
        node: Node,
        parent: &mut Resource,
        path: &[usize],
        exported: bool,
        ambient: bool,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let string_named = name_node.kind() == "string";
        let kind = if node.kind() == "internal_module" {
            ResourceKind::Namespace
        } else {
            ResourceKind::Module
        };

        let mut nested = Resource::nested(
            kind,
            unquote(self.text(name_node)).to_string(),
            location(node),
        );
        nested.exported = exported;
        nested.ambient = ambient;

        let mut nested_path = path.to_vec();
        nested_path.push(parent.resources.len());
        self.owners.insert(node.id(), nested_path.clone());

        if let Some(body) = node.child_by_field_name("body") {
            // Members of `declare module "x"` are exported without a marker.
            self.collect(body, &mut nested, &nested_path, string_named);
        }
        parent.resources.push(nested);
    }

    /// `declare ...`
    fn ambient(&mut self, node: Node, resource: &mut Resource, path: &[usize], exported: bool) {
        if has_token(node, "global") {
            if let Some(body) = first_named_child_of_kind(node, "statement_block") {
                let mut global = Resource::nested(
                    ResourceKind::Namespace,
                    "global".to_string(),
                    location(node),
                );
                global.ambient = true;

                let mut nested_path = path.to_vec();
                nested_path.push(resource.resources.len());
                self.owners.insert(node.id(), nested_path.clone());
                self.collect(body, &mut global, &nested_path, true);
                resource.resources.push(global);
            }
            return;
        }

        let Some(inner) = node.named_child(0) else {
            return;
        };
        match inner.kind() {
            "internal_module" | "module" => self.nested(inner, resource, path, exported, true),
            _ => {
                for declaration in self.declarations(inner, exported, None) {
                    push_declaration(resource, declaration);
                }
            }
        }
    }

    fn imports(&self, node: Node) -> Vec<Import> {
        let loc = location(node);

        if let Some(clause) = first_named_child_of_kind(node, "import_require_clause") {
            let alias = first_named_child_of_kind(clause, "identifier").map(|n| self.text(n));
            let source = field_text(clause, "source", self.src);
            return match (alias, source) {
                (Some(alias), Some(library_name)) => {
                    vec![Import::ExternalModule(ExternalModuleImport {
                        library_name,
                        alias: alias.to_string(),
                        location: loc,
                    })]
                }
                _ => Vec::new(),
            };
        }

        let Some(library_name) = field_text(node, "source", self.src) else {
            return Vec::new();
        };
        let Some(clause) = first_named_child_of_kind(node, "import_clause") else {
            return vec![Import::String(StringImport {
                library_name,
                location: loc,
            })];
        };

        let is_type_only = has_token(node, "type");
        let default_alias = first_named_child_of_kind(clause, "identifier")
            .map(|n| self.text(n).to_string());
        let namespace = first_named_child_of_kind(clause, "namespace_import")
            .and_then(|ns| first_named_child_of_kind(ns, "identifier"))
            .map(|n| self.text(n).to_string());
        let named = first_named_child_of_kind(clause, "named_imports");

        let mut imports = Vec::new();
        match (namespace, named) {
            (Some(alias), _) => {
                if let Some(alias) = default_alias {
                    imports.push(Import::Default(DefaultImport {
                        library_name: library_name.clone(),
                        alias,
                        location: loc,
                    }));
                }
                imports.push(Import::Namespace(NamespaceImport {
                    library_name,
                    alias,
                    is_type_only,
                    location: loc,
                }));
            }
            (None, Some(named)) => imports.push(Import::Named(NamedImport {
                library_name,
                specifiers: self.specifiers(named, "import_specifier"),
                default_alias,
                is_type_only,
                location: loc,
            })),
            (None, None) => {
                if let Some(alias) = default_alias {
                    imports.push(Import::Default(DefaultImport {
                        library_name,
                        alias,
                        location: loc,
                    }));
                }
            }
        }
        imports
    }

    fn specifiers(&self, list: Node, kind: &str) -> Vec<SymbolSpecifier> {
        named_children_of_kind(list, &[kind])
            .into_iter()
            .filter_map(|spec| {
                let name = field_text(spec, "name", self.src)?;
                let alias = field_text(spec, "alias", self.src);
                Some(SymbolSpecifier::new(name, alias))
            })
            .collect()
    }

    fn export_statement(&mut self, node: Node, resource: &mut Resource, path: &[usize]) {
        let loc = location(node);
        let is_default = has_token(node, "default");

        if let Some(decl) = node.child_by_field_name("declaration") {
            if is_default {
                let inner = self.declarations(decl, false, None).into_iter().next();
                push_declaration(resource, default_declaration(inner, None, loc));
                return;
            }
            match decl.kind() {
                "ambient_declaration" => self.ambient(decl, resource, path, true),
                "internal_module" | "module" => self.nested(decl, resource, path, true, false),
                _ => {
                    for declaration in self.declarations(decl, true, None) {
                        push_declaration(resource, declaration);
                    }
                }
            }
            return;
        }

        if let Some(value) = node.child_by_field_name("value") {
            let declaration = match value.kind() {
                "identifier" => default_declaration(None, Some(self.text(value).to_string()), loc),
                _ => {
                    let inner = self.declarations(value, false, None).into_iter().next();
                    default_declaration(inner, None, loc)
                }
            };
            push_declaration(resource, declaration);
            return;
        }

        if has_token(node, "=") {
            let target = {
                let mut cursor = node.walk();
                let found = node
                    .named_children(&mut cursor)
                    .filter(|child| child.kind() != "comment")
                    .last();
                found
            };
            if let Some(target) = target {
                resource.exports.push(Export::Assigned(AssignedExport {
                    name: self.text(target).to_string(),
                    targets: Vec::new(),
                    location: loc,
                }));
            }
            return;
        }

        // `export as namespace X` only names the UMD global.
        if has_token(node, "namespace") && !has_token(node, "*") {
            return;
        }

        let from = field_text(node, "source", self.src);

        if let Some(clause) = first_named_child_of_kind(node, "export_clause") {
            resource.exports.push(Export::Named(NamedExport {
                from,
                specifiers: self.specifiers(clause, "export_specifier"),
                is_type_only: has_token(node, "type"),
                location: loc,
            }));
            return;
        }

        let Some(from) = from else {
            return;
        };
        let alias = first_named_child_of_kind(node, "namespace_export")
            .and_then(|ns| ns.named_child(0))
            .map(|n| unquote(self.text(n)).to_string());
        if alias.is_some() || has_token(node, "*") {
            resource.exports.push(Export::All(AllExport {
                from,
                alias,
                location: loc,
            }));
        }
    }

    /// Declarations introduced by one statement. `scope` is `None` at
    /// resource level.
    fn declarations(
        &self,
        node: Node,
        exported: bool,
        scope: Option<VariableScope>,
    ) -> Vec<Declaration> {
        match node.kind() {
            "class_declaration" | "abstract_class_declaration" | "class" => {
                vec![Declaration::Class(self.class(node, exported))]
            }
            "interface_declaration" => vec![Declaration::Interface(self.interface(node, exported))],
            "enum_declaration" => vec![Declaration::Enum(EnumDeclaration {
                name: self.name_or_default(node),
                exported,
                is_const: has_token(node, "const"),
                members: self.enum_members(node),
                location: location(node),
            })],
            "type_alias_declaration" => vec![Declaration::TypeAlias(TypeAliasDeclaration {
                name: self.name_or_default(node),
                exported,
                type_parameters: type_parameters(node, self.src),
                type_text: node
                    .child_by_field_name("value")
                    .map(|v| self.text(v).to_string()),
                location: location(node),
            })],
            "function_declaration"
            | "generator_function_declaration"
            | "function_signature"
            | "function_expression"
            | "function"
            | "generator_function" => vec![Declaration::Function(self.function(node, exported))],
            "lexical_declaration" | "variable_declaration" => self
                .variables(node, exported, scope.unwrap_or(VariableScope::Module))
                .into_iter()
                .map(Declaration::Variable)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn name_or_default(&self, node: Node) -> String {
        field_text(node, "name", self.src).unwrap_or_else(|| ANONYMOUS_DEFAULT.to_string())
    }

    fn enum_members(&self, node: Node) -> Vec<String> {
        let Some(body) = node.child_by_field_name("body") else {
            return Vec::new();
        };
        let mut cursor = body.walk();
        let members = body
            .named_children(&mut cursor)
            .filter(|member| member.kind() != "comment")
            .filter_map(|member| match member.kind() {
                "enum_assignment" => field_text(member, "name", self.src),
                _ => Some(unquote(self.text(member)).to_string()),
            })
            .collect();
        members
    }

    fn function(&self, node: Node, exported: bool) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.name_or_default(node),
            exported,
            is_async: has_token(node, "async"),
            type_parameters: type_parameters(node, self.src),
            parameters: self.parameters(node),
            variables: self.body_variables(node),
            return_type: field_annotation(node, "return_type", self.src),
            location: location(node),
        }
    }

    fn parameter_nodes<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        node.child_by_field_name("parameters")
            .map(|params| {
                named_children_of_kind(params, &["required_parameter", "optional_parameter"])
            })
            .unwrap_or_default()
    }

    fn parameters(&self, node: Node) -> Vec<ParameterDeclaration> {
        self.parameter_nodes(node)
            .into_iter()
            .map(|param| self.parameter(param))
            .collect()
    }

    fn parameter(&self, node: Node) -> ParameterDeclaration {
        let pattern = node.child_by_field_name("pattern");
        let is_rest = pattern.is_some_and(|p| p.kind() == "rest_pattern");
        let name = match pattern {
            Some(p) if is_rest => p.named_child(0).map(|n| self.text(n)).unwrap_or_default(),
            Some(p) => self.text(p),
            None => "",
        };

        ParameterDeclaration {
            name: name.to_string(),
            type_annotation: field_annotation(node, "type", self.src),
            has_default: node.child_by_field_name("value").is_some(),
            is_optional: node.kind() == "optional_parameter",
            is_rest,
            location: location(node),
        }
    }

    /// Local variables of a function-like body, without descending into
    /// nested functions or classes.
    fn body_variables(&self, node: Node) -> Vec<VariableDeclaration> {
        let mut variables = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.collect_body_variables(body, &mut variables);
        }
        variables
    }

    fn collect_body_variables(&self, node: Node, out: &mut Vec<VariableDeclaration>) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();

        for child in children {
            match child.kind() {
                "variable_declaration" => {
                    out.extend(self.variables(child, false, VariableScope::Function));
                }
                "lexical_declaration" => {
                    out.extend(self.variables(child, false, VariableScope::Block));
                }
                kind if is_scope_boundary(kind) => {}
                _ => self.collect_body_variables(child, out),
            }
        }
    }

    fn variables(
        &self,
        node: Node,
        exported: bool,
        scope: VariableScope,
    ) -> Vec<VariableDeclaration> {
        let is_const = node
            .child_by_field_name("kind")
            .is_some_and(|k| self.text(k) == "const");

        let mut variables = Vec::new();
        for declarator in named_children_of_kind(node, &["variable_declarator"]) {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };

            let mut names = Vec::new();
            self.bound_names(name, &mut names);
            let type_annotation = if name.kind() == "identifier" {
                field_annotation(declarator, "type", self.src)
            } else {
                None
            };

            for bound in names {
                variables.push(VariableDeclaration {
                    name: bound.to_string(),
                    exported,
                    is_const,
                    scope,
                    type_annotation: type_annotation.clone(),
                    location: location(declarator),
                });
            }
        }
        variables
    }

    /// Identifiers bound by a declarator name or destructuring pattern.
    fn bound_names(&self, pattern: Node, out: &mut Vec<&'a str>) {
        match pattern.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => out.push(self.text(pattern)),
            "pair_pattern" => {
                if let Some(value) = pattern.child_by_field_name("value") {
                    self.bound_names(value, out);
                }
            }
            "object_assignment_pattern" | "assignment_pattern" => {
                if let Some(left) = pattern.child_by_field_name("left") {
                    self.bound_names(left, out);
                }
            }
            "rest_pattern" => {
                if let Some(inner) = pattern.named_child(0) {
                    self.bound_names(inner, out);
                }
            }
            "object_pattern" | "array_pattern" => {
                let mut cursor = pattern.walk();
                let children: Vec<Node> = pattern.named_children(&mut cursor).collect();
                for child in children {
                    self.bound_names(child, out);
                }
            }
            _ => {}
        }
    }

    fn class(&self, node: Node, exported: bool) -> ClassDeclaration {
        let mut class = ClassDeclaration {
            name: self.name_or_default(node),
            exported,
            is_abstract: node.kind() == "abstract_class_declaration",
            type_parameters: type_parameters(node, self.src),
            constructor: None,
            methods: Vec::new(),
            properties: Vec::new(),
            accessors: Vec::new(),
            location: location(node),
        };

        let Some(body) = node.child_by_field_name("body") else {
            return class;
        };
        let mut cursor = body.walk();
        let members: Vec<Node> = body.named_children(&mut cursor).collect();

        for member in members {
            match member.kind() {
                "method_definition" | "method_signature" | "abstract_method_signature" => {
                    let name = field_text(member, "name", self.src).unwrap_or_default();
                    if name == "constructor" {
                        if class.constructor.is_none() || member.kind() == "method_definition" {
                            class.properties.extend(self.promoted_properties(member));
                            class.constructor = Some(ConstructorDeclaration {
                                parameters: self.parameters(member),
                                variables: self.body_variables(member),
                                location: location(member),
                            });
                        }
                        continue;
                    }

                    let mods = modifiers(member);
                    if mods.contains(&"get") || mods.contains(&"set") {
                        class.accessors.push(self.accessor(member, &mods));
                    } else if !class.methods.iter().any(|m| m.name == name) {
                        class.methods.push(self.method(member, &mods));
                    }
                }
                "public_field_definition" => class.properties.push(self.property(member)),
                _ => {}
            }
        }
        class
    }

    /// Constructor parameters declared `public x`, `private readonly y`, ...
    fn promoted_properties(&self, ctor: Node) -> Vec<PropertyDeclaration> {
        self.parameter_nodes(ctor)
            .into_iter()
            .filter(|param| {
                first_named_child_of_kind(*param, "accessibility_modifier").is_some()
                    || has_token(*param, "readonly")
            })
            .filter_map(|param| {
                let pattern = param.child_by_field_name("pattern")?;
                Some(PropertyDeclaration {
                    name: self.text(pattern).to_string(),
                    visibility: visibility(param, self.src),
                    type_annotation: field_annotation(param, "type", self.src),
                    is_static: false,
                    is_optional: param.kind() == "optional_parameter",
                    is_readonly: has_token(param, "readonly"),
                    location: location(param),
                })
            })
            .collect()
    }

    fn method(&self, node: Node, mods: &[&str]) -> MethodDeclaration {
        MethodDeclaration {
            name: field_text(node, "name", self.src).unwrap_or_default(),
            visibility: visibility(node, self.src),
            parameters: self.parameters(node),
            return_type: field_annotation(node, "return_type", self.src),
            is_abstract: node.kind() == "abstract_method_signature" || mods.contains(&"abstract"),
            is_static: mods.contains(&"static"),
            is_async: mods.contains(&"async"),
            is_optional: has_token(node, "?"),
            variables: self.body_variables(node),
            location: location(node),
        }
    }

    fn accessor(&self, node: Node, mods: &[&str]) -> AccessorDeclaration {
        let kind = if mods.contains(&"get") {
            AccessorKind::Get
        } else {
            AccessorKind::Set
        };
        let type_annotation = match kind {
            AccessorKind::Get => field_annotation(node, "return_type", self.src),
            AccessorKind::Set => self
                .parameter_nodes(node)
                .first()
                .and_then(|param| field_annotation(*param, "type", self.src)),
        };

        AccessorDeclaration {
            name: field_text(node, "name", self.src).unwrap_or_default(),
            kind,
            visibility: visibility(node, self.src),
            type_annotation,
            is_static: mods.contains(&"static"),
            is_abstract: node.kind() == "abstract_method_signature" || mods.contains(&"abstract"),
            location: location(node),
        }
    }

    fn property(&self, node: Node) -> PropertyDeclaration {
        let mods = modifiers(node);
        PropertyDeclaration {
            name: field_text(node, "name", self.src).unwrap_or_default(),
            visibility: visibility(node, self.src),
            type_annotation: field_annotation(node, "type", self.src),
            is_static: mods.contains(&"static"),
            is_optional: has_token(node, "?"),
            is_readonly: mods.contains(&"readonly"),
            location: location(node),
        }
    }

    fn interface(&self, node: Node, exported: bool) -> InterfaceDeclaration {
        let mut interface = InterfaceDeclaration {
            name: self.name_or_default(node),
            exported,
            type_parameters: type_parameters(node, self.src),
            methods: Vec::new(),
            properties: Vec::new(),
            location: location(node),
        };

        let Some(body) = node.child_by_field_name("body") else {
            return interface;
        };
        for member in named_children_of_kind(body, &["property_signature", "method_signature"]) {
            if member.kind() == "property_signature" {
                interface.properties.push(self.property(member));
                continue;
            }
            let name = field_text(member, "name", self.src).unwrap_or_default();
            if !interface.methods.iter().any(|m| m.name == name) {
                let mods = modifiers(member);
                interface.methods.push(self.method(member, &mods));
            }
        }
        interface
    }
}

fn default_declaration(
    inner: Option<Declaration>,
    name: Option<String>,
    loc: Location,
) -> Declaration {
    let name = name.or_else(|| {
        inner
            .as_ref()
            .and_then(|d| d.name())
            .filter(|n| *n != ANONYMOUS_DEFAULT)
            .map(str::to_string)
    });
    Declaration::Default(DefaultDeclaration {
        name,
        declaration: inner.map(Box::new),
        location: loc,
    })
}

/// Function overloads share a name; the first signature stands for all.
fn push_declaration(resource: &mut Resource, declaration: Declaration) {
    if let Declaration::Function(function) = &declaration {
        let overloaded = resource.declarations.iter().any(|existing| {
            matches!(existing, Declaration::Function(f) if f.name == function.name)
        });
        if overloaded {
            return;
        }
    }
    resource.declarations.push(declaration);
}

/// `export { a, b }` without `from` exports the local declarations.
fn mark_local_exports(resource: &mut Resource) {
    let names: Vec<String> = resource
        .exports
        .iter()
        .filter_map(|export| match export {
            Export::Named(named) if named.from.is_none() => Some(named),
            _ => None,
        })
        .flat_map(|named| named.specifiers.iter())
        .filter(|spec| spec.alias.is_none())
        .map(|spec| spec.name.clone())
        .collect();

    if names.is_empty() {
        return;
    }

    for declaration in &mut resource.declarations {
        if declaration
            .name()
            .is_some_and(|name| names.iter().any(|n| n == name))
            && !declaration.is_default()
        {
            declaration.set_exported(true);
        }
    }
    for nested in &mut resource.resources {
        if nested
            .name
            .as_deref()
            .is_some_and(|name| names.iter().any(|n| n == name))
        {
            nested.exported = true;
        }
    }
}

fn attach_assigned_targets(resource: &mut Resource) {
    let Resource {
        declarations,
        resources,
        exports,
        ..
    } = resource;

    for export in exports.iter_mut() {
        let Export::Assigned(assigned) = export else {
            continue;
        };
        let name = assigned.name.as_str();

        assigned.targets = declarations
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.is_default() && d.name() == Some(name))
            .map(|(idx, _)| AssignedTarget::Declaration(idx))
            .chain(
                resources
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.name.as_deref() == Some(name))
                    .map(|(idx, _)| AssignedTarget::Resource(idx)),
            )
            .collect();
    }
}
