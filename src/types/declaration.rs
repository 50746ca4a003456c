use serde::{Deserialize, Serialize};

/// Byte span of a construct in its source file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Location {
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Protected,
    #[default]
    Public,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Private => write!(f, "private"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Public => write!(f, "public"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VariableScope {
    Module,
    Function,
    Block,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccessorKind {
    Get,
    Set,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Class,
    Interface,
    Enum,
    Function,
    Variable,
    TypeAlias,
    Default,
    Module,
}

impl std::fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeclarationKind::Class => write!(f, "class"),
            DeclarationKind::Interface => write!(f, "interface"),
            DeclarationKind::Enum => write!(f, "enum"),
            DeclarationKind::Function => write!(f, "function"),
            DeclarationKind::Variable => write!(f, "variable"),
            DeclarationKind::TypeAlias => write!(f, "type_alias"),
            DeclarationKind::Default => write!(f, "default"),
            DeclarationKind::Module => write!(f, "module"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterDeclaration {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    pub has_default: bool,
    pub is_optional: bool,
    pub is_rest: bool,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariableDeclaration {
    pub name: String,
    pub exported: bool,
    pub is_const: bool,
    pub scope: VariableScope,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyDeclaration {
    pub name: String,
    pub visibility: Visibility,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    pub is_static: bool,
    pub is_optional: bool,
    pub is_readonly: bool,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodDeclaration {
    pub name: String,
    pub visibility: Visibility,
    pub parameters: Vec<ParameterDeclaration>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub is_abstract: bool,
    pub is_static: bool,
    pub is_async: bool,
    pub is_optional: bool,
    pub variables: Vec<VariableDeclaration>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessorDeclaration {
    pub name: String,
    pub kind: AccessorKind,
    pub visibility: Visibility,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConstructorDeclaration {
    pub parameters: Vec<ParameterDeclaration>,
    pub variables: Vec<VariableDeclaration>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassDeclaration {
    pub name: String,
    pub exported: bool,
    pub is_abstract: bool,
    pub type_parameters: Vec<String>,
    #[serde(rename = "ctor", skip_serializing_if = "Option::is_none")]
    pub constructor: Option<ConstructorDeclaration>,
    pub methods: Vec<MethodDeclaration>,
    pub properties: Vec<PropertyDeclaration>,
    pub accessors: Vec<AccessorDeclaration>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterfaceDeclaration {
    pub name: String,
    pub exported: bool,
    pub type_parameters: Vec<String>,
    pub methods: Vec<MethodDeclaration>,
    pub properties: Vec<PropertyDeclaration>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnumDeclaration {
    pub name: String,
    pub exported: bool,
    pub is_const: bool,
    pub members: Vec<String>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub exported: bool,
    pub is_async: bool,
    pub type_parameters: Vec<String>,
    pub parameters: Vec<ParameterDeclaration>,
    pub variables: Vec<VariableDeclaration>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeAliasDeclaration {
    pub name: String,
    pub exported: bool,
    pub type_parameters: Vec<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_text: Option<String>,
    pub location: Location,
}

/// The default export of a module. Wraps the inner declaration when the
/// default export is itself a class or function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefaultDeclaration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<Box<Declaration>>,
    pub location: Location,
}

/// A namespace-like binding: `export * as ns`, an exported namespace, or an
/// ambient module importable under an alias.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleDeclaration {
    pub name: String,
    pub exported: bool,
    pub target: String,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Class(ClassDeclaration),
    Interface(InterfaceDeclaration),
    Enum(EnumDeclaration),
    Function(FunctionDeclaration),
    Variable(VariableDeclaration),
    TypeAlias(TypeAliasDeclaration),
    Default(DefaultDeclaration),
    Module(ModuleDeclaration),
}

impl Declaration {
    pub fn kind(&self) -> DeclarationKind {
        match self {
            Declaration::Class(_) => DeclarationKind::Class,
            Declaration::Interface(_) => DeclarationKind::Interface,
            Declaration::Enum(_) => DeclarationKind::Enum,
            Declaration::Function(_) => DeclarationKind::Function,
            Declaration::Variable(_) => DeclarationKind::Variable,
            Declaration::TypeAlias(_) => DeclarationKind::TypeAlias,
            Declaration::Default(_) => DeclarationKind::Default,
            Declaration::Module(_) => DeclarationKind::Module,
        }
    }

    /// `None` only for an anonymous default export.
    pub fn name(&self) -> Option<&str> {
        match self {
            Declaration::Class(d) => Some(&d.name),
            Declaration::Interface(d) => Some(&d.name),
            Declaration::Enum(d) => Some(&d.name),
            Declaration::Function(d) => Some(&d.name),
            Declaration::Variable(d) => Some(&d.name),
            Declaration::TypeAlias(d) => Some(&d.name),
            Declaration::Default(d) => d.name.as_deref(),
            Declaration::Module(d) => Some(&d.name),
        }
    }

    pub fn is_exported(&self) -> bool {
        match self {
            Declaration::Class(d) => d.exported,
            Declaration::Interface(d) => d.exported,
            Declaration::Enum(d) => d.exported,
            Declaration::Function(d) => d.exported,
            Declaration::Variable(d) => d.exported,
            Declaration::TypeAlias(d) => d.exported,
            Declaration::Default(_) => true,
            Declaration::Module(d) => d.exported,
        }
    }

    pub fn set_exported(&mut self, exported: bool) {
        match self {
            Declaration::Class(d) => d.exported = exported,
            Declaration::Interface(d) => d.exported = exported,
            Declaration::Enum(d) => d.exported = exported,
            Declaration::Function(d) => d.exported = exported,
            Declaration::Variable(d) => d.exported = exported,
            Declaration::TypeAlias(d) => d.exported = exported,
            Declaration::Default(_) => {}
            Declaration::Module(d) => d.exported = exported,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Declaration::Class(d) => d.location,
            Declaration::Interface(d) => d.location,
            Declaration::Enum(d) => d.location,
            Declaration::Function(d) => d.location,
            Declaration::Variable(d) => d.location,
            Declaration::TypeAlias(d) => d.location,
            Declaration::Default(d) => d.location,
            Declaration::Module(d) => d.location,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Declaration::Default(_))
    }
}
