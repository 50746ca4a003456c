pub mod declaration;
pub mod error;
pub mod export;
pub mod import;
pub mod resource;

pub use declaration::{
    AccessorDeclaration, AccessorKind, ClassDeclaration, ConstructorDeclaration, Declaration,
    DeclarationKind, DefaultDeclaration, EnumDeclaration, FunctionDeclaration,
    InterfaceDeclaration, Location, MethodDeclaration, ModuleDeclaration, ParameterDeclaration,
    PropertyDeclaration, TypeAliasDeclaration, VariableDeclaration, VariableScope, Visibility,
};
pub use error::{IndexError, ParseError, Result};
pub use export::{AllExport, AssignedExport, AssignedTarget, Export, NamedExport};
pub use import::{
    DefaultImport, ExternalModuleImport, Import, NamedImport, NamespaceImport, StringImport,
    SymbolSpecifier,
};
pub use resource::{Resource, ResourceKind};
