pub mod config;
pub mod index;
pub mod parser;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use config::{IndexConfig, ParserConfig};
pub use index::module_key::{module_key, ModuleResolver, RelativeModuleResolver};
pub use index::snapshot::{AssignedValue, DeclarationInfo, IndexSnapshot};
pub use index::source::{FsSourceReader, ResourceParser, SourceReader};
pub use index::DeclarationIndex;
pub use parser::TypescriptParser;
pub use types::error::{IndexError, ParseError, Result};
pub use types::{Declaration, DeclarationKind, Export, Import, Resource, ResourceKind};
