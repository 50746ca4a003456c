pub mod classify;
pub mod extractor;
pub mod syntax;
pub mod usages;

use std::path::Path;
use std::sync::Arc;

use crate::config::ParserConfig;
use crate::index::source::{FsSourceReader, ResourceParser, SourceReader};
use crate::types::{Resource, Result};

use extractor::Extractor;
use syntax::{first_syntax_error, parse_tree, Dialect};

/// Parses TypeScript and TSX files into `Resource` trees.
pub struct TypescriptParser {
    config: ParserConfig,
    reader: Arc<dyn SourceReader>,
}

impl TypescriptParser {
    pub fn new(config: ParserConfig) -> Self {
        Self::with_reader(config, Arc::new(FsSourceReader))
    }

    pub fn with_reader(config: ParserConfig, reader: Arc<dyn SourceReader>) -> Self {
        Self { config, reader }
    }

    pub fn parse_source(&self, text: &str, file_path: &Path, root_path: &Path) -> Result<Resource> {
        let dialect = Dialect::for_path(file_path);
        let tree = parse_tree(text, dialect)?;

        if self.config.reject_syntax_errors {
            let file = file_path.display().to_string();
            if let Some(err) = first_syntax_error(&tree, text, &file) {
                return Err(err.into());
            }
        }

        let (mut resource, owners) =
            Extractor::new(text).extract(tree.root_node(), file_path, root_path);
        usages::collect_usages(&tree, text, dialect, &owners, &mut resource)?;

        Ok(resource)
    }

    pub async fn parse_file(&self, file_path: &Path, root_path: &Path) -> Result<Resource> {
        let text = self.reader.read_text(file_path).await?;
        self.parse_source(&text, file_path, root_path)
    }
}

impl Default for TypescriptParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl ResourceParser for TypescriptParser {
    fn parse_source(&self, text: &str, file_path: &Path, root_path: &Path) -> Result<Resource> {
        TypescriptParser::parse_source(self, text, file_path, root_path)
    }
}
