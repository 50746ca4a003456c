use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Fail with a `ParseError` when the syntax tree contains error nodes.
    pub reject_syntax_errors: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            reject_syntax_errors: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory module keys are computed against.
    pub root_path: PathBuf,
    /// Upper bound on files read concurrently during ingest.
    pub max_concurrent_reads: usize,
    /// Register string-named ambient modules from declaration files under
    /// their own module name.
    pub hoist_ambient_modules: bool,
    pub parser: ParserConfig,
}

impl IndexConfig {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ..Self::default()
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            max_concurrent_reads: 32,
            hoist_ambient_modules: true,
            parser: ParserConfig::default(),
        }
    }
}
