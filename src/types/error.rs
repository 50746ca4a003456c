use std::path::PathBuf;

use thiserror::Error;

/// A syntax diagnostic for one file, as reported by the syntax provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{file}:{line}:{column}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl ParseError {
    pub fn new(file: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<tokio::task::JoinError> for IndexError {
    fn from(e: tokio::task::JoinError) -> Self {
        IndexError::Internal(e.to_string())
    }
}

impl From<tree_sitter::LanguageError> for IndexError {
    fn from(e: tree_sitter::LanguageError) -> Self {
        IndexError::Internal(format!("grammar load failed: {e}"))
    }
}
