//! Seams between the index and the outside world: where file text comes
//! from and how it becomes a `Resource`.

use std::path::Path;

use async_trait::async_trait;

use crate::types::{IndexError, Resource, Result};

/// Reads source text for a path.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn read_text(&self, path: &Path) -> Result<String>;
}

/// Reads from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSourceReader;

#[async_trait]
impl SourceReader for FsSourceReader {
    async fn read_text(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IndexError::io(path, e))
    }
}

/// Turns the text of one file into its `Resource` tree. Must be pure: the
/// index calls it from the blocking pool, many files at a time.
pub trait ResourceParser: Send + Sync {
    fn parse_source(&self, text: &str, file_path: &Path, root_path: &Path) -> Result<Resource>;
}
