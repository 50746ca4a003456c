use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A throwaway project directory that source files can be written into.
pub struct Workspace {
    pub _temp_dir: TempDir, // Kept so the directory lives as long as the workspace
    root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        init_tracing();

        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `content` at `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture dir");
        }
        std::fs::write(&path, content).expect("Failed to write fixture");
        path
    }
}

/// Routes `tracing` output through the test harness. `RUST_LOG` selects
/// the level; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
