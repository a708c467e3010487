use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Builder for throwaway directory trees.
///
/// Paths are relative to the temporary root; parent directories are
/// created as needed.
pub struct TreeBuilder {
    dir: TempDir,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn dir(self, rel: &str) -> Self {
        fs::create_dir_all(self.dir.path().join(rel)).expect("failed to create dir");
        self
    }

    pub fn file(self, rel: &str, contents: &str) -> Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, contents).expect("failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Keep the tree alive for as long as the returned guard lives.
    pub fn build(self) -> TempDir {
        self.dir
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
