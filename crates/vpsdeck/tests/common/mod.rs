use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Throwaway directory holding a settings file
pub struct TestConfig {
    pub root: TempDir,
}

impl TestConfig {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    /// Write `vpsdeck.yaml` and return its path
    pub fn write(&self, content: &str) -> PathBuf {
        let path = self.root.path().join("vpsdeck.yaml");
        fs::write(&path, content).unwrap();
        path
    }

    #[allow(dead_code)]
    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
