//! On-disk fixtures for workflow tests.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::{Layout, UpdateConfig};

/// A temporary application directory with the default layout.
///
/// # Example
///
/// ```rust,no_run
/// use apup::test_utils::LiveTree;
///
/// let tree = LiveTree::new().unwrap();
/// tree.write("dados/database/db.json", r#"{"v":1}"#).unwrap();
/// assert_eq!(tree.read("dados/database/db.json").unwrap(), r#"{"v":1}"#);
/// ```
pub struct LiveTree {
    temp: TempDir,
    /// Configuration used to resolve [`LiveTree::layout`].
    pub config: UpdateConfig,
}

impl LiveTree {
    /// Creates an empty application directory.
    pub fn new() -> Result<Self> {
        let mut config = UpdateConfig::default();
        config.workflow.countdown_secs = 0;
        Ok(Self {
            temp: TempDir::new()?,
            config,
        })
    }

    /// Creates an application directory populated like a running install:
    /// application files, tool artifacts and user data.
    pub fn installed() -> Result<Self> {
        let tree = Self::new()?;
        tree.write("index.js", "console.log('v1')")?;
        tree.write("package.json", r#"{"name":"app","version":"1.0.0"}"#)?;
        tree.write("package-lock.json", "{}")?;
        tree.write("README.md", "old readme")?;
        tree.write(".git/HEAD", "ref: refs/heads/main")?;
        tree.write("node_modules/dep/index.js", "module.exports = 1")?;
        tree.write("dados/database/db.json", r#"{"v":1}"#)?;
        tree.write("dados/src/config.json", r#"{"prefixo":"!"}"#)?;
        tree.write("dados/midias/logo.png", "png-bytes")?;
        Ok(tree)
    }

    /// Application directory.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Absolute path of `relative`.
    pub fn join(&self, relative: &str) -> PathBuf {
        self.temp.path().join(relative)
    }

    /// Layout resolved against this directory.
    pub fn layout(&self) -> Layout {
        self.config.resolve_layout(self.temp.path())
    }

    /// Writes a file, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Reads a file.
    pub fn read(&self, relative: &str) -> Result<String> {
        Ok(fs::read_to_string(self.join(relative))?)
    }

    /// Whether `relative` exists.
    pub fn exists(&self, relative: &str) -> bool {
        self.join(relative).exists()
    }

    /// Every file under the directory as `(relative path, content)`, sorted.
    ///
    /// Used to prove a tree was not modified.
    pub fn contents(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(self.path()).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                let relative = entry
                    .path()
                    .strip_prefix(self.path())?
                    .to_string_lossy()
                    .replace('\\', "/");
                files.push((relative, fs::read(entry.path())?));
            }
        }
        Ok(files)
    }
}
