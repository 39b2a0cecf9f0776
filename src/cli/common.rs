//! Shared setup for CLI commands.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{Layout, UpdateConfig};
use crate::core::UpdateError;
use crate::utils::platform::resolve_path;

/// The application directory with its configuration loaded.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Absolute application directory.
    pub work_dir: PathBuf,
    /// Loaded configuration.
    pub config: UpdateConfig,
    /// Layout resolved against `work_dir`.
    pub layout: Layout,
}

impl AppContext {
    /// Resolves the application directory and loads its configuration.
    ///
    /// `dir` and `config_path` accept `~` and environment variables.
    pub async fn load(dir: Option<&str>, config_path: Option<&str>) -> Result<Self> {
        let work_dir = match dir {
            Some(dir) => resolve_path(dir)?,
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        if !work_dir.is_dir() {
            return Err(UpdateError::ConfigError {
                message: format!("application directory not found: {}", work_dir.display()),
            }
            .into());
        }
        let work_dir = std::fs::canonicalize(&work_dir)
            .with_context(|| format!("Failed to resolve {}", work_dir.display()))?;

        let explicit = config_path.map(resolve_path).transpose()?;
        let config = UpdateConfig::load(&work_dir, explicit.as_deref()).await?;
        let layout = config.resolve_layout(&work_dir);

        Ok(Self {
            work_dir,
            config,
            layout,
        })
    }

    /// Resolves a user-supplied path against the application directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        absolutize(&self.work_dir, path.to_path_buf())
    }
}

fn absolutize(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
