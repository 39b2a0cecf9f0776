use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::constants::{
    CONFIG_ENV_VAR, CONFIG_FILE_NAME, DEFAULT_COUNTDOWN_SECS, DEFAULT_DATA_ROOT,
    DEFAULT_PROGRESS_EVERY, DEFAULT_REVISION_RECORD, DEFAULT_SNAPSHOT_PREFIX, DEFAULT_STAGING_DIR,
};
use crate::core::UpdateError;
use crate::utils::platform::{overlaps, path_is_within, paths_equal, resolve_path};

/// Complete apup configuration, read from `apup.toml`.
///
/// Every section is optional; a missing file yields [`UpdateConfig::default`].
///
/// ```toml
/// [source]
/// url = "https://github.com/owner/app.git"
/// branch = "main"
///
/// [layout]
/// data_root = "dados"
/// backup_paths = ["database", "src/config.json", "midias"]
///
/// [install]
/// program = "npm"
/// args = ["install"]
///
/// [workflow]
/// countdown_secs = 5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Where new versions come from.
    #[serde(default)]
    pub source: SourceConfig,

    /// File system layout of the application directory.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Dependency installer invocation.
    #[serde(default = "default_install_command")]
    pub install: CommandConfig,

    /// Long-running application invocation used by `apup start`.
    #[serde(default = "default_run_command")]
    pub run: CommandConfig,

    /// Workflow tuning.
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// Remote source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Git URL of the application repository.
    #[serde(default)]
    pub url: String,

    /// Branch to clone; the remote default branch when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Clone depth.
    #[serde(default = "default_depth")]
    pub depth: u32,

    /// Explicit commits API URL for the revision record.
    ///
    /// Derived from `url` for GitHub repositories when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_api: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            branch: None,
            depth: default_depth(),
            revision_api: None,
        }
    }
}

/// Layout of the application directory, all paths relative to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// User-data root.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    /// Paths under `data_root` that survive an update.
    #[serde(default = "default_backup_paths")]
    pub backup_paths: Vec<PathBuf>,

    /// Top-level artifacts removed unconditionally by the clean step.
    #[serde(default = "default_removal_list")]
    pub removal_list: Vec<PathBuf>,

    /// Files stripped from the fetched tree before it is applied.
    #[serde(default = "default_excluded_files")]
    pub excluded_files: Vec<PathBuf>,

    /// Disposable directory for the fetched tree.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Directory that receives snapshot directories.
    #[serde(default = "default_snapshot_parent")]
    pub snapshot_parent: PathBuf,

    /// Name prefix of snapshot directories.
    #[serde(default = "default_snapshot_prefix")]
    pub snapshot_prefix: String,

    /// Where the revision record is written.
    #[serde(default = "default_revision_record")]
    pub revision_record: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            backup_paths: default_backup_paths(),
            removal_list: default_removal_list(),
            excluded_files: default_excluded_files(),
            staging_dir: default_staging_dir(),
            snapshot_parent: default_snapshot_parent(),
            snapshot_prefix: default_snapshot_prefix(),
            revision_record: default_revision_record(),
        }
    }
}

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Executable name or path.
    pub program: String,
    /// Arguments passed verbatim.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandConfig {
    /// Renders the command line for messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Workflow tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Seconds the confirmation countdown waits.
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u64,

    /// Emit a copy progress event every this many entries.
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            countdown_secs: default_countdown_secs(),
            progress_every: default_progress_every(),
        }
    }
}

const fn default_depth() -> u32 {
    1
}

fn default_data_root() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_ROOT)
}

fn default_backup_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("database"), PathBuf::from("src/config.json"), PathBuf::from("midias")]
}

fn default_removal_list() -> Vec<PathBuf> {
    [".git", ".github", "node_modules", "package.json", "package-lock.json", "README.md"]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

fn default_excluded_files() -> Vec<PathBuf> {
    vec![PathBuf::from("README.md")]
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STAGING_DIR)
}

fn default_snapshot_parent() -> PathBuf {
    PathBuf::from(".")
}

fn default_snapshot_prefix() -> String {
    DEFAULT_SNAPSHOT_PREFIX.to_string()
}

fn default_revision_record() -> PathBuf {
    PathBuf::from(DEFAULT_REVISION_RECORD)
}

fn default_install_command() -> CommandConfig {
    CommandConfig {
        program: "npm".to_string(),
        args: vec!["install".to_string()],
    }
}

fn default_run_command() -> CommandConfig {
    CommandConfig {
        program: "npm".to_string(),
        args: vec!["start".to_string()],
    }
}

const fn default_countdown_secs() -> u64 {
    DEFAULT_COUNTDOWN_SECS
}

const fn default_progress_every() -> usize {
    DEFAULT_PROGRESS_EVERY
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            layout: LayoutConfig::default(),
            install: default_install_command(),
            run: default_run_command(),
            workflow: WorkflowConfig::default(),
        }
    }
}

impl UpdateConfig {
    /// Loads configuration for the application in `work_dir`.
    ///
    /// Lookup order: `explicit` path, then `APUP_CONFIG`, then
    /// `<work_dir>/apup.toml`. The first two must exist; a missing
    /// `apup.toml` falls back to defaults.
    pub async fn load(work_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var(CONFIG_ENV_VAR).ok();

        let config = if let Some(path) = explicit {
            Self::load_from(path).await?
        } else if let Some(path) = from_env {
            let path = resolve_path(&path)?;
            Self::load_from(&path).await?
        } else {
            let path = work_dir.join(CONFIG_FILE_NAME);
            if path.exists() {
                Self::load_from(&path).await?
            } else {
                tracing::debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, work_dir.display());
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Loads and parses a specific configuration file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| UpdateError::ConfigError {
            message: format!("{}: {e}", path.display()),
        })?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Checks that every configured path stays inside the application directory.
    pub fn validate(&self) -> Result<()> {
        let layout = &self.layout;

        check_relative("layout.data_root", &layout.data_root)?;
        check_relative("layout.staging_dir", &layout.staging_dir)?;
        check_relative("layout.snapshot_parent", &layout.snapshot_parent)?;
        check_relative("layout.revision_record", &layout.revision_record)?;
        for path in &layout.backup_paths {
            check_relative("layout.backup_paths", path)?;
        }
        for path in &layout.removal_list {
            check_relative("layout.removal_list", path)?;
        }
        for path in &layout.excluded_files {
            check_relative("layout.excluded_files", path)?;
        }

        if paths_equal(&layout.data_root, Path::new(".")) {
            return Err(config_error("layout.data_root must name a subdirectory"));
        }
        check_staging(layout)?;
        if layout.snapshot_prefix.is_empty() {
            return Err(config_error("layout.snapshot_prefix must not be empty"));
        }
        if self.workflow.progress_every == 0 {
            return Err(config_error("workflow.progress_every must be at least 1"));
        }
        if self.install.program.trim().is_empty() {
            return Err(config_error("install.program must not be empty"));
        }

        Ok(())
    }

    /// Resolves the layout against the application directory.
    #[must_use]
    pub fn resolve_layout(&self, work_dir: &Path) -> Layout {
        let layout = &self.layout;
        let data_root = work_dir.join(&layout.data_root);
        Layout {
            work_dir: work_dir.to_path_buf(),
            backup_paths: layout
                .backup_paths
                .iter()
                .map(|relative| BackupPath {
                    root: data_root.clone(),
                    relative: relative.clone(),
                })
                .collect(),
            data_root,
            removal_list: layout.removal_list.iter().map(|p| work_dir.join(p)).collect(),
            excluded_files: layout.excluded_files.clone(),
            staging_dir: work_dir.join(&layout.staging_dir),
            snapshot_parent: work_dir.join(&layout.snapshot_parent),
            snapshot_prefix: layout.snapshot_prefix.clone(),
            revision_record: work_dir.join(&layout.revision_record),
        }
    }
}

fn config_error(message: impl Into<String>) -> anyhow::Error {
    UpdateError::ConfigError {
        message: message.into(),
    }
    .into()
}

fn check_relative(field: &str, path: &Path) -> Result<()> {
    let escapes = path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(config_error(format!(
            "{field} must be relative to the application directory: {}",
            path.display()
        )));
    }
    Ok(())
}

// The fetcher deletes the staging directory before every clone, so it must not
// hold or sit inside anything that outlives a failed fetch.
fn check_staging(layout: &LayoutConfig) -> Result<()> {
    let staging = &layout.staging_dir;
    if paths_equal(staging, Path::new(".")) {
        return Err(config_error("layout.staging_dir must name a subdirectory"));
    }
    if overlaps(staging, &layout.data_root) {
        return Err(config_error(format!(
            "layout.staging_dir overlaps layout.data_root: {}",
            staging.display()
        )));
    }
    if path_is_within(&layout.snapshot_parent, staging) {
        return Err(config_error(format!(
            "layout.snapshot_parent must not be inside layout.staging_dir: {}",
            layout.snapshot_parent.display()
        )));
    }
    if let Some(entry) = layout.removal_list.iter().find(|entry| overlaps(staging, entry)) {
        return Err(config_error(format!(
            "layout.staging_dir overlaps layout.removal_list entry {}",
            entry.display()
        )));
    }
    Ok(())
}

/// One user-data path: a `relative` location under `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPath {
    /// User-data root on the live tree.
    pub root: PathBuf,
    /// Location under the root; mirrored as-is inside a snapshot.
    pub relative: PathBuf,
}

impl BackupPath {
    /// Absolute location on the live tree.
    #[must_use]
    pub fn live_path(&self) -> PathBuf {
        self.root.join(&self.relative)
    }

    /// Location of this path inside a snapshot.
    #[must_use]
    pub fn snapshot_path(&self, snapshot: &Path) -> PathBuf {
        snapshot.join(&self.relative)
    }
}

/// Layout resolved against a concrete application directory.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Application directory (the live tree).
    pub work_dir: PathBuf,
    /// User-data root.
    pub data_root: PathBuf,
    /// Paths saved by the snapshot store.
    pub backup_paths: Vec<BackupPath>,
    /// Artifacts removed unconditionally during clean.
    pub removal_list: Vec<PathBuf>,
    /// Files stripped from the staging tree, relative to its root.
    pub excluded_files: Vec<PathBuf>,
    /// Staging directory for fetched sources.
    pub staging_dir: PathBuf,
    /// Parent directory of snapshots.
    pub snapshot_parent: PathBuf,
    /// Snapshot directory name prefix.
    pub snapshot_prefix: String,
    /// Revision record location.
    pub revision_record: PathBuf,
}
