use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{BackupPath, Layout};
use crate::constants::SNAPSHOT_TIMESTAMP_FORMAT;
use crate::core::UpdateError;
use crate::utils::fs::{copy_path, ensure_dir, remove_path};
use crate::utils::platform::path_is_within;

/// Saves user data before an update and puts it back afterwards.
///
/// Each run gets its own snapshot directory, named from the configured prefix
/// and a millisecond timestamp (`backup_20240131_142501_123`). Inside it,
/// every [`BackupPath`] is mirrored under its relative path, so the snapshot
/// of `dados/src/config.json` is `<snapshot>/src/config.json`.
///
/// Snapshots are never removed implicitly. A failed update leaves its snapshot
/// behind as the recovery artifact; only [`SnapshotStore::discard`] deletes
/// one, and the workflow calls it after everything else succeeded.
///
/// # Examples
///
/// ```rust,no_run
/// use apup::config::UpdateConfig;
/// use apup::update::SnapshotStore;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let layout = UpdateConfig::default().resolve_layout(Path::new("/srv/app"));
/// let store = SnapshotStore::new(&layout);
///
/// let snapshot = store.create()?;
/// // ... replace the application ...
/// store.restore(&snapshot.location)?;
/// store.discard(&snapshot.location);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    parent: PathBuf,
    prefix: String,
    paths: Vec<BackupPath>,
}

/// A snapshot written by [`SnapshotStore::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Snapshot directory.
    pub location: PathBuf,
    /// Relative paths that existed on the live tree and were saved.
    pub saved: Vec<PathBuf>,
    /// Files written into the snapshot.
    pub files: usize,
}

/// An existing snapshot directory found by [`SnapshotStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    /// Directory name.
    pub name: String,
    /// Full path.
    pub location: PathBuf,
    /// Creation time parsed from the name, if it follows the naming scheme.
    pub created: Option<NaiveDateTime>,
}

impl SnapshotStore {
    /// Creates a store for the given layout.
    #[must_use]
    pub fn new(layout: &Layout) -> Self {
        Self {
            parent: layout.snapshot_parent.clone(),
            prefix: layout.snapshot_prefix.clone(),
            paths: layout.backup_paths.clone(),
        }
    }

    /// Configured user-data paths.
    #[must_use]
    pub fn paths(&self) -> &[BackupPath] {
        &self.paths
    }

    /// Picks a snapshot location that does not exist yet.
    ///
    /// Two runs in the same millisecond get a numeric suffix.
    #[must_use]
    pub fn next_location(&self) -> PathBuf {
        let stamp = Local::now().format(SNAPSHOT_TIMESTAMP_FORMAT);
        let base = format!("{}{stamp}", self.prefix);
        let mut candidate = self.parent.join(&base);
        let mut attempt = 1;
        while candidate.exists() {
            candidate = self.parent.join(format!("{base}-{attempt}"));
            attempt += 1;
        }
        candidate
    }

    /// Copies every existing user-data path into a fresh snapshot.
    ///
    /// Missing paths are skipped. A failure partway leaves the partial
    /// snapshot on disk.
    pub fn create(&self) -> Result<Snapshot> {
        self.create_in(self.next_location())
    }

    /// Like [`SnapshotStore::create`], at a location picked beforehand with
    /// [`SnapshotStore::next_location`].
    pub fn create_in(&self, location: PathBuf) -> Result<Snapshot> {
        self.prepare(&location)?;
        self.populate(location)
    }

    /// Checks `location` and creates the empty snapshot directory.
    pub fn prepare(&self, location: &Path) -> Result<()> {
        for path in &self.paths {
            if path_is_within(location, &path.live_path()) {
                return Err(UpdateError::ConfigError {
                    message: format!(
                        "snapshot location {} lies inside backed-up path {}",
                        location.display(),
                        path.live_path().display()
                    ),
                }
                .into());
            }
        }
        ensure_dir(location)
    }

    /// Copies the user-data paths into a directory made by [`SnapshotStore::prepare`].
    pub fn populate(&self, location: PathBuf) -> Result<Snapshot> {
        info!("Creating snapshot at {}", location.display());
        let mut saved = Vec::new();
        let mut files = 0;

        for path in &self.paths {
            let source = path.live_path();
            if !source.exists() {
                debug!("Nothing to back up at {}", source.display());
                continue;
            }

            let target = path.snapshot_path(&location);
            files += copy_path(&source, &target).with_context(|| {
                format!("Failed to back up {} into {}", source.display(), location.display())
            })?;
            debug!("Backed up {}", source.display());
            saved.push(path.relative.clone());
        }

        Ok(Snapshot {
            location,
            saved,
            files,
        })
    }

    /// Copies every path present in `snapshot` back onto the live tree.
    ///
    /// Missing parent directories are created and existing files overwritten.
    /// Returns the number of files restored.
    pub fn restore(&self, snapshot: &Path) -> Result<usize> {
        if !snapshot.is_dir() {
            return Err(UpdateError::SnapshotNotFound {
                path: snapshot.display().to_string(),
            }
            .into());
        }

        info!("Restoring user data from {}", snapshot.display());
        let mut restored = 0;
        for path in &self.paths {
            let source = path.snapshot_path(snapshot);
            if !source.exists() {
                debug!("Snapshot has no {}", path.relative.display());
                continue;
            }

            let target = path.live_path();
            restored += copy_path(&source, &target).with_context(|| {
                format!("Failed to restore {} from {}", target.display(), snapshot.display())
            })?;
        }
        Ok(restored)
    }

    /// Removes a snapshot. Failures are logged and reported as `false`.
    pub fn discard(&self, snapshot: &Path) -> bool {
        match remove_path(snapshot) {
            Ok(()) => {
                debug!("Discarded snapshot {}", snapshot.display());
                true
            }
            Err(e) => {
                warn!("Could not remove snapshot {}: {e:#}", snapshot.display());
                false
            }
        }
    }

    /// Lists snapshot directories under the snapshot parent, newest first.
    pub fn list(&self) -> Result<Vec<SnapshotInfo>> {
        if !self.parent.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.parent).with_context(|| UpdateError::FileSystemError {
            operation: "read directory".to_string(),
            path: self.parent.display().to_string(),
        })?;

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(stamp) = name.strip_prefix(&self.prefix) else {
                continue;
            };
            let created = parse_stamp(stamp);
            snapshots.push(SnapshotInfo {
                created,
                name,
                location: entry.path(),
            });
        }

        snapshots.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.name.cmp(&a.name)));
        Ok(snapshots)
    }
}

fn parse_stamp(stamp: &str) -> Option<NaiveDateTime> {
    // Strip a collision suffix such as `-1`
    let stamp = match stamp.rsplit_once('-') {
        Some((head, tail)) if tail.chars().all(|c| c.is_ascii_digit()) => head,
        _ => stamp,
    };
    NaiveDateTime::parse_from_str(stamp, SNAPSHOT_TIMESTAMP_FORMAT).ok()
}
