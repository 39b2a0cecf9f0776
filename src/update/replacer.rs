use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Layout;
use crate::core::UpdateError;
use crate::update::progress::{ProgressEvent, Reporter};
use crate::utils::fs::{copy_path, remove_path};
use crate::utils::platform::{overlaps, path_is_within};

/// Swaps the old application tree for a fetched one.
///
/// Replacement happens in two phases. [`TreeReplacer::clean`] deletes the
/// fixed list of top-level artifacts and empties the user-data root, and
/// [`TreeReplacer::apply`] copies the staging tree over the live tree. There
/// is no atomic swap: a failure in between leaves a partially updated tree,
/// which the snapshot taken beforehand makes recoverable.
#[derive(Debug, Clone)]
pub struct TreeReplacer {
    data_root: PathBuf,
    removal_list: Vec<PathBuf>,
    progress_every: usize,
}

impl TreeReplacer {
    /// Creates a replacer for the given layout.
    #[must_use]
    pub fn new(layout: &Layout, progress_every: usize) -> Self {
        Self {
            data_root: layout.data_root.clone(),
            removal_list: layout.removal_list.clone(),
            progress_every: progress_every.max(1),
        }
    }

    /// Removes old application artifacts and the contents of the user-data root.
    ///
    /// Nothing that overlaps a `protected` path is deleted: not the path
    /// itself, not anything inside it, and not any directory containing it.
    /// Directories that contain a protected path are descended into and
    /// cleaned around it. Every other entry under the user-data root is
    /// removed, including files the snapshot does not cover.
    ///
    /// Returns the number of entries removed.
    pub fn clean(&self, protected: &[PathBuf]) -> Result<usize> {
        let mut removed = 0;

        for artifact in &self.removal_list {
            if is_protected(artifact, protected) {
                warn!("Not removing {}: it holds a protected path", artifact.display());
                continue;
            }
            if std::fs::symlink_metadata(artifact).is_ok() {
                debug!("Removing {}", artifact.display());
                remove_path(artifact)?;
                removed += 1;
            }
        }

        if !self.data_root.is_dir() {
            debug!("No user-data root at {}", self.data_root.display());
            return Ok(removed);
        }

        let mut doomed = Vec::new();
        let mut walker = WalkDir::new(&self.data_root).min_depth(1).follow_links(false).into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry.with_context(|| UpdateError::FileSystemError {
                operation: "walk directory".to_string(),
                path: self.data_root.display().to_string(),
            })?;
            let path = entry.path();
            let is_dir = entry.file_type().is_dir();

            let holds_protected = protected.iter().any(|p| path_is_within(p, path));
            let inside_protected = protected.iter().any(|p| path_is_within(path, p));

            if inside_protected || (holds_protected && !is_dir) {
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }
            if holds_protected {
                // Descend and clean around the protected path
                continue;
            }

            doomed.push(path.to_path_buf());
            if is_dir {
                walker.skip_current_dir();
            }
        }

        for path in &doomed {
            debug!("Removing {}", path.display());
            remove_path(path)?;
        }
        removed += doomed.len();

        info!("Clean removed {} entries", removed);
        Ok(removed)
    }

    /// Copies the immediate entries of `staging` onto `live_root`, then removes `staging`.
    ///
    /// Existing entries are overwritten. Progress is reported every
    /// `progress_every` entries and after the last one. Returns the number of
    /// entries copied.
    pub fn apply(&self, staging: &Path, live_root: &Path, reporter: &Reporter) -> Result<usize> {
        let mut entries = std::fs::read_dir(staging)
            .with_context(|| UpdateError::FileSystemError {
                operation: "read staging directory".to_string(),
                path: staging.display().to_string(),
            })?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        let total = entries.len();
        for (index, source) in entries.iter().enumerate() {
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = live_root.join(name);
            copy_path(source, &target)
                .with_context(|| format!("Failed to install {}", target.display()))?;

            let copied = index + 1;
            if copied % self.progress_every == 0 || copied == total {
                reporter.send(ProgressEvent::EntriesCopied {
                    copied,
                    total,
                });
            }
        }

        remove_path(staging)?;
        info!("Applied {} entries from staging", total);
        Ok(total)
    }
}

fn is_protected(path: &Path, protected: &[PathBuf]) -> bool {
    protected.iter().any(|p| overlaps(path, p))
}
