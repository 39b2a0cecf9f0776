//! File system helpers for copying and removing trees.
//!
//! All functions are synchronous and attach the failing path to the error so
//! the orchestrator can report exactly where a step stopped.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::core::UpdateError;

/// Ensures a directory exists, creating it and its parents if needed.
///
/// Fails if `path` exists but is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| UpdateError::FileSystemError {
            operation: "create directory".to_string(),
            path: path.display().to_string(),
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Ensures the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    Ok(())
}

/// Recursively copies the contents of `src` into `dst`, overwriting files.
///
/// Symlinks are recreated as symlinks (on Windows they are skipped with a
/// warning) and special files are skipped. Returns the number of entries
/// written.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    ensure_dir(dst)?;
    let mut copied = 0;

    for entry in fs::read_dir(src).with_context(|| UpdateError::FileSystemError {
        operation: "read directory".to_string(),
        path: src.display().to_string(),
    })? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            copied += copy_dir(&src_path, &dst_path)?;
        } else if file_type.is_file() {
            copy_file(&src_path, &dst_path)?;
            copied += 1;
        } else if file_type.is_symlink() {
            copied += copy_symlink(&src_path, &dst_path)?;
        } else {
            tracing::debug!("Skipping non-regular entry {}", src_path.display());
        }
    }

    Ok(copied)
}

/// Copies a single file, replacing a directory that may sit at `dst`.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if dst.is_dir() {
        remove_path(dst)?;
    }
    ensure_parent_dir(dst)?;
    fs::copy(src, dst).with_context(|| UpdateError::FileSystemError {
        operation: format!("copy {} to {}", src.display(), dst.display()),
        path: dst.display().to_string(),
    })?;
    Ok(())
}

/// Copies `src` to `dst`, whatever `src` is: directories recursively, files directly.
///
/// Returns the number of files written.
pub fn copy_path(src: &Path, dst: &Path) -> Result<usize> {
    let is_link = fs::symlink_metadata(src).is_ok_and(|m| m.file_type().is_symlink());
    if is_link {
        ensure_parent_dir(dst)?;
        copy_symlink(src, dst)
    } else if src.is_dir() {
        if dst.is_file() {
            remove_path(dst)?;
        }
        copy_dir(src, dst)
    } else {
        copy_file(src, dst)?;
        Ok(1)
    }
}

/// Recreates the symlink `src` at `dst`, replacing whatever is there.
///
/// Returns 1 when the link was written, 0 when it was skipped.
#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<usize> {
    let target = fs::read_link(src).with_context(|| UpdateError::FileSystemError {
        operation: "read symlink".to_string(),
        path: src.display().to_string(),
    })?;
    remove_path(dst)?;
    std::os::unix::fs::symlink(&target, dst).with_context(|| UpdateError::FileSystemError {
        operation: format!("link {} to {}", dst.display(), target.display()),
        path: dst.display().to_string(),
    })?;
    Ok(1)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, _dst: &Path) -> Result<usize> {
    tracing::warn!("Symlink {} was not copied", src.display());
    Ok(0)
}

/// Removes a file or directory tree. Missing paths are not an error.
///
/// This is the single cross-platform delete primitive of the crate.
pub fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| UpdateError::FileSystemError {
                operation: "inspect path".to_string(),
                path: path.display().to_string(),
            });
        }
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    result.with_context(|| UpdateError::FileSystemError {
        operation: "remove".to_string(),
        path: path.display().to_string(),
    })
}
