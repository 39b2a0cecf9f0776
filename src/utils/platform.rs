//! Platform helpers.
//!
//! Path comparison, tool lookup and path expansion used by the workflow. There
//! is intentionally no shell-command branching here: recursive deletion goes
//! through [`crate::utils::fs::remove_path`] on every platform.

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Returns the git executable name for the current platform.
#[must_use]
pub const fn get_git_command() -> &'static str {
    if is_windows() { "git.exe" } else { "git" }
}

/// Checks whether a command is available on `PATH`.
#[must_use]
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Expands `~` and environment variables in a user-supplied path.
///
/// Relative results stay relative; callers join them onto the working
/// directory themselves.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Failed to expand path: {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Lexically normalizes a path, resolving `.` and `..` without touching the
/// file system.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Compares two paths for equality using platform rules.
///
/// Windows comparison is case-insensitive; trailing separators are ignored on
/// every platform.
#[must_use]
pub fn paths_equal(path1: &Path, path2: &Path) -> bool {
    let p1 = normalize_path(path1);
    let p2 = normalize_path(path2);
    if is_windows() {
        p1.to_string_lossy().to_lowercase() == p2.to_string_lossy().to_lowercase()
    } else {
        p1 == p2
    }
}

/// Returns `true` if `path` equals `base` or lies underneath it.
#[must_use]
pub fn path_is_within(path: &Path, base: &Path) -> bool {
    let path = normalize_path(path);
    let base = normalize_path(base);
    if is_windows() {
        let path = path.to_string_lossy().to_lowercase();
        let base = base.to_string_lossy().to_lowercase();
        Path::new(&path).starts_with(Path::new(&base))
    } else {
        path.starts_with(&base)
    }
}

/// Returns `true` when deleting `candidate` would also delete (or is) `protected`,
/// or when `candidate` lives inside `protected`.
///
/// This is the containment check used by the clean step: the snapshot, every
/// ancestor of the snapshot and everything inside it are off limits.
#[must_use]
pub fn overlaps(candidate: &Path, protected: &Path) -> bool {
    path_is_within(protected, candidate) || path_is_within(candidate, protected)
}
