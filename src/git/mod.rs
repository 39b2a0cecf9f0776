//! Git integration.
//!
//! apup only needs a shallow clone of the application repository. It runs the
//! system `git` binary through [`command_builder::GitCommand`], so the user's
//! credential helpers and SSH configuration apply. The helpers here check that
//! `git` exists and pick apart repository URLs for display and API lookups.

pub mod command_builder;

use anyhow::Result;

use crate::core::UpdateError;
use crate::utils::platform::get_git_command;

pub use command_builder::GitCommand;

/// Checks if Git is installed and runnable.
#[must_use]
pub fn is_git_installed() -> bool {
    // Synchronous check, used before any async work starts
    std::process::Command::new(get_git_command())
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Ensures Git is available, failing with [`UpdateError::PrerequisiteMissing`].
pub fn ensure_git_available() -> Result<()> {
    if !is_git_installed() {
        return Err(UpdateError::PrerequisiteMissing {
            tool: get_git_command().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Extracts `(owner, repo)` from a GitHub URL.
///
/// Accepts `https://github.com/owner/repo(.git)` and `git@github.com:owner/repo(.git)`.
/// Returns `None` for other hosts.
#[must_use]
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    let path = if let Some(rest) = url.strip_prefix("git@github.com:") {
        rest
    } else {
        let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        let without_auth = without_scheme.rsplit_once('@').map_or(without_scheme, |(_, rest)| rest);
        without_auth.strip_prefix("github.com/")?
    };

    let mut parts = path.trim_end_matches('/').splitn(2, '/');
    let owner = parts.next()?.to_string();
    let repo = parts.next()?.trim_end_matches(".git").to_string();
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner, repo))
}

/// Strips `user:token@` from HTTP(S) URLs for safe display or logging.
#[must_use]
pub fn strip_auth_from_url(url: &str) -> String {
    for scheme in ["https://", "http://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            let host_end = rest.find('/').unwrap_or(rest.len());
            if let Some(at_pos) = rest[..host_end].rfind('@') {
                return format!("{scheme}{}", &rest[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
