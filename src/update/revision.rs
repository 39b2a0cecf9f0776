//! Revision record.
//!
//! After a successful update apup asks the GitHub commits API how many
//! commits the source branch has and writes the answer to a small JSON file,
//! `{"total": 123}`. The count comes from the `rel="last"` page number of a
//! `per_page=1` listing. The record is informational only: failing to produce
//! it never fails an update, and an unknown count is written as `{}`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::config::SourceConfig;
use crate::constants::{REVISION_REQUEST_TIMEOUT, USER_AGENT};
use crate::core::UpdateError;
use crate::git::parse_github_url;
use crate::utils::fs::ensure_parent_dir;

/// Persisted revision information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRecord {
    /// Number of commits on the source branch, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl RevisionRecord {
    /// Reads a record; a missing file yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let record = serde_json::from_str(&content)
            .with_context(|| format!("Invalid revision record at {}", path.display()))?;
        Ok(Some(record))
    }

    /// Writes the record as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, format!("{json}\n")).with_context(|| UpdateError::FileSystemError {
            operation: "write revision record".to_string(),
            path: path.display().to_string(),
        })?;
        Ok(())
    }
}

/// Commits API URL for `source`, either configured or derived from a GitHub URL.
#[must_use]
pub fn commits_api_url(source: &SourceConfig) -> Option<String> {
    if let Some(api) = &source.revision_api {
        return Some(api.clone());
    }
    let (owner, repo) = parse_github_url(&source.url)?;
    let mut url = format!("https://api.github.com/repos/{owner}/{repo}/commits?per_page=1");
    if let Some(branch) = &source.branch {
        url.push_str("&sha=");
        url.push_str(branch);
    }
    Some(url)
}

/// Extracts the page number of the `rel="last"` link from a `Link` header.
#[must_use]
pub fn parse_last_page(link: &str) -> Option<u64> {
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_last = params.split(';').any(|p| p.trim() == r#"rel="last""#);
        if !is_last {
            return None;
        }
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let query = target.split_once('?')?.1;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}

/// Queries the commits API and returns the commit count, if the API reports one.
pub async fn fetch_revision_count(api_url: &str) -> Result<Option<u64>> {
    let client = reqwest::Client::builder()
        .timeout(REVISION_REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;

    debug!("Requesting {}", api_url);
    let response = client
        .get(api_url)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .send()
        .await
        .map_err(|e| UpdateError::NetworkError {
            operation: "query commits API".to_string(),
            reason: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(UpdateError::NetworkError {
            operation: "query commits API".to_string(),
            reason: format!("HTTP {}", response.status()),
        }
        .into());
    }

    let total = response
        .headers()
        .get(reqwest::header::LINK)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_last_page);
    debug!("Commit count: {:?}", total);
    Ok(total)
}

/// Fetches the commit count for `source` and writes the record to `path`.
///
/// Sources without a known commits API produce an empty record.
pub async fn record_revision(source: &SourceConfig, path: &Path) -> Result<RevisionRecord> {
    let total = match commits_api_url(source) {
        Some(api_url) => fetch_revision_count(&api_url).await?,
        None => {
            debug!("No commits API for {}", source.url);
            None
        }
    };

    let record = RevisionRecord { total };
    record.save(path)?;
    Ok(record)
}
