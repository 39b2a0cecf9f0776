use anyhow::Result;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::constants::{PROBE_BACKOFF_MS, PROBE_RETRIES, PROBE_TIMEOUT, USER_AGENT};
use crate::core::UpdateError;
use crate::git::{GitCommand, ensure_git_available, strip_auth_from_url};
use crate::update::progress::{Reporter, with_heartbeat};
use crate::utils::fs::{ensure_parent_dir, remove_path};

/// Retrieves a fresh copy of the application into a staging directory.
///
/// Implementations must leave everything outside `destination` untouched,
/// whether they succeed or fail.
pub trait Fetcher {
    /// Checks that the tools this fetcher shells out to are installed.
    fn verify(&self) -> Result<()>;

    /// Replaces `destination` with a fresh copy of the source.
    fn fetch(&self, destination: &Path, reporter: &Reporter)
    -> impl Future<Output = Result<()>> + Send;
}

/// Fetches the application with a shallow `git clone`.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    url: String,
    branch: Option<String>,
    depth: u32,
    excluded_files: Vec<PathBuf>,
}

impl GitFetcher {
    /// Builds a fetcher from the `[source]` section and the excluded files.
    #[must_use]
    pub fn new(source: &SourceConfig, excluded_files: Vec<PathBuf>) -> Self {
        Self {
            url: source.url.clone(),
            branch: source.branch.clone(),
            depth: source.depth.max(1),
            excluded_files,
        }
    }
}

impl Fetcher for GitFetcher {
    fn verify(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(UpdateError::ConfigError {
                message: "source.url is not set".to_string(),
            }
            .into());
        }
        ensure_git_available()
    }

    async fn fetch(&self, destination: &Path, reporter: &Reporter) -> Result<()> {
        if destination.exists() {
            debug!("Removing leftover staging tree at {}", destination.display());
            remove_path(destination)?;
        }
        ensure_parent_dir(destination)?;

        let safe_url = strip_auth_from_url(&self.url);
        info!("Cloning {} into {}", safe_url, destination.display());

        let clone =
            GitCommand::clone_shallow(&self.url, destination, self.depth, self.branch.as_deref())
                .with_context("fetch");
        let result = with_heartbeat(reporter, format!("Cloning {safe_url}"), clone.execute_success())
            .await;

        if let Err(error) = result {
            let reason = match error.downcast_ref::<UpdateError>() {
                Some(UpdateError::GitCloneFailed { reason, .. }) => reason.clone(),
                _ => format!("{error:#}"),
            };

            reporter.message("Clone failed, checking connectivity");
            let diagnosis = probe_reachability(&self.url).await;
            warn!("Fetch from {} failed: {}", safe_url, diagnosis.describe());

            return Err(UpdateError::FetchFailed {
                url: safe_url,
                reason,
                diagnosis: diagnosis.describe().to_string(),
            }
            .into());
        }

        strip_excluded(destination, &self.excluded_files)
    }
}

/// Removes `excluded` (relative paths) from a fetched tree.
pub fn strip_excluded(root: &Path, excluded: &[PathBuf]) -> Result<()> {
    for relative in excluded {
        let path = root.join(relative);
        if path.exists() {
            debug!("Stripping {} from fetched tree", relative.display());
            remove_path(&path)?;
        }
    }
    Ok(())
}

/// Outcome of the connectivity check run after a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnosis {
    /// The source host did not answer.
    NetworkDown,
    /// The host answered, so the clone failed for another reason.
    HostReachable,
    /// The source is on the local file system.
    LocalSource,
}

impl Diagnosis {
    /// Operator-facing explanation.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Diagnosis::NetworkDown => {
                "The source host could not be reached. The network is likely down; check your connection and try again."
            }
            Diagnosis::HostReachable => {
                "The source host is reachable. This is likely a permission or configuration problem; check source.url, source.branch and your credentials."
            }
            Diagnosis::LocalSource => {
                "The source is a local path. Check that it exists and is a Git repository."
            }
        }
    }
}

enum ProbeTarget {
    Http(reqwest::Url),
    Tcp(String, u16),
    Local,
}

fn probe_target(url: &str) -> ProbeTarget {
    // scp-like syntax: user@host:path
    if !url.contains("://") {
        if let Some((user_host, _)) = url.split_once(':') {
            if let Some((_, host)) = user_host.rsplit_once('@') {
                return ProbeTarget::Tcp(host.to_string(), 22);
            }
        }
        return ProbeTarget::Local;
    }

    match reqwest::Url::parse(url) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => ProbeTarget::Http(parsed),
            "file" => ProbeTarget::Local,
            scheme => match parsed.host_str() {
                Some(host) => {
                    let default_port = if scheme == "git" { 9418 } else { 22 };
                    ProbeTarget::Tcp(host.to_string(), parsed.port().unwrap_or(default_port))
                }
                None => ProbeTarget::Local,
            },
        },
        Err(_) => ProbeTarget::Local,
    }
}

/// Checks whether the host behind `url` answers at all.
///
/// HTTP(S) sources get a `HEAD` request against the host root; SSH and
/// `git://` sources get a TCP connect. Each attempt is bounded by a short
/// timeout and retried a couple of times with backoff. Any HTTP response,
/// including an error status, counts as reachable.
pub async fn probe_reachability(url: &str) -> Diagnosis {
    let strategy = ExponentialBackoff::from_millis(PROBE_BACKOFF_MS)
        .factor(2)
        .max_delay(Duration::from_secs(2))
        .take(PROBE_RETRIES);

    let reachable = match probe_target(url) {
        ProbeTarget::Local => return Diagnosis::LocalSource,
        ProbeTarget::Http(mut target) => {
            target.set_path("/");
            target.set_query(None);
            let _ = target.set_username("");
            let _ = target.set_password(None);

            let client = match reqwest::Client::builder()
                .timeout(PROBE_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
            {
                Ok(client) => client,
                Err(e) => {
                    warn!("Could not build HTTP client for probe: {e}");
                    return Diagnosis::NetworkDown;
                }
            };

            Retry::spawn(strategy, || {
                let client = client.clone();
                let target = target.clone();
                async move {
                    debug!(target: "probe", "HEAD {}", target);
                    client.head(target).send().await.map(|response| {
                        debug!(target: "probe", "Host answered with {}", response.status());
                    })
                }
            })
            .await
            .is_ok()
        }
        ProbeTarget::Tcp(host, port) => Retry::spawn(strategy, || {
            let host = host.clone();
            async move {
                debug!(target: "probe", "Connecting to {}:{}", host, port);
                match tokio::time::timeout(PROBE_TIMEOUT, tokio::net::TcpStream::connect((host.as_str(), port)))
                    .await
                {
                    Ok(Ok(_)) => Ok(()),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "probe timed out")),
                }
            }
        })
        .await
        .is_ok(),
    };

    if reachable {
        Diagnosis::HostReachable
    } else {
        Diagnosis::NetworkDown
    }
}
