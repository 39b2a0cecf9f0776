//! Fake collaborators that record what the orchestrator asks of them.
//!
//! Every fake shares a [`CallLog`], so a test can assert the exact order in
//! which steps touched the outside world.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::UpdateError;
use crate::update::{Confirmer, Fetcher, Installer, Reporter};
use crate::utils::fs::{ensure_dir, remove_path};

/// Shared, ordered record of collaborator calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call.
    pub fn record(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.into());
        }
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

/// Writes a fixed tree into the staging directory, or fails like a dead network.
#[derive(Debug, Clone)]
pub struct FakeFetcher {
    log: CallLog,
    files: Vec<(PathBuf, String)>,
    fail: bool,
    staging_as_file: bool,
    missing_tool: Option<String>,
}

impl FakeFetcher {
    /// A fetcher producing `files` (relative path, content).
    pub fn with_files(log: &CallLog, files: &[(&str, &str)]) -> Self {
        Self {
            log: log.clone(),
            files: files.iter().map(|(p, c)| (PathBuf::from(p), (*c).to_string())).collect(),
            fail: false,
            staging_as_file: false,
            missing_tool: None,
        }
    }

    /// A fetcher whose fetch always fails.
    pub fn failing(log: &CallLog) -> Self {
        Self {
            fail: true,
            ..Self::with_files(log, &[])
        }
    }

    /// A fetcher that "succeeds" but leaves a plain file where the staging
    /// directory should be, so the apply step cannot read it.
    pub fn unreadable_staging(log: &CallLog) -> Self {
        Self {
            staging_as_file: true,
            ..Self::with_files(log, &[])
        }
    }

    /// Makes `verify` report `tool` as missing.
    #[must_use]
    pub fn missing_tool(mut self, tool: &str) -> Self {
        self.missing_tool = Some(tool.to_string());
        self
    }
}

impl Fetcher for FakeFetcher {
    fn verify(&self) -> Result<()> {
        self.log.record("verify-fetcher");
        if let Some(tool) = &self.missing_tool {
            return Err(UpdateError::PrerequisiteMissing { tool: tool.clone() }.into());
        }
        Ok(())
    }

    async fn fetch(&self, destination: &Path, _reporter: &Reporter) -> Result<()> {
        self.log.record("fetch");
        if self.fail {
            return Err(UpdateError::FetchFailed {
                url: "https://example.invalid/app.git".to_string(),
                reason: "Could not resolve host: example.invalid".to_string(),
                diagnosis: crate::update::Diagnosis::NetworkDown.describe().to_string(),
            }
            .into());
        }

        remove_path(destination)?;
        if self.staging_as_file {
            crate::utils::fs::ensure_parent_dir(destination)?;
            std::fs::write(destination, "not a directory")?;
            return Ok(());
        }
        ensure_dir(destination)?;
        for (relative, content) in &self.files {
            let path = destination.join(relative);
            crate::utils::fs::ensure_parent_dir(&path)?;
            std::fs::write(&path, content)?;
        }
        Ok(())
    }
}

/// Records installs and optionally fails them.
#[derive(Debug, Clone)]
pub struct FakeInstaller {
    log: CallLog,
    fail: bool,
}

impl FakeInstaller {
    /// An installer that succeeds.
    pub fn succeeding(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            fail: false,
        }
    }

    /// An installer that exits non-zero.
    pub fn failing(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            fail: true,
        }
    }
}

impl Installer for FakeInstaller {
    fn verify(&self) -> Result<()> {
        self.log.record("verify-installer");
        Ok(())
    }

    async fn install(&self, _work_dir: &Path, _reporter: &Reporter) -> Result<()> {
        self.log.record("install");
        if self.fail {
            return Err(UpdateError::InstallFailed {
                command: "npm install".to_string(),
                status: "exit status: 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Answers the confirmation with a fixed decision.
#[derive(Debug, Clone)]
pub struct FakeConfirmer {
    log: CallLog,
    proceed: bool,
}

impl FakeConfirmer {
    /// A confirmer answering `proceed`.
    pub fn new(log: &CallLog, proceed: bool) -> Self {
        Self {
            log: log.clone(),
            proceed,
        }
    }
}

impl Confirmer for FakeConfirmer {
    async fn confirm(&self, _reporter: &Reporter) -> bool {
        self.log.record("confirm");
        self.proceed
    }
}
