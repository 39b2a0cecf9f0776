//! Supervision of the long-running application process.
//!
//! [`ProcessSupervisor`] owns the child handle for `apup start`. The shutdown
//! path gets the supervisor passed in explicitly and terminates the child
//! through it; there is no process-wide handle.

use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::CommandConfig;
use crate::core::UpdateError;
use crate::utils::platform::command_exists;

/// Owns a spawned application process.
#[derive(Debug)]
pub struct ProcessSupervisor {
    command: CommandConfig,
    work_dir: PathBuf,
    child: Option<Child>,
}

impl ProcessSupervisor {
    /// Creates a supervisor that will run `command` in `work_dir`.
    #[must_use]
    pub fn new(command: CommandConfig, work_dir: &Path) -> Self {
        Self {
            command,
            work_dir: work_dir.to_path_buf(),
            child: None,
        }
    }

    /// Whether a child process is currently held.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Starts the process with inherited stdio and returns its pid.
    pub fn spawn(&mut self) -> Result<Option<u32>> {
        if !command_exists(&self.command.program) {
            return Err(UpdateError::PrerequisiteMissing {
                tool: self.command.program.clone(),
            }
            .into());
        }

        let program = which::which(&self.command.program)
            .unwrap_or_else(|_| self.command.program.clone().into());
        let child = Command::new(program)
            .args(&self.command.args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start `{}`", self.command.display()))?;

        let pid = child.id();
        info!("Started `{}` (pid {:?})", self.command.display(), pid);
        self.child = Some(child);
        Ok(pid)
    }

    /// Waits for the child to exit on its own.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let child = self.child.as_mut().context("No process is running")?;
        let status = child.wait().await.context("Failed to wait for the application")?;
        self.child = None;
        debug!("Application exited with {}", status);
        Ok(status)
    }

    /// Kills the child and reaps it. Does nothing if no child is held.
    pub async fn stop(&mut self) -> Result<Option<ExitStatus>> {
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };
        info!("Stopping `{}`", self.command.display());
        if let Err(e) = child.start_kill() {
            warn!("Could not signal the application: {e}");
        }
        let status = child.wait().await.context("Failed to reap the application")?;
        Ok(Some(status))
    }
}

/// Runs the supervised process until it exits or `shutdown` resolves.
///
/// On shutdown the child is terminated through `supervisor`. Returns the
/// exit code to propagate: the child's own code, or 0 after a shutdown.
pub async fn run_supervised(
    supervisor: &mut ProcessSupervisor,
    shutdown: impl Future<Output = ()>,
) -> Result<i32> {
    if !supervisor.is_running() {
        supervisor.spawn()?;
    }

    tokio::pin!(shutdown);
    let exited = {
        let wait = supervisor.wait();
        tokio::pin!(wait);
        tokio::select! {
            status = &mut wait => Some(status),
            () = &mut shutdown => None,
        }
    };

    match exited {
        Some(status) => Ok(status?.code().unwrap_or(1)),
        None => {
            supervisor.stop().await?;
            Ok(0)
        }
    }
}
