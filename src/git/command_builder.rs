//! Builder for the `git` invocations apup makes.
//!
//! Everything that shells out to Git goes through [`GitCommand`] so that
//! credential prompts, logging and failure mapping are handled in one place.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Instant;
use tokio::process::Command;

use crate::core::UpdateError;
use crate::utils::platform::get_git_command;

/// What a command is for; decides which error a failure becomes.
#[derive(Debug, Clone, Default)]
enum Purpose {
    #[default]
    General,
    Clone {
        url: String,
    },
}

/// A single `git` invocation.
///
/// Output is captured, stdin is closed and the child is killed if the future
/// is dropped. There is no timeout: a clone runs as long as the transport
/// lets it.
///
/// # Examples
///
/// ```rust,no_run
/// use apup::git::GitCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// GitCommand::clone_shallow("https://github.com/owner/app.git", "/tmp/stage", 1, None)
///     .with_context("update")
///     .execute_success()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct GitCommand {
    args: Vec<String>,
    envs: Vec<(String, String)>,
    label: Option<String>,
    purpose: Purpose,
}

/// Captured output of a successful command.
#[derive(Debug)]
pub struct GitCommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error (git writes progress here)
    pub stderr: String,
}

impl GitCommand {
    /// Creates an empty command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self.args.push(arg.into());
        }
        self
    }

    /// Sets an environment variable for this invocation only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Tags log lines with `label`.
    pub fn with_context(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// `git clone --depth <depth> --single-branch [--branch <branch>] <url> <target>`.
    ///
    /// Terminal credential prompts are disabled so an unattended run fails
    /// instead of hanging.
    pub fn clone_shallow(
        url: &str,
        target: impl AsRef<Path>,
        depth: u32,
        branch: Option<&str>,
    ) -> Self {
        let mut cmd = Self::new()
            .arg("clone")
            .args(["--depth".to_string(), depth.to_string()])
            .arg("--single-branch");
        if let Some(branch) = branch {
            cmd = cmd.args(["--branch", branch]);
        }
        cmd = cmd
            .arg(url)
            .arg(target.as_ref().display().to_string())
            .env("GIT_TERMINAL_PROMPT", "0");
        cmd.purpose = Purpose::Clone {
            url: url.to_string(),
        };
        cmd
    }

    fn subcommand(&self) -> &str {
        self.args.first().map_or("git", String::as_str)
    }

    fn prefix(&self) -> String {
        self.label.as_ref().map(|l| format!("({l}) ")).unwrap_or_default()
    }

    /// Runs the command, mapping a non-zero exit to an [`UpdateError`].
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let program = get_git_command();
        let prefix = self.prefix();
        tracing::debug!(target: "git", "{}Running {} {}", prefix, program, self.args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run {program} {}", self.subcommand()))?;
        self.log_duration(started, &prefix);

        if !output.status.success() {
            return Err(self.failure(&output, &prefix).into());
        }

        let result = GitCommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.stderr.trim().is_empty() {
            tracing::trace!(target: "git", "{}{}", prefix, result.stderr.trim());
        }
        Ok(result)
    }

    /// Runs the command and discards its output.
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await.map(drop)
    }

    fn failure(&self, output: &Output, prefix: &str) -> UpdateError {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let reason = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() }.to_string();

        tracing::debug!(
            target: "git",
            "{}git {} exited with {:?}: {}",
            prefix,
            self.subcommand(),
            output.status.code(),
            reason
        );

        match &self.purpose {
            Purpose::Clone { url } => UpdateError::GitCloneFailed {
                url: url.clone(),
                reason,
            },
            Purpose::General => UpdateError::GitCommandError {
                operation: self.subcommand().to_string(),
                stderr: reason,
            },
        }
    }

    fn log_duration(&self, started: Instant, prefix: &str) {
        let elapsed = started.elapsed();
        if elapsed.as_secs() >= 2 {
            tracing::info!(
                target: "git::perf",
                "{}git {} took {:.1}s",
                prefix,
                self.subcommand(),
                elapsed.as_secs_f64()
            );
        } else {
            tracing::debug!(
                target: "git::perf",
                "{}git {} took {}ms",
                prefix,
                self.subcommand(),
                elapsed.as_millis()
            );
        }
    }
}
