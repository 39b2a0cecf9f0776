use anyhow::{Context, Result};
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::CommandConfig;
use crate::core::UpdateError;
use crate::update::progress::{Reporter, with_heartbeat};
use crate::utils::platform::command_exists;

/// Installs the application's dependencies after new files are in place.
///
/// Only the exit status matters: zero is success, anything else is
/// [`UpdateError::InstallFailed`].
pub trait Installer {
    /// Checks that the installer program is available.
    fn verify(&self) -> Result<()>;

    /// Runs the installer in `work_dir`.
    fn install(&self, work_dir: &Path, reporter: &Reporter)
    -> impl Future<Output = Result<()>> + Send;
}

/// Runs a configured command, `npm install` by default.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    command: CommandConfig,
}

impl CommandInstaller {
    /// Creates an installer running `command`.
    #[must_use]
    pub const fn new(command: CommandConfig) -> Self {
        Self { command }
    }
}

impl Installer for CommandInstaller {
    fn verify(&self) -> Result<()> {
        if !command_exists(&self.command.program) {
            return Err(UpdateError::PrerequisiteMissing {
                tool: self.command.program.clone(),
            }
            .into());
        }
        Ok(())
    }

    async fn install(&self, work_dir: &Path, reporter: &Reporter) -> Result<()> {
        let command_line = self.command.display();
        debug!("Running `{}` in {}", command_line, work_dir.display());

        // Resolve through PATH so Windows `.cmd` shims are found
        let program = which::which(&self.command.program)
            .unwrap_or_else(|_| self.command.program.clone().into());

        let mut cmd = Command::new(program);
        cmd.args(&self.command.args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = with_heartbeat(reporter, format!("Running {command_line}"), cmd.output())
            .await
            .with_context(|| format!("Failed to start `{command_line}`"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                warn!("`{}` stderr:\n{}", command_line, stderr.trim());
            }
            return Err(UpdateError::InstallFailed {
                command: command_line,
                status: output.status.to_string(),
            }
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{}", stdout.trim());
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command(program: &str, args: &[&str]) -> CommandConfig {
        CommandConfig {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    #[tokio::test]
    async fn test_install_success() {
        let temp = TempDir::new().unwrap();
        let installer = CommandInstaller::new(command("sh", &["-c", "touch installed"]));
        installer.verify().unwrap();
        installer.install(temp.path(), &Reporter::silent()).await.unwrap();
        assert!(temp.path().join("installed").exists());
    }

    #[tokio::test]
    async fn test_install_failure_is_install_failed() {
        let temp = TempDir::new().unwrap();
        let installer = CommandInstaller::new(command("sh", &["-c", "exit 3"]));
        let err = installer.install(temp.path(), &Reporter::silent()).await.unwrap_err();
        match err.downcast_ref::<UpdateError>() {
            Some(UpdateError::InstallFailed { command, status }) => {
                assert_eq!(command, "sh -c exit 3");
                assert!(status.contains('3'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_install_failure_with_stderr_reports_command_line() {
        crate::test_utils::init_test_logging(Some(tracing::Level::DEBUG));
        let temp = TempDir::new().unwrap();
        let installer = CommandInstaller::new(command("sh", &["-c", "echo broken >&2; exit 1"]));
        let err = installer.install(temp.path(), &Reporter::silent()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UpdateError>(),
            Some(UpdateError::InstallFailed { command, .. }) if command == "sh -c echo broken >&2; exit 1"
        ));
    }

    #[test]
    fn test_verify_missing_program() {
        let installer = CommandInstaller::new(command("apup-no-such-installer", &[]));
        assert!(matches!(
            installer.verify().unwrap_err().downcast_ref::<UpdateError>(),
            Some(UpdateError::PrerequisiteMissing { .. })
        ));
    }
}
