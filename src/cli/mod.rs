//! Command-line interface for apup.
//!
//! Running `apup` with no subcommand performs a full update of the application
//! in the working directory. The other subcommands expose single pieces of
//! the workflow for manual recovery and inspection.
//!
//! # Commands
//!
//! - `update` - snapshot user data, fetch the new version, replace the
//!   application, restore user data, reinstall dependencies (default)
//! - `restore` - copy user data back from an existing snapshot
//! - `snapshots` - list snapshots left behind by interrupted or failed runs
//! - `revision` - refresh the revision record
//! - `start` - run the application under supervision
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: no logging and no step lines
//! - `--no-progress`: hide spinners
//! - `--config <path>`: use a specific configuration file
//! - `--dir <path>`: application directory (default: current directory)
//!
//! # Exit Codes
//!
//! `0` on success or operator cancellation, `1` when a step fails.

mod common;
mod restore;
mod revision;
mod snapshots;
mod start;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub use common::AppContext;

/// Settings derived from the global flags, shared by every command.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level filter; `None` disables logging.
    pub log_level: Option<String>,
    /// Hide spinners.
    pub no_progress: bool,
    /// Suppress step lines.
    pub quiet: bool,
    /// Explicit configuration file.
    pub config_path: Option<String>,
    /// Application directory.
    pub work_dir: Option<String>,
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Logs go to stderr so they never
/// interleave with command output on stdout.
pub fn init_logging(level: Option<&str>) {
    let filter = match (std::env::var("RUST_LOG"), level) {
        (Ok(_), _) => EnvFilter::from_default_env(),
        (Err(_), Some(level)) => EnvFilter::new(level),
        (Err(_), None) => return,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main CLI structure for apup.
#[derive(Parser)]
#[command(
    name = "apup",
    about = "Update a locally installed application without losing its data",
    version,
    long_about = "apup snapshots the application's user data, fetches the latest version, \
                  replaces the application files, restores the data and reinstalls dependencies. \
                  If any step fails, the snapshot is kept and its location printed."
)]
pub struct Cli {
    /// Command to execute (defaults to `update`)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors and the final summary
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Application directory (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    dir: Option<String>,

    /// Disable progress indicators
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the application to the latest version
    Update(update::UpdateCommand),

    /// Restore user data from a snapshot
    Restore(restore::RestoreCommand),

    /// List snapshots left in the application directory
    Snapshots(snapshots::SnapshotsCommand),

    /// Refresh the revision record
    Revision(revision::RevisionCommand),

    /// Run the application
    Start(start::StartCommand),
}

impl Cli {
    /// Executes the selected command and returns the process exit code.
    pub async fn execute(self) -> Result<i32> {
        let config = self.build_config();
        init_logging(config.log_level.as_deref());
        self.execute_with_config(config).await
    }

    /// Builds a [`CliConfig`] from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
            quiet: self.quiet,
            config_path: self.config.clone(),
            work_dir: self.dir.clone(),
        }
    }

    /// Executes the command with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<i32> {
        let context =
            AppContext::load(config.work_dir.as_deref(), config.config_path.as_deref()).await?;

        match self.command {
            None => update::UpdateCommand::default().execute(&context, &config).await,
            Some(Commands::Update(cmd)) => cmd.execute(&context, &config).await,
            Some(Commands::Restore(cmd)) => cmd.execute(&context).map(|()| 0),
            Some(Commands::Snapshots(cmd)) => cmd.execute(&context).map(|()| 0),
            Some(Commands::Revision(cmd)) => cmd.execute(&context).await.map(|()| 0),
            Some(Commands::Start(cmd)) => cmd.execute(&context).await,
        }
    }
}
