//! `apup start`: run the application under supervision.

use anyhow::Result;
use clap::Args;

use crate::cli::AppContext;
use crate::cli::update::shutdown_signal;
use crate::supervisor::{ProcessSupervisor, run_supervised};

/// Command to start the configured application.
///
/// Ctrl+C stops the application; otherwise its exit code becomes apup's.
#[derive(Args, Debug)]
pub struct StartCommand {}

impl StartCommand {
    /// Runs the application until it exits or is interrupted.
    pub async fn execute(self, context: &AppContext) -> Result<i32> {
        let mut supervisor = ProcessSupervisor::new(context.config.run.clone(), &context.work_dir);
        run_supervised(&mut supervisor, shutdown_signal()).await
    }
}
