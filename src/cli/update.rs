//! `apup update`: the full backup → update → restore workflow.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::warn;

use crate::cli::{AppContext, CliConfig};
use crate::core::user_friendly_error;
use crate::update::{
    AssumeYes, CommandInstaller, Confirmer, CountdownConfirmer, GitFetcher, Orchestrator, Outcome,
    Reporter, Step, WorkflowReport, record_revision,
};
use crate::utils::progress::spawn_renderer;

/// Command to update the application in place.
#[derive(Args, Debug, Default)]
pub struct UpdateCommand {
    /// Skip the confirmation countdown
    #[arg(short, long)]
    yes: bool,

    /// Seconds to wait before modifying anything (overrides the config)
    #[arg(long, value_name = "SECS")]
    countdown: Option<u64>,

    /// Fetch from this URL instead of the configured source
    #[arg(long, value_name = "URL")]
    source: Option<String>,
}

impl UpdateCommand {
    /// Runs the workflow and returns the exit code.
    pub async fn execute(self, context: &AppContext, cli: &CliConfig) -> Result<i32> {
        if self.yes {
            self.run(context, cli, AssumeYes).await
        } else {
            let seconds = self.countdown.unwrap_or(context.config.workflow.countdown_secs);
            self.run(context, cli, CountdownConfirmer::new(seconds)).await
        }
    }

    async fn run<C: Confirmer>(self, context: &AppContext, cli: &CliConfig, confirmer: C) -> Result<i32> {
        let mut source = context.config.source.clone();
        if let Some(url) = self.source {
            source.url = url;
        }

        if !cli.quiet {
            println!(
                "{} {}",
                "Updating".bold().cyan(),
                context.work_dir.display().to_string().bold()
            );
            if !self.yes {
                println!("  Press Ctrl+C during the countdown to cancel without changes.");
            }
        }

        let (reporter, renderer) = if cli.quiet {
            (Reporter::silent(), None)
        } else {
            let (reporter, rx) = Reporter::channel();
            (reporter, Some(spawn_renderer(rx, !cli.no_progress)))
        };

        let orchestrator = Orchestrator::new(
            context.layout.clone(),
            &context.config.workflow,
            GitFetcher::new(&source, context.layout.excluded_files.clone()),
            CommandInstaller::new(context.config.install.clone()),
            confirmer,
        )
        .with_reporter(reporter);

        let report = orchestrator.run_until(shutdown_signal()).await;
        drop(orchestrator);
        if let Some(renderer) = renderer {
            let _ = renderer.await;
        }

        if report.is_success() {
            match record_revision(&source, &context.layout.revision_record).await {
                Ok(record) => {
                    tracing::debug!("Revision record updated: {:?}", record.total);
                }
                Err(e) => warn!("Could not update the revision record: {e:#}"),
            }
        }

        let code = report.exit_code();
        print_report(report, context);
        Ok(code)
    }
}

/// Resolves when the operator presses Ctrl+C.
///
/// If the handler cannot be installed the future never resolves.
pub(crate) async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

fn print_report(report: WorkflowReport, context: &AppContext) {
    let snapshot = report.recovery_snapshot().cloned();

    match report.outcome {
        Outcome::Completed => {
            println!(
                "\n{} Update complete: {} entries installed in {:.1}s",
                "✓".green().bold(),
                report.entries_applied,
                report.elapsed.as_secs_f64()
            );
            if let Some(snapshot) = snapshot {
                println!(
                    "  {} the snapshot at {} could not be removed; delete it when convenient",
                    "Note:".yellow(),
                    snapshot.display()
                );
            }
        }
        Outcome::Cancelled { step } => {
            println!("\n{}", "Update cancelled.".yellow().bold());
            if let Some(step) = step {
                if step.is_destructive() {
                    println!(
                        "  Interrupted during '{}'; the application may be partially updated.",
                        step.name()
                    );
                }
            }
            if let Some(snapshot) = snapshot {
                println!("  User data snapshot left at {}", snapshot.display());
            }
        }
        Outcome::Aborted { step, error } => {
            eprintln!("\n{} Update failed at step '{}'", "✗".red().bold(), step.name());
            user_friendly_error(error).display();

            match snapshot {
                Some(snapshot) if step_touched_tree(step) => {
                    eprintln!(
                        "\n{} Your data is safe in {}",
                        "Recovery:".yellow().bold(),
                        snapshot.display()
                    );
                    eprintln!(
                        "  Copy its contents back into {} or run: apup restore {}",
                        context.layout.data_root.display(),
                        snapshot.display()
                    );
                }
                Some(snapshot) => {
                    eprintln!(
                        "\n  The application was not modified. User data snapshot: {}",
                        snapshot.display()
                    );
                }
                None => eprintln!("\n  The application was not modified."),
            }
        }
    }
}

fn step_touched_tree(step: Step) -> bool {
    step.is_destructive() || step == Step::Finalize
}
