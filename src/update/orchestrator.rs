use anyhow::{Context, Result};
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{Layout, WorkflowConfig};
use crate::update::confirm::Confirmer;
use crate::update::fetcher::Fetcher;
use crate::update::installer::Installer;
use crate::update::progress::{ProgressEvent, Reporter};
use crate::update::replacer::TreeReplacer;
use crate::update::snapshot::SnapshotStore;
use crate::update::steps::{Step, WorkflowState};

/// How a workflow run ended.
#[derive(Debug)]
pub enum Outcome {
    /// Every step succeeded and the snapshot was discarded.
    Completed,
    /// A step failed; the remaining steps never ran.
    Aborted {
        /// The failing step
        step: Step,
        /// What went wrong
        error: anyhow::Error,
    },
    /// The operator interrupted the run or declined the confirmation.
    Cancelled {
        /// Step that was running, if any
        step: Option<Step>,
    },
}

/// Summary of a workflow run.
#[derive(Debug)]
pub struct WorkflowReport {
    /// Terminal state
    pub outcome: Outcome,
    /// Steps that finished successfully, in order
    pub completed: Vec<Step>,
    /// Snapshot created by this run, if the snapshot step started
    pub snapshot: Option<PathBuf>,
    /// Whether the snapshot was removed by the finalize step
    pub snapshot_discarded: bool,
    /// Top-level entries copied by the apply step
    pub entries_applied: usize,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl WorkflowReport {
    /// Process exit code for this outcome: 1 for an aborted run, 0 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self.outcome {
            Outcome::Aborted { .. } => 1,
            Outcome::Completed | Outcome::Cancelled { .. } => 0,
        }
    }

    /// Whether every step succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Completed)
    }

    /// The step that failed, for aborted runs.
    #[must_use]
    pub const fn failed_step(&self) -> Option<Step> {
        match self.outcome {
            Outcome::Aborted { step, .. } => Some(step),
            _ => None,
        }
    }

    /// Snapshot left on disk for manual recovery, if any.
    #[must_use]
    pub fn recovery_snapshot(&self) -> Option<&PathBuf> {
        if self.snapshot_discarded {
            None
        } else {
            self.snapshot.as_ref()
        }
    }
}

#[derive(Debug, Default)]
struct RunState {
    snapshot: Option<PathBuf>,
    snapshot_discarded: bool,
    entries_applied: usize,
}

enum Flow {
    Finished,
    Declined,
}

/// Drives the update workflow.
///
/// Steps run strictly in the order of [`Step::ALL`]. A step starts only after
/// the previous one succeeded; the first failure ends the run with
/// [`Outcome::Aborted`] and nothing already done is rolled back. The snapshot
/// is discarded only by the final step, so every run that stops early leaves
/// it on disk and reports its location.
///
/// The orchestrator is generic over its external collaborators so tests can
/// substitute fakes for `git` and the package installer.
pub struct Orchestrator<F, I, C> {
    layout: Layout,
    snapshots: SnapshotStore,
    replacer: TreeReplacer,
    fetcher: F,
    installer: I,
    confirmer: C,
    reporter: Reporter,
}

impl<F, I, C> Orchestrator<F, I, C>
where
    F: Fetcher,
    I: Installer,
    C: Confirmer,
{
    /// Creates an orchestrator for the application described by `layout`.
    pub fn new(
        layout: Layout,
        workflow: &WorkflowConfig,
        fetcher: F,
        installer: I,
        confirmer: C,
    ) -> Self {
        Self {
            snapshots: SnapshotStore::new(&layout),
            replacer: TreeReplacer::new(&layout, workflow.progress_every),
            layout,
            fetcher,
            installer,
            confirmer,
            reporter: Reporter::silent(),
        }
    }

    /// Sends progress events to `reporter`.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Runs the workflow to completion or failure.
    pub async fn run(&self) -> WorkflowReport {
        self.run_until(std::future::pending()).await
    }

    /// Runs the workflow until it ends or `shutdown` resolves.
    ///
    /// When `shutdown` wins, the in-flight step is dropped where it stands and
    /// nothing is cleaned up: the snapshot and staging tree stay as they are.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> WorkflowReport {
        let start = Instant::now();
        let mut state = WorkflowState::new();
        let mut run = RunState::default();

        let result = {
            let workflow = self.execute(&mut state, &mut run);
            tokio::pin!(workflow);
            tokio::pin!(shutdown);
            tokio::select! {
                biased;
                () = &mut shutdown => None,
                result = &mut workflow => Some(result),
            }
        };

        let outcome = match result {
            None => {
                warn!("Interrupted during {}", describe(state.current()));
                Outcome::Cancelled {
                    step: state.current(),
                }
            }
            Some(Ok(Flow::Declined)) => {
                info!("Update declined by operator");
                Outcome::Cancelled {
                    step: state.current(),
                }
            }
            Some(Ok(Flow::Finished)) => Outcome::Completed,
            Some(Err(error)) => {
                let step = state.current().unwrap_or(Step::Finalize);
                error!("Step {} failed: {:#}", step, error);
                if let Some(snapshot) = &run.snapshot {
                    error!("User data snapshot kept at {}", snapshot.display());
                }
                Outcome::Aborted { step, error }
            }
        };

        WorkflowReport {
            outcome,
            completed: state.completed_steps().to_vec(),
            snapshot: run.snapshot,
            snapshot_discarded: run.snapshot_discarded,
            entries_applied: run.entries_applied,
            elapsed: start.elapsed(),
        }
    }

    async fn execute(&self, state: &mut WorkflowState, run: &mut RunState) -> Result<Flow> {
        while let Some(step) = state.current() {
            self.reporter.send(ProgressEvent::StepStarted {
                step,
                index: state.completed_count() + 1,
                total: state.total(),
            });
            debug!("Starting step {}", step);

            match step {
                Step::VerifyPrerequisites => {
                    self.fetcher.verify()?;
                    self.installer.verify()?;
                }
                Step::Confirm => {
                    if !self.confirmer.confirm(&self.reporter).await {
                        return Ok(Flow::Declined);
                    }
                }
                Step::Snapshot => {
                    let location = self.snapshots.next_location();
                    self.snapshots.prepare(&location)?;
                    // A partially populated snapshot is still reported
                    run.snapshot = Some(location.clone());
                    let snapshot = self.snapshots.populate(location)?;
                    self.reporter.message(format!(
                        "Saved {} of {} user-data paths to {}",
                        snapshot.saved.len(),
                        self.snapshots.paths().len(),
                        snapshot.location.display()
                    ));
                }
                Step::Fetch => {
                    self.fetcher.fetch(&self.layout.staging_dir, &self.reporter).await?;
                }
                Step::Clean => {
                    let mut protected = vec![self.layout.staging_dir.clone()];
                    protected.extend(run.snapshot.iter().cloned());
                    self.replacer.clean(&protected)?;
                }
                Step::Apply => {
                    run.entries_applied = self.replacer.apply(
                        &self.layout.staging_dir,
                        &self.layout.work_dir,
                        &self.reporter,
                    )?;
                }
                Step::Restore => {
                    let snapshot = run.snapshot.as_deref().context("No snapshot was taken")?;
                    let restored = self.snapshots.restore(snapshot)?;
                    self.reporter.message(format!("Restored {restored} files"));
                }
                Step::InstallDependencies => {
                    self.installer.install(&self.layout.work_dir, &self.reporter).await?;
                }
                Step::Finalize => {
                    if let Some(snapshot) = &run.snapshot {
                        run.snapshot_discarded = self.snapshots.discard(snapshot);
                    }
                }
            }

            self.reporter.send(ProgressEvent::StepCompleted { step });
            state.advance();
        }

        Ok(Flow::Finished)
    }
}

fn describe(step: Option<Step>) -> String {
    step.map_or_else(|| "shutdown".to_string(), |s| s.name().to_string())
}
