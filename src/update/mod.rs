//! The backup → update → restore workflow.
//!
//! An update replaces the application tree in place while keeping the user's
//! data. The pieces, in dependency order:
//!
//! - [`SnapshotStore`] copies the configured user-data paths into a
//!   timestamped snapshot and restores them afterwards.
//! - [`Fetcher`] retrieves the new application tree into a disposable staging
//!   directory ([`GitFetcher`] does a shallow `git clone`).
//! - [`TreeReplacer`] removes the old tree, sparing the snapshot, and copies the
//!   staging tree into place.
//! - [`Orchestrator`] runs the [`Step`]s in order and stops at the first
//!   failure, leaving the snapshot behind for manual recovery.
//!
//! External programs (Git, the package installer) and the operator
//! confirmation sit behind the [`Fetcher`], [`Installer`] and [`Confirmer`]
//! traits. Progress flows through a [`Reporter`] channel to whatever display
//! is attached.
//!
//! # Examples
//!
//! ```rust,no_run
//! use apup::config::UpdateConfig;
//! use apup::update::{CommandInstaller, CountdownConfirmer, GitFetcher, Orchestrator};
//! use std::path::Path;
//!
//! # async fn example() {
//! let config = UpdateConfig::default();
//! let layout = config.resolve_layout(Path::new("/srv/app"));
//! let orchestrator = Orchestrator::new(
//!     layout.clone(),
//!     &config.workflow,
//!     GitFetcher::new(&config.source, layout.excluded_files.clone()),
//!     CommandInstaller::new(config.install.clone()),
//!     CountdownConfirmer::new(config.workflow.countdown_secs),
//! );
//! let report = orchestrator.run().await;
//! std::process::exit(report.exit_code());
//! # }
//! ```

pub mod confirm;
pub mod fetcher;
pub mod installer;
pub mod orchestrator;
pub mod progress;
pub mod replacer;
pub mod revision;
pub mod snapshot;
pub mod steps;

pub use confirm::{AssumeYes, Confirmer, CountdownConfirmer};
pub use fetcher::{Diagnosis, Fetcher, GitFetcher, probe_reachability};
pub use installer::{CommandInstaller, Installer};
pub use orchestrator::{Orchestrator, Outcome, WorkflowReport};
pub use progress::{ProgressEvent, Reporter, with_heartbeat};
pub use replacer::TreeReplacer;
pub use revision::{RevisionRecord, record_revision};
pub use snapshot::{Snapshot, SnapshotInfo, SnapshotStore};
pub use steps::{Step, WorkflowState};
