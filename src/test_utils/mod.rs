//! Test utilities for apup
//!
//! Fixtures for application directories, fake collaborators for the update
//! workflow, and a Git helper for building source repositories.
//!
//! # Example
//!
//! ```rust,no_run
//! use apup::test_utils::{CallLog, FakeConfirmer, FakeFetcher, FakeInstaller, LiveTree};
//! use apup::update::Orchestrator;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let tree = LiveTree::installed()?;
//! let log = CallLog::new();
//! let report = Orchestrator::new(
//!     tree.layout(),
//!     &tree.config.workflow,
//!     FakeFetcher::with_files(&log, &[("index.js", "v2")]),
//!     FakeInstaller::succeeding(&log),
//!     FakeConfirmer::new(&log, true),
//! )
//! .run()
//! .await;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod fakes;
pub mod fixtures;
pub mod git_helper;

pub use fakes::{CallLog, FakeConfirmer, FakeFetcher, FakeInstaller};
pub use fixtures::LiveTree;
pub use git_helper::{TestGit, create_source_repo};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
