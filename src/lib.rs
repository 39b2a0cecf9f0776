//! apup - in-place application updater
//!
//! apup updates a locally installed application from its Git repository while
//! keeping the user's data. It is a sequence of reversible file system
//! operations, any of which may fail partway: the workflow is built so that a
//! failure always leaves a snapshot of the user's data behind and tells the
//! operator where it is.
//!
//! # Architecture Overview
//!
//! An update runs these steps strictly in order:
//!
//! ```text
//! verify-prerequisites → confirm → snapshot → fetch → clean → apply
//!     → restore → install-dependencies → finalize
//! ```
//!
//! - The snapshot copies the user-data paths (`dados/database`,
//!   `dados/src/config.json`, `dados/midias` by default) into a timestamped
//!   directory.
//! - The fetch does a shallow clone into a staging directory.
//! - Clean and apply swap the old application for the new one; the snapshot
//!   is never touched.
//! - Restore puts the user data back over the new files.
//! - Finalize discards the snapshot, and only finalize does.
//!
//! # Core Modules
//!
//! - [`update`] - the workflow: snapshot store, fetcher, tree replacer,
//!   orchestrator, progress channel and revision record
//! - [`config`] - `apup.toml` loading and layout resolution
//! - [`core`] - error types and operator-facing error formatting
//! - [`git`] - Git command builder using the system `git` binary
//! - [`supervisor`] - runs the application for `apup start`
//! - [`cli`] - command-line interface
//! - [`utils`] - file system, platform and progress display helpers
//!
//! # Configuration (apup.toml)
//!
//! ```toml
//! [source]
//! url = "https://github.com/owner/app.git"
//!
//! [layout]
//! data_root = "dados"
//! backup_paths = ["database", "src/config.json", "midias"]
//!
//! [install]
//! program = "npm"
//! args = ["install"]
//! ```
//!
//! Every key is optional; see [`config::UpdateConfig`] for defaults.

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod git;
pub mod supervisor;
pub mod update;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
