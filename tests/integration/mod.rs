//! Integration test suite for apup
//!
//! End-to-end tests of the update workflow against temporary application
//! directories, using the fakes from `apup::test_utils` in place of `git` and
//! the package installer, plus CLI tests that run the real binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **snapshot**: snapshot creation, skipping and restore round-trips
//! - **clean**: clean-step exclusions and the user-data sharp edge
//! - **fetch**: fetch isolation and real shallow clones from local repositories
//! - **workflow**: step ordering, aborts, cancellation and the full scenario
//! - **cli**: the `apup` binary

mod clean;
mod cli;
mod fetch;
mod snapshot;
mod workflow;
