//! Error handling for apup
//!
//! This module provides the error taxonomy of the update workflow and the
//! operator-facing rendering of those errors. The error system follows two
//! principles:
//! 1. **Strongly-typed errors** so the orchestrator can tell failure classes apart
//! 2. **Actionable messages** so the operator knows how to recover
//!
//! # Architecture
//!
//! - [`UpdateError`] - Enumerated failure cases for every workflow step
//! - [`ErrorContext`] - Wrapper adding details and a suggestion for display
//!
//! # Error Categories
//!
//! - **Prerequisites**: [`UpdateError::PrerequisiteMissing`]
//! - **Fetching**: [`UpdateError::GitCommandError`], [`UpdateError::GitCloneFailed`],
//!   [`UpdateError::FetchFailed`]
//! - **File system**: [`UpdateError::FileSystemError`], [`UpdateError::SnapshotNotFound`]
//! - **Dependencies**: [`UpdateError::InstallFailed`]
//! - **Configuration**: [`UpdateError::ConfigError`]
//!
//! Operator cancellation is deliberately not part of this enum: it is a normal
//! terminal state of the workflow, not a failure.
//!
//! # Examples
//!
//! ```rust,no_run
//! use apup::core::{UpdateError, user_friendly_error};
//!
//! let err = anyhow::Error::from(UpdateError::PrerequisiteMissing {
//!     tool: "git".to_string(),
//! });
//! let ctx = user_friendly_error(err);
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for apup operations.
///
/// Each variant maps to one failure class of the update workflow. Variants
/// carry the path, URL or command involved so the operator can act on the
/// message without reading logs.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// A required external tool is not installed or not on `PATH`.
    ///
    /// Raised by the prerequisite check before anything is touched on disk.
    #[error("Required tool '{tool}' is not installed or not found in PATH")]
    PrerequisiteMissing {
        /// Program name that could not be located
        tool: String,
    },

    /// A git command returned a non-zero exit code.
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g. "clone", "ls-remote")
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// `git clone` failed.
    #[error("Failed to clone repository: {url}")]
    GitCloneFailed {
        /// Repository URL that failed to clone
        url: String,
        /// Reason reported by git
        reason: String,
    },

    /// Fetching the new application tree failed.
    ///
    /// Carries the diagnosis produced by the reachability probe so the
    /// operator can tell a network outage from a configuration problem.
    #[error("Failed to fetch new version from {url}")]
    FetchFailed {
        /// Source URL
        url: String,
        /// Underlying failure
        reason: String,
        /// Result of the reachability diagnostic
        diagnosis: String,
    },

    /// A copy, delete or mkdir operation failed.
    #[error("File system error: {operation}")]
    FileSystemError {
        /// The file system operation that failed
        operation: String,
        /// Path where the error occurred
        path: String,
    },

    /// A snapshot directory given for restoration does not exist.
    #[error("Snapshot not found: {path}")]
    SnapshotNotFound {
        /// Snapshot location that was expected
        path: String,
    },

    /// The dependency installer exited unsuccessfully.
    #[error("Dependency installation failed: `{command}` exited with {status}")]
    InstallFailed {
        /// Full installer command line
        command: String,
        /// Exit status description (code or signal)
        status: String,
    },

    /// Network request failed.
    #[error("Network error: {operation}")]
    NetworkError {
        /// The network operation that failed
        operation: String,
        /// Reason for the failure
        reason: String,
    },

    /// Configuration file is invalid.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Error context wrapper that adds details and a suggestion to an [`UpdateError`].
///
/// Rendered by [`ErrorContext::display`] as:
/// - Error message: red and bold
/// - Details: yellow
/// - Suggestion: green
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no details or suggestion.
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with operator-facing guidance.
///
/// Typed [`UpdateError`]s anywhere in the `anyhow` chain are recognised first,
/// then raw IO errors. Anything else is reported with its full context chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    // Finds UpdateErrors attached with `.context(..)` as well as wrapped ones
    if let Some(update_error) = error.downcast_ref::<UpdateError>() {
        return create_error_context(update_error, &error);
    }

    for cause in error.chain() {
        if let Some(update_error) = cause.downcast_ref::<UpdateError>() {
            return create_error_context(update_error, &error);
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(UpdateError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_details(format!("{error:#}"))
                .with_suggestion("Check ownership of the application directory");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(UpdateError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_details(format!("{error:#}"))
                .with_suggestion("Check that the working directory is the application root");
            }
            _ => {}
        }
    }

    ErrorContext::new(UpdateError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: &UpdateError, chain: &anyhow::Error) -> ErrorContext {
    match error {
        UpdateError::PrerequisiteMissing { tool } => ErrorContext::new(
            UpdateError::PrerequisiteMissing { tool: tool.clone() },
        )
        .with_suggestion(format!("Install '{tool}' and make sure it is on your PATH")),
        UpdateError::GitCommandError { operation, stderr } => {
            ErrorContext::new(UpdateError::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            })
            .with_details(stderr.trim().to_string())
        }
        UpdateError::GitCloneFailed { url, reason } => ErrorContext::new(
            UpdateError::GitCloneFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
        )
        .with_details(reason.trim().to_string())
        .with_suggestion("Check the [source] url in apup.toml and your network connection"),
        UpdateError::FetchFailed { url, reason, diagnosis } => ErrorContext::new(
            UpdateError::FetchFailed {
                url: url.clone(),
                reason: reason.clone(),
                diagnosis: diagnosis.clone(),
            },
        )
        .with_details(reason.trim().to_string())
        .with_suggestion(diagnosis.clone()),
        UpdateError::FileSystemError { operation, path } => ErrorContext::new(
            UpdateError::FileSystemError {
                operation: operation.clone(),
                path: path.clone(),
            },
        )
        .with_details(format!("{chain:#}"))
        .with_suggestion("Check free disk space and permissions on the application directory"),
        UpdateError::SnapshotNotFound { path } => ErrorContext::new(
            UpdateError::SnapshotNotFound { path: path.clone() },
        )
        .with_suggestion("Run `apup snapshots` to list the snapshots left by previous runs"),
        UpdateError::InstallFailed { command, status } => ErrorContext::new(
            UpdateError::InstallFailed {
                command: command.clone(),
                status: status.clone(),
            },
        )
        .with_suggestion(format!("Run `{command}` manually to see the installer output")),
        UpdateError::NetworkError { operation, reason } => ErrorContext::new(
            UpdateError::NetworkError {
                operation: operation.clone(),
                reason: reason.clone(),
            },
        )
        .with_details(reason.clone()),
        UpdateError::ConfigError { message } => ErrorContext::new(UpdateError::ConfigError {
            message: message.clone(),
        })
        .with_details(format!("{chain:#}"))
        .with_suggestion("Fix the configuration file or remove it to use the defaults"),
        UpdateError::Other { message } => ErrorContext::new(UpdateError::Other {
            message: message.clone(),
        }),
    }
}
