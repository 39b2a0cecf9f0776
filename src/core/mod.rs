//! Core types shared by every part of apup.
//!
//! Currently this is the error taxonomy and its operator-facing rendering; see
//! [`error`] for details.

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};
