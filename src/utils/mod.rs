//! Utility modules: file system helpers, platform helpers and the progress
//! display layer.

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{copy_dir, copy_path, ensure_dir, ensure_parent_dir, remove_path};
pub use platform::{command_exists, get_git_command, is_windows, paths_equal, resolve_path};
pub use progress::{ProgressBar, spawn_renderer};
