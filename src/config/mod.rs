//! Configuration for apup.
//!
//! The configuration lives in `apup.toml` at the root of the application
//! directory. Its location can be overridden with `--config <path>` or the
//! `APUP_CONFIG` environment variable. Every field has a default matching the
//! standard application layout, so a missing file is valid.
//!
//! [`UpdateConfig::resolve_layout`] turns the relative paths of the file into
//! a [`Layout`] bound to a concrete working directory; the workflow only ever
//! sees resolved layouts.

mod settings;

pub use settings::{
    BackupPath, CommandConfig, Layout, LayoutConfig, SourceConfig, UpdateConfig, WorkflowConfig,
};
