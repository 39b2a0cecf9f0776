//! `apup restore`: copy user data back from a snapshot.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use crate::cli::AppContext;
use crate::update::SnapshotStore;

/// Command to restore user data from an existing snapshot.
///
/// Only the configured user-data paths are copied; the snapshot is left in
/// place.
#[derive(Args, Debug)]
pub struct RestoreCommand {
    /// Snapshot directory (relative paths resolve against the application directory)
    snapshot: PathBuf,
}

impl RestoreCommand {
    /// Restores the snapshot onto the live tree.
    pub fn execute(self, context: &AppContext) -> Result<()> {
        let snapshot = context.resolve(&self.snapshot);
        let store = SnapshotStore::new(&context.layout);
        let restored = store.restore(&snapshot)?;

        println!(
            "{} Restored {} files from {}",
            "✓".green().bold(),
            restored,
            snapshot.display()
        );
        println!("  The snapshot was kept; remove it once you have checked the data.");
        Ok(())
    }
}
