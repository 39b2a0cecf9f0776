//! `apup snapshots`: list leftover snapshots.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::cli::AppContext;
use crate::update::SnapshotStore;

/// Command to list snapshot directories, newest first.
#[derive(Args, Debug)]
pub struct SnapshotsCommand {}

impl SnapshotsCommand {
    /// Prints one line per snapshot.
    pub fn execute(self, context: &AppContext) -> Result<()> {
        let snapshots = SnapshotStore::new(&context.layout).list()?;

        if snapshots.is_empty() {
            println!("No snapshots found in {}", context.layout.snapshot_parent.display());
            return Ok(());
        }

        println!("{}", "Snapshots (newest first):".bold());
        for snapshot in snapshots {
            let created = snapshot
                .created
                .map_or_else(|| "unknown time".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());
            println!("  {}  {}", snapshot.name.cyan(), created.dimmed());
        }
        Ok(())
    }
}
