//! `apup revision`: refresh the revision record.

use anyhow::Result;
use clap::Args;

use crate::cli::AppContext;
use crate::update::{RevisionRecord, record_revision};

/// Command to query the source for its commit count and write the record.
#[derive(Args, Debug)]
pub struct RevisionCommand {}

impl RevisionCommand {
    /// Writes the record and prints the count, with the change since the
    /// previous record when one exists.
    pub async fn execute(self, context: &AppContext) -> Result<()> {
        let path = &context.layout.revision_record;
        let previous = match RevisionRecord::load(path) {
            Ok(record) => record.and_then(|r| r.total),
            Err(e) => {
                tracing::warn!("Ignoring unreadable revision record: {e:#}");
                None
            }
        };
        let record = record_revision(&context.config.source, path).await?;

        match (record.total, previous) {
            (Some(total), Some(before)) if total > before => println!(
                "Source has {total} commits, {} since the last record (written to {})",
                total - before,
                path.display()
            ),
            (Some(total), _) => println!("Source has {total} commits (written to {})", path.display()),
            (None, _) => println!("Commit count unknown (written to {})", path.display()),
        }
        Ok(())
    }
}
