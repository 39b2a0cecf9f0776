use std::future::Future;
use std::time::Duration;

use crate::update::progress::{ProgressEvent, Reporter};

/// Gives the operator a last chance to back out before anything is modified.
///
/// Returns `true` to proceed. Interrupts are handled by the orchestrator, so a
/// confirmer only decides whether to go ahead.
pub trait Confirmer {
    /// Waits for the operator's decision.
    fn confirm(&self, reporter: &Reporter) -> impl Future<Output = bool> + Send;
}

/// Counts down for a fixed number of seconds, then proceeds.
///
/// Cancelling means pressing Ctrl+C during the countdown, which the
/// orchestrator observes as a shutdown signal.
#[derive(Debug, Clone, Copy)]
pub struct CountdownConfirmer {
    seconds: u64,
}

impl CountdownConfirmer {
    /// Creates a countdown of `seconds` seconds. Zero proceeds immediately.
    #[must_use]
    pub const fn new(seconds: u64) -> Self {
        Self { seconds }
    }
}

impl Confirmer for CountdownConfirmer {
    async fn confirm(&self, reporter: &Reporter) -> bool {
        for remaining in (1..=self.seconds).rev() {
            reporter.send(ProgressEvent::Countdown { remaining });
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        true
    }
}

/// Proceeds without waiting, for `--yes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    async fn confirm(&self, _reporter: &Reporter) -> bool {
        true
    }
}
