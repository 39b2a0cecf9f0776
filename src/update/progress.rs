//! Cooperative progress reporting.
//!
//! Workflow operations never draw anything themselves. They emit
//! [`ProgressEvent`]s through a [`Reporter`], and a display task on the other
//! end of the channel turns them into terminal output (see
//! [`crate::utils::progress::spawn_renderer`]).
//!
//! Long-running external operations are wrapped in [`with_heartbeat`], which
//! emits periodic [`ProgressEvent::Heartbeat`]s while the operation is pending
//! and stops as soon as its result is available. There are no detached timers:
//! when the wrapped future resolves, ticking has already ended.

use std::future::Future;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::constants::HEARTBEAT_INTERVAL;
use crate::update::Step;

/// A progress update emitted by the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A workflow step started (`index` is 1-based).
    StepStarted {
        /// The step
        step: Step,
        /// Position of the step in the sequence
        index: usize,
        /// Total number of steps
        total: usize,
    },
    /// A workflow step finished successfully.
    StepCompleted {
        /// The step
        step: Step,
    },
    /// Seconds left in the confirmation countdown.
    Countdown {
        /// Remaining seconds
        remaining: u64,
    },
    /// An indeterminate operation started.
    ActivityStarted {
        /// What is running
        label: String,
    },
    /// The indeterminate operation is still running.
    Heartbeat,
    /// The indeterminate operation finished (successfully or not).
    ActivityFinished {
        /// What was running
        label: String,
    },
    /// Top-level entries copied so far during apply.
    EntriesCopied {
        /// Entries done
        copied: usize,
        /// Entries in total
        total: usize,
    },
    /// Free-form status line.
    Message(String),
}

/// Sending half of the progress channel.
///
/// Cloning is cheap. A silent reporter drops every event, which is what tests
/// and `--quiet` runs use. Send failures (display task gone) are ignored.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    sender: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl Reporter {
    /// Creates a reporter and the receiver the display layer consumes.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: Some(tx) }, rx)
    }

    /// Creates a reporter that discards events.
    #[must_use]
    pub const fn silent() -> Self {
        Self { sender: None }
    }

    /// Emits an event.
    pub fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.sender {
            let _ = tx.send(event);
        }
    }

    /// Emits a free-form status line.
    pub fn message(&self, msg: impl Into<String>) {
        self.send(ProgressEvent::Message(msg.into()));
    }
}

/// Runs `operation` to completion, emitting heartbeats while it is pending.
///
/// The event sequence is always `ActivityStarted`, zero or more `Heartbeat`s,
/// then `ActivityFinished`, and the last event is sent before this function
/// returns.
pub async fn with_heartbeat<F, T>(reporter: &Reporter, label: impl Into<String>, operation: F) -> T
where
    F: Future<Output = T>,
{
    let label = label.into();
    reporter.send(ProgressEvent::ActivityStarted {
        label: label.clone(),
    });

    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    ticker.tick().await;

    tokio::pin!(operation);
    let result = loop {
        tokio::select! {
            biased;
            output = &mut operation => break output,
            _ = ticker.tick() => reporter.send(ProgressEvent::Heartbeat),
        }
    };

    reporter.send(ProgressEvent::ActivityFinished { label });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_heartbeat_brackets_operation() {
        let (reporter, mut rx) = Reporter::channel();

        let value = with_heartbeat(&reporter, "cloning", async {
            tokio::time::sleep(HEARTBEAT_INTERVAL * 3).await;
            42
        })
        .await;
        assert_eq!(value, 42);

        let events = drain(&mut rx);
        assert_eq!(
            events.first(),
            Some(&ProgressEvent::ActivityStarted {
                label: "cloning".to_string()
            })
        );
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::ActivityFinished {
                label: "cloning".to_string()
            })
        );
        assert!(events.iter().any(|e| *e == ProgressEvent::Heartbeat));
    }

    #[tokio::test]
    async fn test_no_heartbeat_after_completion() {
        let (reporter, mut rx) = Reporter::channel();

        with_heartbeat(&reporter, "fast", async {}).await;
        drain(&mut rx);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(drain(&mut rx).is_empty(), "ticking must stop with the operation");
    }

    #[test]
    fn test_silent_reporter_drops_events() {
        let reporter = Reporter::silent();
        reporter.message("nobody listens");
    }
}
