//! Progress indicators and terminal status lines.
//!
//! This is the display end of the progress channel: [`spawn_renderer`] consumes
//! [`ProgressEvent`]s and drives an `indicatif` spinner plus colored step lines.
//! Indicators are hidden with `--no-progress`, when `APUP_NO_PROGRESS` is set
//! or when stderr is not a terminal; step lines are still printed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use apup::update::Reporter;
//! use apup::utils::progress::spawn_renderer;
//!
//! # async fn example() {
//! let (reporter, rx) = Reporter::channel();
//! let renderer = spawn_renderer(rx, true);
//! reporter.message("hello");
//! drop(reporter);
//! renderer.await.ok();
//! # }
//! ```

use colored::Colorize;
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::io::IsTerminal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::constants::NO_PROGRESS_ENV_VAR;
use crate::update::ProgressEvent;

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV_VAR).is_ok() || !std::io::stderr().is_terminal()
}

/// Thin wrapper over an `indicatif` bar that respects the no-progress switch.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a spinner for work of unknown length.
    ///
    /// The spinner advances only when [`ProgressBar::tick`] is called; it has
    /// no timer of its own. A hidden bar is returned when `show` is false or
    /// progress is disabled for the process.
    pub fn new_spinner(show: bool) -> Self {
        let bar = if !show || is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar
        };
        Self { inner: bar }
    }

    /// Sets the message shown next to the spinner.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Advances the spinner by one frame.
    pub fn tick(&self) {
        self.inner.tick();
    }

    /// Prints a line above the spinner without breaking it.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.inner.is_hidden() {
            println!("{}", msg.as_ref());
        } else {
            self.inner.println(msg.as_ref());
        }
    }

    /// Removes the spinner from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
}

/// Spawns the display task. It ends when every [`crate::update::Reporter`]
/// clone has been dropped.
pub fn spawn_renderer(
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
    show_spinner: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut spinner: Option<ProgressBar> = None;

        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::StepStarted { step, index, total } => {
                    let line = format!(
                        "{} {}",
                        format!("[{index}/{total}]").bold().cyan(),
                        step.description()
                    );
                    print_line(spinner.as_ref(), &line);
                }
                ProgressEvent::StepCompleted { step } => {
                    tracing::debug!("Step {} completed", step);
                }
                ProgressEvent::Countdown { remaining } => {
                    let line = format!(
                        "  Starting in {}s... press Ctrl+C to cancel",
                        remaining.to_string().yellow().bold()
                    );
                    print_line(spinner.as_ref(), &line);
                }
                ProgressEvent::ActivityStarted { label } => {
                    let bar = ProgressBar::new_spinner(show_spinner);
                    bar.set_message(label);
                    bar.tick();
                    spinner = Some(bar);
                }
                ProgressEvent::Heartbeat => {
                    if let Some(bar) = &spinner {
                        bar.tick();
                    }
                }
                ProgressEvent::ActivityFinished { .. } => {
                    if let Some(bar) = spinner.take() {
                        bar.finish_and_clear();
                    }
                }
                ProgressEvent::EntriesCopied { copied, total } => {
                    let line = format!("  Copied {copied}/{total} entries");
                    print_line(spinner.as_ref(), &line.dimmed().to_string());
                }
                ProgressEvent::Message(msg) => {
                    print_line(spinner.as_ref(), &format!("  {msg}"));
                }
            }
        }

        if let Some(bar) = spinner.take() {
            bar.finish_and_clear();
        }
    })
}

fn print_line(spinner: Option<&ProgressBar>, line: &str) {
    match spinner {
        Some(bar) => bar.println(line),
        None => println!("{line}"),
    }
}
