//! Workflow steps and the state that tracks them.

use std::fmt;

/// One named, strictly ordered unit of the update sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Check that every external tool the workflow needs is installed.
    VerifyPrerequisites,
    /// Last chance for the operator to abort before anything is modified.
    Confirm,
    /// Copy user data into a fresh snapshot.
    Snapshot,
    /// Clone the new application tree into the staging directory.
    Fetch,
    /// Remove the old application tree, sparing protected paths.
    Clean,
    /// Copy the staging tree onto the live tree.
    Apply,
    /// Copy user data back from the snapshot.
    Restore,
    /// Run the package installer.
    InstallDependencies,
    /// Discard the snapshot and report success.
    Finalize,
}

impl Step {
    /// Every step, in execution order.
    pub const ALL: [Step; 9] = [
        Step::VerifyPrerequisites,
        Step::Confirm,
        Step::Snapshot,
        Step::Fetch,
        Step::Clean,
        Step::Apply,
        Step::Restore,
        Step::InstallDependencies,
        Step::Finalize,
    ];

    /// Stable kebab-case identifier, used in logs and call-order records.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Step::VerifyPrerequisites => "verify-prerequisites",
            Step::Confirm => "confirm",
            Step::Snapshot => "snapshot",
            Step::Fetch => "fetch",
            Step::Clean => "clean",
            Step::Apply => "apply",
            Step::Restore => "restore",
            Step::InstallDependencies => "install-dependencies",
            Step::Finalize => "finalize",
        }
    }

    /// Operator-facing description shown when the step starts.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Step::VerifyPrerequisites => "Checking required tools",
            Step::Confirm => "Waiting for confirmation",
            Step::Snapshot => "Backing up user data",
            Step::Fetch => "Downloading the latest version",
            Step::Clean => "Removing old application files",
            Step::Apply => "Installing new application files",
            Step::Restore => "Restoring user data",
            Step::InstallDependencies => "Installing dependencies",
            Step::Finalize => "Finishing up",
        }
    }

    /// Whether the step modifies the live tree.
    #[must_use]
    pub const fn is_destructive(self) -> bool {
        matches!(self, Step::Clean | Step::Apply | Step::Restore | Step::InstallDependencies)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered step list with a completion counter.
///
/// Steps only ever advance forward; there is no way to rewind or retry.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    completed: usize,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowState {
    /// Creates a state positioned at the first step.
    #[must_use]
    pub const fn new() -> Self {
        Self { completed: 0 }
    }

    /// The step to execute next, or `None` once every step has completed.
    #[must_use]
    pub fn current(&self) -> Option<Step> {
        Step::ALL.get(self.completed).copied()
    }

    /// Marks the current step as done.
    pub fn advance(&mut self) {
        if self.completed < Step::ALL.len() {
            self.completed += 1;
        }
    }

    /// Number of completed steps.
    #[must_use]
    pub const fn completed_count(&self) -> usize {
        self.completed
    }

    /// Total number of steps.
    #[must_use]
    pub const fn total(&self) -> usize {
        Step::ALL.len()
    }

    /// Steps that finished successfully, in order.
    #[must_use]
    pub fn completed_steps(&self) -> &[Step] {
        &Step::ALL[..self.completed]
    }

    /// Whether every step has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completed == Step::ALL.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_are_ordered() {
        let names: Vec<_> = Step::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "verify-prerequisites",
                "confirm",
                "snapshot",
                "fetch",
                "clean",
                "apply",
                "restore",
                "install-dependencies",
                "finalize"
            ]
        );
    }

    #[test]
    fn test_workflow_state_advances_to_completion() {
        let mut state = WorkflowState::new();
        assert_eq!(state.current(), Some(Step::VerifyPrerequisites));

        for _ in 0..Step::ALL.len() {
            state.advance();
        }
        assert!(state.is_finished());
        assert_eq!(state.current(), None);
        assert_eq!(state.completed_steps().len(), 9);

        // Advancing past the end is a no-op
        state.advance();
        assert_eq!(state.completed_count(), 9);
    }

    #[test]
    fn test_nothing_before_clean_is_destructive() {
        let first_destructive = Step::ALL.iter().position(|s| s.is_destructive()).unwrap();
        assert_eq!(Step::ALL[first_destructive], Step::Clean);
    }
}
