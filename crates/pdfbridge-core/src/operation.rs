//! Document operation state.
//!
//! A document runs at most one named operation at a time. An operation
//! moves `NotStarted -> Running` when begun and ends as `Completed` or
//! `Failed`; ended operations are never resumed.

use std::fmt;

/// Lifecycle state of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperationState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

impl OperationState {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_finished(self) -> bool {
        matches!(self, OperationState::Completed | OperationState::Failed)
    }
}

/// A named, undoable unit of document modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    name: String,
    state: OperationState,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: OperationState::NotStarted,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Move to `Running`; has no effect unless not yet started.
    pub fn start(&mut self) {
        if self.state == OperationState::NotStarted {
            self.state = OperationState::Running;
        }
    }

    /// Mark a running operation as failed.
    pub fn fail(&mut self) {
        if self.state == OperationState::Running {
            self.state = OperationState::Failed;
        }
    }

    /// Mark a running operation as completed.
    pub fn complete(&mut self) {
        if self.state == OperationState::Running {
            self.state = OperationState::Completed;
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.name, self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_completed() {
        let mut op = Operation::new("Filter");
        assert_eq!(op.state(), OperationState::NotStarted);
        op.start();
        assert_eq!(op.state(), OperationState::Running);
        op.complete();
        assert_eq!(op.state(), OperationState::Completed);
        assert!(op.state().is_finished());
    }

    #[test]
    fn finished_operation_does_not_change() {
        let mut op = Operation::new("Filter");
        op.start();
        op.fail();
        op.complete();
        op.start();
        assert_eq!(op.state(), OperationState::Failed);
    }

    #[test]
    fn cannot_complete_before_start() {
        let mut op = Operation::new("Filter");
        op.complete();
        assert_eq!(op.state(), OperationState::NotStarted);
        assert_eq!(op.to_string(), "Filter (NotStarted)");
    }
}
