//! Session state for one synthesis run.

use std::path::PathBuf;

/// Outcome classification for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    /// No validation has completed yet.
    Pending,
    /// A validated candidate matched the reference table.
    Success,
    /// The most recent validation failed.
    Failed,
}

/// Mutable record for one synthesis session, owned by the session loop.
///
/// `attempt` is 1-indexed and moves forward only through [`RunState::record_failure`];
/// the syntax gate and successful validations never touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    /// Statement source/format key (e.g. `icici`).
    pub target: String,
    /// Input document to parse.
    pub document_path: PathBuf,
    /// Known-good table the candidate output is judged against.
    pub reference_path: PathBuf,
    /// Source of the most recently generated candidate.
    pub generated_code: String,
    pub status: ResultStatus,
    /// Text of the most recent failure, fed into the next generation prompt.
    pub last_error: Option<String>,
    /// Current attempt number (1-indexed, monotonically non-decreasing).
    pub attempt: u32,
}

impl RunState {
    pub fn new(
        target: impl Into<String>,
        document_path: impl Into<PathBuf>,
        reference_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            target: target.into(),
            document_path: document_path.into(),
            reference_path: reference_path.into(),
            generated_code: String::new(),
            status: ResultStatus::Pending,
            last_error: None,
            attempt: 1,
        }
    }

    /// Record a failed validation: replaces the previous error text and
    /// consumes exactly one attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.status = ResultStatus::Failed;
        self.last_error = Some(error.into());
        self.attempt += 1;
    }

    /// Record a passing validation. Leaves `last_error` and `attempt` as-is.
    pub fn record_success(&mut self) {
        self.status = ResultStatus::Success;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_pending_at_attempt_one() {
        let state = RunState::new("icici", "doc.pdf", "result.csv");
        assert_eq!(state.attempt, 1);
        assert_eq!(state.status, ResultStatus::Pending);
        assert_eq!(state.last_error, None);
        assert!(state.generated_code.is_empty());
    }

    /// Failures replace the error text and consume exactly one attempt each.
    #[test]
    fn record_failure_replaces_error_and_increments_once() {
        let mut state = RunState::new("icici", "doc.pdf", "result.csv");
        state.record_failure("first error");
        assert_eq!(state.attempt, 2);
        assert_eq!(state.last_error.as_deref(), Some("first error"));

        state.record_failure("second error");
        assert_eq!(state.attempt, 3);
        assert_eq!(state.last_error.as_deref(), Some("second error"));
        assert_eq!(state.status, ResultStatus::Failed);
    }

    #[test]
    fn record_success_preserves_attempt_and_error() {
        let mut state = RunState::new("icici", "doc.pdf", "result.csv");
        state.record_failure("boom");
        state.record_success();
        assert_eq!(state.status, ResultStatus::Success);
        assert_eq!(state.attempt, 2);
        assert_eq!(state.last_error.as_deref(), Some("boom"));
    }
}
