use thiserror::Error;

/// Errors surfaced by the time-entry synchronization core.
///
/// None of these are fatal: every variant leaves the component that produced
/// it in a state where the operation can be retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimesheetError {
    #[error("{0}")]
    Validation(String),
    #[error("remote service returned {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Parsing(String),
    #[error("timer already running")]
    TimerAlreadyRunning,
    #[error("no timer running")]
    NoTimerRunning,
    #[error("time entry not found: {0}")]
    EntryNotFound(String),
    #[error("all {attempted} entries failed, first error: {first_error}")]
    BatchFailed {
        attempted: usize,
        first_error: String,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

impl TimesheetError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
