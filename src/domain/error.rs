//! Domain error types.
//!
//! `InvalidState`, `InsufficientData` and `AlreadyFinished` are signaled
//! outcomes: the component that returns them is left in its prior state.
//! Everything else is fatal to the operation that produced it.

/// Top-level error type for replaytrader.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    #[error("invalid state for {operation}: {reason}")]
    InvalidState { operation: String, reason: String },

    #[error("insufficient data for {indicator}: have {have} points, need {need}")]
    InsufficientData {
        indicator: String,
        have: usize,
        need: usize,
    },

    #[error("playback already finished at index {index}")]
    AlreadyFinished { index: usize },

    #[error("out of range: {reason}")]
    OutOfRange { reason: String },

    #[error("invalid series: {reason}")]
    InvalidSeries { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("export error: {reason}")]
    Export { reason: String },

    #[error("io error: {0}")]
    Io(String),
}

impl ReplayError {
    pub fn invalid_state(operation: &str, reason: impl Into<String>) -> Self {
        ReplayError::InvalidState {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub fn out_of_range(reason: impl Into<String>) -> Self {
        ReplayError::OutOfRange {
            reason: reason.into(),
        }
    }

    /// Whether the error aborts the surrounding operation, as opposed to
    /// a rejected request that left everything untouched.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ReplayError::InvalidState { .. }
                | ReplayError::InsufficientData { .. }
                | ReplayError::AlreadyFinished { .. }
        )
    }
}

impl From<std::io::Error> for ReplayError {
    fn from(err: std::io::Error) -> Self {
        ReplayError::Io(err.to_string())
    }
}

impl From<&ReplayError> for std::process::ExitCode {
    fn from(err: &ReplayError) -> Self {
        let code: u8 = match err {
            ReplayError::Io(_) | ReplayError::Export { .. } => 1,
            ReplayError::ConfigParse { .. }
            | ReplayError::ConfigMissing { .. }
            | ReplayError::ConfigInvalid { .. } => 2,
            ReplayError::Data { .. }
            | ReplayError::InvalidSeries { .. }
            | ReplayError::InsufficientData { .. } => 3,
            ReplayError::OutOfRange { .. } => 4,
            ReplayError::InvalidState { .. } | ReplayError::AlreadyFinished { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signaled_outcomes_are_not_fatal() {
        assert!(!ReplayError::invalid_state("buy", "position open").is_fatal());
        assert!(!ReplayError::AlreadyFinished { index: 3 }.is_fatal());
        assert!(
            !ReplayError::InsufficientData {
                indicator: "RSI(14)".into(),
                have: 3,
                need: 15,
            }
            .is_fatal()
        );
    }

    #[test]
    fn configuration_errors_are_fatal() {
        assert!(ReplayError::out_of_range("step_size must be >= 1").is_fatal());
        assert!(
            ReplayError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            }
            .is_fatal()
        );
    }

    #[test]
    fn display_messages() {
        let err = ReplayError::invalid_state("close", "no open position");
        assert_eq!(err.to_string(), "invalid state for close: no open position");

        let err = ReplayError::AlreadyFinished { index: 9 };
        assert_eq!(err.to_string(), "playback already finished at index 9");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ReplayError = io.into();
        assert!(matches!(err, ReplayError::Io(ref msg) if msg.contains("gone")));
    }
}
