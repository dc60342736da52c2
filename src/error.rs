//! Error types for DhruvaRepeat

use std::time::Duration;

use thiserror::Error;

/// DhruvaRepeat error type.
///
/// Every variant is fatal at startup; nothing here is raised once the
/// replay loop is running.
#[derive(Error, Debug)]
pub enum RepeatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transform from '{source_frame}' to '{target_frame}' unavailable after {waited:?}")]
    TransformUnavailable {
        source_frame: String,
        target_frame: String,
        waited: Duration,
    },

    #[error("Thread error: {0}")]
    Thread(String),

    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl From<toml::de::Error> for RepeatError {
    fn from(e: toml::de::Error) -> Self {
        RepeatError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RepeatError>;

/// Failure of a single alignment call.
///
/// Recoverable: the replay loop answers it by switching playback to ERROR.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("Alignment service unreachable: {0}")]
    Unreachable(String),

    #[error("Alignment rejected: {0}")]
    Rejected(String),

    #[error("Alignment call took {elapsed:?} (limit {limit:?})")]
    TimedOut { elapsed: Duration, limit: Duration },

    #[error("Alignment call panicked: {0}")]
    Panicked(String),
}
