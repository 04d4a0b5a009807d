//! Error types for channel operations.

use thiserror::Error;

/// Errors produced by the channel itself.
///
/// Work failures never surface here: they travel unmodified inside
/// [`Outcome::Failure`](crate::core::Outcome::Failure).
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Configuration values were rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Task work panicked while running; carries the panic message.
    #[error("task panicked: {0}")]
    TaskPanicked(String),
    /// An environment variable could not be interpreted.
    #[error("environment error: {0}")]
    Env(String),
}

/// Result type returned by task work. Failures are carried as `anyhow::Error`
/// so callers can downcast back to their own error types.
pub type AppResult<T> = Result<T, anyhow::Error>;
