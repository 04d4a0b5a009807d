//! Terminal result of a submitted task.

use serde::{Deserialize, Serialize};

/// Terminal result of exactly one task. Produced once per task and handed to
/// the submitter through its [`TaskHandle`](crate::core::TaskHandle).
#[derive(Debug)]
pub enum Outcome<T> {
    /// Work finished and produced a value.
    Success(T),
    /// Work returned an error or panicked. The error is passed through as-is.
    Failure(anyhow::Error),
    /// Task was removed from the run queue before it started.
    Cancelled,
}

/// Payload-free tag of an [`Outcome`], convenient for logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// See [`Outcome::Success`].
    Success,
    /// See [`Outcome::Failure`].
    Failure,
    /// See [`Outcome::Cancelled`].
    Cancelled,
}

impl<T> Outcome<T> {
    /// Tag of this outcome.
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::Failure(_) => OutcomeKind::Failure,
            Self::Cancelled => OutcomeKind::Cancelled,
        }
    }

    /// True for [`Outcome::Success`].
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// True for [`Outcome::Failure`].
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// True for [`Outcome::Cancelled`].
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Consume the outcome, keeping the success value if any.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow the failure error if any.
    pub const fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Failure(err) => Some(err),
            _ => None,
        }
    }

    /// Map the success payload, leaving failures and cancellations as they are.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(err) => Outcome::Failure(err),
            Self::Cancelled => Outcome::Cancelled,
        }
    }
}
