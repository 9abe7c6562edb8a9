use std::time::Duration;
use thiserror::Error;

/// Classification of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FailureKind {
    /// The wrapped operation exceeded its configured deadline.
    Timeout,
    /// The wrapped operation itself returned an error.
    Operation,
}

/// Errors returned by [`CircuitBreaker::execute`](crate::CircuitBreaker::execute).
///
/// The breaker never swallows an operation failure; it only gates admission
/// and tracks state. `CircuitOpen` is synthesized by the breaker itself and
/// never originates from the wrapped operation, so callers can always tell
/// a fail-fast rejection apart from a genuine failure.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit rejected the call without invoking the operation.
    #[error("circuit '{name}' is open; retry after {retry_after:?}")]
    CircuitOpen {
        /// Name of the breaker (the channel name when used via a registry).
        name: String,
        /// Estimated wait until the next trial call will be admitted.
        retry_after: Duration,
    },

    /// The operation did not settle within the configured deadline.
    #[error("operation timed out after {elapsed:?}")]
    Timeout {
        /// How long the breaker waited before giving up.
        elapsed: Duration,
    },

    /// The underlying operation failed; the original cause is forwarded.
    #[error("operation failed: {0}")]
    Operation(E),
}

impl<E> BreakerError<E> {
    /// Returns true if this error is a fail-fast rejection.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, BreakerError::CircuitOpen { .. })
    }

    /// Returns true if this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BreakerError::Timeout { .. })
    }

    /// Returns the underlying operation error, if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the suggested wait before retrying, for fail-fast rejections.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BreakerError::CircuitOpen { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl<E> From<E> for BreakerError<E> {
    fn from(err: E) -> Self {
        BreakerError::Operation(err)
    }
}
