//! Unified error handling for the route-recorder library.
//!
//! This module provides a consistent error type for all recorder operations.
//! Note that an unsupported state transition is deliberately NOT an error:
//! the state machine is driven by an interactive UI, so invalid transitions
//! are silent no-ops (robustness over strictness).

use thiserror::Error;

/// Unified error type for route-recorder operations.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The geolocation source could not be subscribed to (permission denied,
    /// hardware absent). `start()` is refused and state is unchanged.
    #[error("geolocation source unavailable: {message}")]
    SourceUnavailable { message: String },

    /// A sample append to the local store failed. Non-fatal: sampling
    /// continues, the failure is surfaced as a warning.
    #[error("local storage write failed: {0}")]
    StorageWrite(#[from] rusqlite::Error),

    /// Save was attempted with zero stored samples for the session.
    /// Refused with no mutation: an empty Route is never created.
    #[error("session '{session_id}' has no stored samples, refusing to save")]
    EmptySession { session_id: String },

    /// The remote repository rejected the save or was unreachable.
    /// Local samples are retained and the save can be retried.
    #[error("remote persistence failed: {message}")]
    Persistence { message: String },
}

impl RecorderError {
    /// Whether the caller can usefully retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RecorderError::Persistence { .. } | RecorderError::StorageWrite(_)
        )
    }

    /// Build a `SourceUnavailable` error.
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        RecorderError::SourceUnavailable {
            message: message.into(),
        }
    }

    /// Build a `Persistence` error.
    pub fn persistence(message: impl Into<String>) -> Self {
        RecorderError::Persistence {
            message: message.into(),
        }
    }
}

/// Result type alias for route-recorder operations.
pub type Result<T> = std::result::Result<T, RecorderError>;
