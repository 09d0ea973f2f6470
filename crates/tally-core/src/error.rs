//! Core error types.

use thiserror::Error;

/// Errors from counter and device/license operations.
///
/// Unknown device ids are not errors: enable, disable and delete skip them
/// and report them in the outcome instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The request needs more license slots than are currently free.
    #[error("insufficient license slots: requested {requested}, available {available}")]
    InsufficientCapacity {
        /// Licenses the request would consume.
        requested: usize,
        /// Licenses free when the request was checked.
        available: usize,
    },

    /// The critical section was cancelled before it completed.
    #[error("operation cancelled")]
    OperationCancelled,

    /// A license pool was configured with zero capacity.
    #[error("license capacity must be positive")]
    InvalidCapacity,
}

impl CoreError {
    /// Returns true if the same request may succeed when retried unchanged.
    ///
    /// Cancellation is transient. Capacity failures need a smaller request
    /// (or a prior disable/delete) before a retry can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::OperationCancelled => true,
            Self::InsufficientCapacity { .. } | Self::InvalidCapacity => false,
        }
    }
}
