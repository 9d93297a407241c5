//! Error types for sync operations

use lnwallet_net::RoutingPolicyViolation;

/// Result type
pub type Result<T> = std::result::Result<T, SyncError>;

/// Sync errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Network failure or timeout; retry with backoff
    #[error("Transient sync failure: {0}")]
    Transient(String),

    /// Engine-reported corruption or incompatibility; sync halts
    #[error("Fatal sync failure: {0}")]
    Fatal(String),

    /// Engine endpoint requires Tor but the proxy is unavailable
    #[error(transparent)]
    RoutingPolicy(#[from] RoutingPolicyViolation),

    /// Operation cancelled
    #[error("Cancelled")]
    Cancelled,
}

impl SyncError {
    /// Only transient failures are retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transient(_))
    }

    /// Whether this error halts synchronisation
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Fatal(_))
    }
}

impl From<lnwallet_core::Error> for SyncError {
    fn from(e: lnwallet_core::Error) -> Self {
        SyncError::Fatal(format!("Incompatible engine data: {}", e))
    }
}
