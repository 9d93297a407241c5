//! Top-level error handling
//!
//! Validation and routing failures are handled where they happen; persistence
//! and sync failures bubble up here, where [`Error::disposition`] decides
//! between retry, user notification and forced re-onboarding.

use crate::OnboardingError;
use lnwallet_core::ValidationError;
use lnwallet_net::RoutingPolicyViolation;
use lnwallet_storage::{RetrieveError, StoreError, WipeError};
use lnwallet_sync::SyncError;
use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet service errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed user input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Anonymization required but unavailable
    #[error(transparent)]
    Routing(#[from] RoutingPolicyViolation),

    /// Network setup or destination error
    #[error("Network error: {0}")]
    Network(String),

    /// Storing the recovery phrase failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading the recovery phrase failed
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),

    /// Wallet reset failed
    #[error(transparent)]
    Wipe(#[from] WipeError),

    /// Synchronisation failed
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Onboarding step failed
    #[error(transparent)]
    Onboarding(#[from] OnboardingError),

    /// Entropy or other core failure
    #[error(transparent)]
    Core(lnwallet_core::Error),

    /// Configuration invalid or unreadable
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lnwallet_core::Error> for Error {
    fn from(e: lnwallet_core::Error) -> Self {
        match e {
            lnwallet_core::Error::Validation(v) => Error::Validation(v),
            other => Error::Core(other),
        }
    }
}

impl From<lnwallet_net::Error> for Error {
    fn from(e: lnwallet_net::Error) -> Self {
        match e {
            lnwallet_net::Error::Policy(violation) => Error::Routing(violation),
            other => Error::Network(other.to_string()),
        }
    }
}

/// What the caller should do about an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Ask the user to correct their input
    Reprompt,
    /// Retry with backoff
    Retry,
    /// Tell the user; the operation cannot proceed
    NotifyUser,
    /// The wallet secret is gone or unreadable; restart onboarding from a backup
    Reonboard,
    /// Abort the enclosing operation
    Abort,
}

impl Error {
    /// How the top-level handler should react
    pub fn disposition(&self) -> Disposition {
        match self {
            Error::Validation(_) => Disposition::Reprompt,
            Error::Routing(_) => Disposition::Abort,
            Error::Network(_) => Disposition::NotifyUser,
            Error::Store(_) => Disposition::NotifyUser,
            Error::Retrieve(RetrieveError::NotInitialized)
            | Error::Retrieve(RetrieveError::DecryptionFailure(_)) => Disposition::Reonboard,
            Error::Retrieve(RetrieveError::PersistenceFailure(_)) => Disposition::NotifyUser,
            Error::Wipe(WipeError::ConfirmationMismatch) => Disposition::Reprompt,
            Error::Wipe(WipeError::PersistenceFailure(_)) => Disposition::NotifyUser,
            Error::Sync(SyncError::Transient(_)) => Disposition::Retry,
            Error::Sync(SyncError::Fatal(_)) => Disposition::NotifyUser,
            Error::Sync(SyncError::RoutingPolicy(_)) | Error::Sync(SyncError::Cancelled) => {
                Disposition::Abort
            }
            Error::Onboarding(e) => e.disposition(),
            Error::Core(_) | Error::Config(_) | Error::Io(_) => Disposition::NotifyUser,
        }
    }

    /// Check if error is caused by user input (vs internal error)
    pub fn is_user_error(&self) -> bool {
        self.disposition() == Disposition::Reprompt
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(e) => e.user_message(),
            Error::Routing(_) | Error::Sync(SyncError::RoutingPolicy(_)) => {
                "This connection requires Tor, but Tor is not running. Start Tor and try again."
                    .to_string()
            }
            Error::Retrieve(RetrieveError::DecryptionFailure(_)) => {
                "Your wallet can no longer be unlocked on this device, usually after a biometric or passcode change. Restore it from your recovery phrase backup.".to_string()
            }
            Error::Retrieve(RetrieveError::NotInitialized) => {
                "No wallet found on this device. Create a new wallet or restore from your recovery phrase.".to_string()
            }
            Error::Store(StoreError::AlreadyInitialized) => {
                "A wallet already exists on this device. Reset it before creating or restoring another.".to_string()
            }
            Error::Store(StoreError::PersistenceFailure(_))
            | Error::Retrieve(RetrieveError::PersistenceFailure(_))
            | Error::Wipe(WipeError::PersistenceFailure(_)) => {
                "Secure storage is unavailable. Check that a device passcode is set and try again.".to_string()
            }
            Error::Wipe(WipeError::ConfirmationMismatch) => {
                "The confirmation code does not match. Please type it exactly as shown.".to_string()
            }
            Error::Sync(SyncError::Transient(_)) => {
                "Unable to reach your node. Please check your connection and try again.".to_string()
            }
            Error::Sync(SyncError::Fatal(_)) => {
                "Your node reported data this wallet cannot use. Syncing has stopped; please reconnect or update the app.".to_string()
            }
            Error::Onboarding(e) => e.user_message(),
            _ => self.to_string(),
        }
    }

    /// Get error category for logging/metrics
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation(_) => ErrorCategory::Validation,
            Error::Routing(_) | Error::Network(_) | Error::Sync(SyncError::RoutingPolicy(_)) => {
                ErrorCategory::Network
            }
            Error::Store(_) | Error::Retrieve(_) | Error::Wipe(_) => ErrorCategory::Persistence,
            Error::Sync(_) => ErrorCategory::Sync,
            Error::Onboarding(_) => ErrorCategory::Onboarding,
            Error::Core(_) | Error::Config(_) | Error::Io(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input
    Validation,
    /// Routing and network setup
    Network,
    /// Secure storage
    Persistence,
    /// Engine synchronisation
    Sync,
    /// First-run setup
    Onboarding,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "Validation"),
            ErrorCategory::Network => write!(f, "Network"),
            ErrorCategory::Persistence => write!(f, "Persistence"),
            ErrorCategory::Sync => write!(f, "Sync"),
            ErrorCategory::Onboarding => write!(f, "Onboarding"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}
