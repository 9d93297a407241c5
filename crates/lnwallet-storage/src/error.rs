//! Error types
//!
//! `NotInitialized` and `AlreadyInitialized` are expected states a caller
//! branches on. `DecryptionFailure` and `PersistenceFailure` are unexpected and
//! must reach the user.

/// Failure reported by the secure storage backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// No item under the key
    #[error("Item not found")]
    NotFound,

    /// Device policy refused the operation
    #[error("Denied by device policy: {0}")]
    PolicyDenied(String),

    /// Key cannot name an item in this backend
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Any other backend failure
    #[error("Backend failure: {0}")]
    Io(String),
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            BackendError::NotFound
        } else if e.kind() == std::io::ErrorKind::PermissionDenied {
            BackendError::PolicyDenied(e.to_string())
        } else {
            BackendError::Io(e.to_string())
        }
    }
}

/// Backend result type
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// `SecretStore::store` errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record already exists; overwriting requires an explicit reset
    #[error("Wallet already initialized")]
    AlreadyInitialized,

    /// Encrypting or writing the record failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl StoreError {
    /// Expected state rather than a fault
    pub fn is_expected(&self) -> bool {
        matches!(self, StoreError::AlreadyInitialized)
    }
}

/// `SecretStore::retrieve` errors
#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    /// No record exists
    #[error("Wallet not initialized")]
    NotInitialized,

    /// The record exists but cannot be decrypted (for example the keychain
    /// entry was invalidated). Unrecoverable without an external backup; the
    /// record is left in place.
    #[error("Decryption failure: {0}")]
    DecryptionFailure(String),

    /// Reading from the backend failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl RetrieveError {
    /// Expected state rather than a fault
    pub fn is_expected(&self) -> bool {
        matches!(self, RetrieveError::NotInitialized)
    }
}

/// `SecretStore::wipe` errors
#[derive(Debug, thiserror::Error)]
pub enum WipeError {
    /// The typed confirmation did not match the reset challenge
    #[error("Reset confirmation mismatch")]
    ConfirmationMismatch,

    /// Deleting the record failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl WipeError {
    /// Expected state rather than a fault
    pub fn is_expected(&self) -> bool {
        matches!(self, WipeError::ConfirmationMismatch)
    }
}
