//! Recovery phrase persistence
//!
//! Holds at most one encrypted recovery phrase per device profile behind the
//! platform's secure storage (Keychain, Android Keystore, libsecret, ...).
//!
//! ## Layout
//!
//! - **Secure storage boundary**: [`SecureStorage`] is the keychain-like
//!   facility (`exists`/`write`/`read`/`delete` on a single fixed key).
//! - **Key sealing boundary**: [`KeySealer`] wraps the per-record data key with
//!   a platform-held key that may be invalidated by a biometric or passcode
//!   change.
//! - **Record encryption**: ChaCha20-Poly1305 under a random 256-bit data key.
//! - **Store**: [`SecretStore`] serialises every operation and refuses to
//!   overwrite an existing record.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod keystore;
pub mod record;
pub mod secret_store;
pub mod secure_storage;
pub mod security;

pub use error::{BackendError, BackendResult, RetrieveError, StoreError, WipeError};
pub use keystore::{KeySealer, MockKeySealer, SealError};
pub use record::{RecordMetadata, SecretRecord, RECORD_SCHEMA_VERSION};
pub use secret_store::{ResetAuthorization, ResetChallenge, SecretStore, SECRET_STORAGE_KEY};
pub use secure_storage::{FileSecureStorage, InMemorySecureStorage, SecureStorage};
pub use security::{DataKey, EncryptionAlgorithm, SealedKey};
