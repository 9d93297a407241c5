//! Encrypted recovery phrase store
//!
//! Every operation takes the store mutex, so `is_initialized`, `store`,
//! `retrieve` and `wipe` always observe a consistent record even when called
//! from concurrent UI flows.

use crate::keystore::KeySealer;
use crate::record::{RecordMetadata, SecretRecord, RECORD_SCHEMA_VERSION};
use crate::secure_storage::SecureStorage;
use crate::security::DataKey;
use crate::{BackendError, RetrieveError, StoreError, WipeError};
use chrono::Utc;
use lnwallet_core::{RecoveryPhrase, RecoveryPhraseManager};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Fixed secure-storage key of the wallet secret
pub const SECRET_STORAGE_KEY: &str = "lnwallet.recovery_phrase.v1";

const RESET_CODE_LEN: usize = 6;
const RESET_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Random code the user must type back before a wipe is allowed
#[derive(Debug)]
pub struct ResetChallenge {
    code: String,
}

impl ResetChallenge {
    fn new() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..RESET_CODE_LEN)
            .map(|_| RESET_CODE_ALPHABET[rng.gen_range(0..RESET_CODE_ALPHABET.len())] as char)
            .collect();
        Self { code }
    }

    /// Code to display
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Check the typed code (surrounding whitespace and case are ignored)
    pub fn confirm(self, typed: &str) -> Result<ResetAuthorization, WipeError> {
        if typed.trim().eq_ignore_ascii_case(&self.code) {
            Ok(ResetAuthorization { _private: () })
        } else {
            Err(WipeError::ConfirmationMismatch)
        }
    }
}

/// Proof that the reset confirmation step succeeded.
///
/// Only [`ResetChallenge::confirm`] can mint one, and [`SecretStore::wipe`]
/// consumes it.
#[derive(Debug)]
pub struct ResetAuthorization {
    _private: (),
}

/// Single-record encrypted store for the recovery phrase
pub struct SecretStore {
    storage: Arc<dyn SecureStorage>,
    sealer: Arc<dyn KeySealer>,
    lock: Mutex<()>,
}

impl SecretStore {
    /// Create a store over the given backends
    pub fn new(storage: Arc<dyn SecureStorage>, sealer: Arc<dyn KeySealer>) -> Self {
        Self {
            storage,
            sealer,
            lock: Mutex::new(()),
        }
    }

    /// Whether a record exists. Never decrypts.
    pub fn is_initialized(&self) -> bool {
        let _guard = self.lock.lock();
        self.storage.exists(SECRET_STORAGE_KEY)
    }

    /// Encrypt and persist `phrase`.
    ///
    /// Fails with [`StoreError::AlreadyInitialized`] if a record exists; the
    /// existing record is left untouched.
    pub fn store(&self, phrase: &RecoveryPhrase) -> Result<(), StoreError> {
        let _guard = self.lock.lock();

        if self.storage.exists(SECRET_STORAGE_KEY) {
            tracing::warn!("Refusing to overwrite existing wallet secret");
            return Err(StoreError::AlreadyInitialized);
        }

        let data_key = DataKey::generate();
        let plaintext = phrase.to_phrase_string();
        let ciphertext = data_key
            .encrypt(plaintext.as_bytes())
            .map_err(StoreError::PersistenceFailure)?;
        let sealed_key = self
            .sealer
            .seal(&data_key, SECRET_STORAGE_KEY)
            .map_err(|e| StoreError::PersistenceFailure(e.to_string()))?;

        let record = SecretRecord {
            schema_version: RECORD_SCHEMA_VERSION,
            created_at: Utc::now(),
            sealed_key,
            ciphertext,
        };
        let bytes = record
            .to_bytes()
            .map_err(|e| StoreError::PersistenceFailure(e.to_string()))?;

        self.storage.write(SECRET_STORAGE_KEY, &bytes).map_err(|e| {
            tracing::error!("Failed to write wallet secret: {}", e);
            StoreError::PersistenceFailure(e.to_string())
        })?;

        tracing::info!(
            schema_version = RECORD_SCHEMA_VERSION,
            "Wallet secret stored"
        );
        Ok(())
    }

    /// Decrypt and return the stored phrase.
    ///
    /// A record that cannot be decrypted is reported as
    /// [`RetrieveError::DecryptionFailure`] and stays in place.
    pub fn retrieve(&self) -> Result<RecoveryPhrase, RetrieveError> {
        let _guard = self.lock.lock();

        let record = self.read_record()?;
        if record.schema_version != RECORD_SCHEMA_VERSION {
            return Err(decryption_failure(format!(
                "unsupported schema version {}",
                record.schema_version
            )));
        }

        let data_key = self
            .sealer
            .unseal(&record.sealed_key)
            .map_err(|e| decryption_failure(e.to_string()))?;
        let plaintext = data_key
            .decrypt(&record.ciphertext)
            .map_err(decryption_failure)?;
        let text = Zeroizing::new(
            String::from_utf8(plaintext.to_vec())
                .map_err(|_| decryption_failure("record is not valid UTF-8".to_string()))?,
        );

        RecoveryPhraseManager::parse(&text)
            .map_err(|e| decryption_failure(format!("stored phrase invalid: {}", e)))
    }

    /// Metadata of the stored record, `None` when uninitialized
    pub fn record_metadata(&self) -> Result<Option<RecordMetadata>, RetrieveError> {
        let _guard = self.lock.lock();
        match self.read_record() {
            Ok(record) => Ok(Some(record.metadata())),
            Err(RetrieveError::NotInitialized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Start the reset flow
    pub fn begin_reset(&self) -> ResetChallenge {
        tracing::info!("Wallet reset requested");
        ResetChallenge::new()
    }

    /// Irreversibly delete the record. Deleting a missing record succeeds.
    pub fn wipe(&self, _authorization: ResetAuthorization) -> Result<(), WipeError> {
        let _guard = self.lock.lock();

        self.storage.delete(SECRET_STORAGE_KEY).map_err(|e| {
            tracing::error!("Failed to wipe wallet secret: {}", e);
            WipeError::PersistenceFailure(e.to_string())
        })?;

        // The record is gone; a leftover keystore entry only wraps a key for
        // ciphertext that no longer exists.
        if let Err(e) = self.sealer.delete(SECRET_STORAGE_KEY) {
            tracing::warn!("Failed to delete keystore entry: {}", e);
        }

        tracing::info!("Wallet secret wiped");
        Ok(())
    }

    fn read_record(&self) -> Result<SecretRecord, RetrieveError> {
        let bytes = match self.storage.read(SECRET_STORAGE_KEY) {
            Ok(bytes) => bytes,
            Err(BackendError::NotFound) => return Err(RetrieveError::NotInitialized),
            Err(e) => {
                tracing::error!("Failed to read wallet secret: {}", e);
                return Err(RetrieveError::PersistenceFailure(e.to_string()));
            }
        };
        SecretRecord::from_bytes(&bytes)
            .map_err(|e| decryption_failure(format!("corrupt record: {}", e)))
    }
}

fn decryption_failure(reason: String) -> RetrieveError {
    tracing::error!("Wallet secret could not be decrypted: {}", reason);
    RetrieveError::DecryptionFailure(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemorySecureStorage, MockKeySealer};

    fn phrase() -> RecoveryPhrase {
        RecoveryPhrase::from_entropy(&[0u8; 32]).unwrap()
    }

    #[test]
    fn test_reset_code_shape() {
        let challenge = ResetChallenge::new();
        assert_eq!(challenge.code().len(), RESET_CODE_LEN);
        assert!(challenge
            .code()
            .bytes()
            .all(|b| RESET_CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_reset_confirm() {
        let challenge = ResetChallenge::new();
        let typed = format!("  {}  ", challenge.code().to_lowercase());
        assert!(challenge.confirm(&typed).is_ok());

        let challenge = ResetChallenge::new();
        assert!(matches!(
            challenge.confirm("wrong!"),
            Err(WipeError::ConfirmationMismatch)
        ));
    }

    #[test]
    fn test_unsupported_schema_is_decryption_failure() {
        let storage = Arc::new(InMemorySecureStorage::new());
        let store = SecretStore::new(storage.clone(), Arc::new(MockKeySealer::new()));
        store.store(&phrase()).unwrap();

        let mut record =
            SecretRecord::from_bytes(&storage.read(SECRET_STORAGE_KEY).unwrap()).unwrap();
        record.schema_version = 99;
        storage.put_raw(SECRET_STORAGE_KEY, record.to_bytes().unwrap());

        assert!(matches!(
            store.retrieve(),
            Err(RetrieveError::DecryptionFailure(_))
        ));
        assert!(store.is_initialized());
    }

    #[test]
    fn test_metadata_without_decrypting() {
        let sealer = Arc::new(MockKeySealer::new());
        let store = SecretStore::new(Arc::new(InMemorySecureStorage::new()), sealer.clone());
        assert_eq!(store.record_metadata().unwrap(), None);

        store.store(&phrase()).unwrap();
        sealer.invalidate();

        let metadata = store.record_metadata().unwrap().unwrap();
        assert_eq!(metadata.schema_version, RECORD_SCHEMA_VERSION);
    }
}
