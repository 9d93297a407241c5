//! Platform keystore integration for data key sealing
//!
//! The platform side (Android Keystore, iOS/macOS Keychain with Secure
//! Enclave, DPAPI, libsecret) holds a device-bound wrapping key. Data keys are
//! sealed under it before they are written next to the ciphertext, so a copied
//! record is useless off-device. Enrolling a new fingerprint or changing the
//! passcode may invalidate the wrapping key; unsealing then fails with
//! [`SealError::Invalidated`].

use crate::security::{DataKey, SealedKey};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

/// Keystore failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SealError {
    /// The wrapping key no longer exists or no longer matches
    #[error("Keystore key invalidated")]
    Invalidated,

    /// User cancelled the authentication prompt
    #[error("Authentication cancelled")]
    Cancelled,

    /// Keystore not available on this platform
    #[error("Keystore not available")]
    NotAvailable,

    /// Any other keystore failure
    #[error("Keystore failure: {0}")]
    Failed(String),
}

/// Platform keystore abstraction
///
/// FFI implementations bridge to native platform code; [`MockKeySealer`]
/// stands in for tests and desktop development.
pub trait KeySealer: Send + Sync {
    /// Seal a data key under the platform wrapping key
    fn seal(&self, key: &DataKey, key_id: &str) -> Result<SealedKey, SealError>;

    /// Unseal a data key
    fn unseal(&self, sealed: &SealedKey) -> Result<DataKey, SealError>;

    /// Forget the wrapping key for `key_id`
    fn delete(&self, key_id: &str) -> Result<(), SealError>;
}

/// Software keystore holding its wrapping key in memory.
///
/// [`invalidate`](MockKeySealer::invalidate) rotates the wrapping key, which
/// reproduces what a biometric re-enrolment does to a real keychain item.
pub struct MockKeySealer {
    wrapping_key: RwLock<Zeroizing<[u8; 32]>>,
}

impl MockKeySealer {
    /// Create with a random wrapping key
    pub fn new() -> Self {
        Self {
            wrapping_key: RwLock::new(random_key()),
        }
    }

    /// Replace the wrapping key; previously sealed keys can no longer be unsealed
    pub fn invalidate(&self) {
        *self.wrapping_key.write() = random_key();
        tracing::debug!("Mock keystore wrapping key rotated");
    }
}

impl Default for MockKeySealer {
    fn default() -> Self {
        Self::new()
    }
}

fn random_key() -> Zeroizing<[u8; 32]> {
    let mut key = Zeroizing::new([0u8; 32]);
    OsRng.fill_bytes(&mut key[..]);
    key
}

impl KeySealer for MockKeySealer {
    fn seal(&self, key: &DataKey, key_id: &str) -> Result<SealedKey, SealError> {
        let wrapping_key = self.wrapping_key.read();
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&wrapping_key[..]));

        let mut nonce = [0u8; 12];
        OsRng.fill_bytes(&mut nonce);
        let wrapped = cipher
            .encrypt(Nonce::from_slice(&nonce), key.as_bytes().as_slice())
            .map_err(|e| SealError::Failed(e.to_string()))?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&wrapped);
        Ok(SealedKey::new(sealed, key_id.to_string(), key.algorithm()))
    }

    fn unseal(&self, sealed: &SealedKey) -> Result<DataKey, SealError> {
        if sealed.sealed.len() < 12 {
            return Err(SealError::Failed("Invalid sealed key data".to_string()));
        }
        let wrapping_key = self.wrapping_key.read();
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&wrapping_key[..]));

        let (nonce, wrapped) = sealed.sealed.split_at(12);
        let bytes = cipher
            .decrypt(Nonce::from_slice(nonce), wrapped)
            .map(Zeroizing::new)
            .map_err(|_| SealError::Invalidated)?;
        DataKey::from_bytes(&bytes)
    }

    fn delete(&self, _key_id: &str) -> Result<(), SealError> {
        Ok(())
    }
}
