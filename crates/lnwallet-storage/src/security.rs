//! Record encryption primitives
//!
//! ChaCha20-Poly1305 under a random 256-bit data key. Ciphertext layout:
//! `[version(1)][algorithm(1)][nonce(12)][ciphertext+tag]`.

use crate::SealError;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

const CIPHERTEXT_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 2 + NONCE_LEN;

/// Encryption algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    /// ChaCha20-Poly1305
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl EncryptionAlgorithm {
    fn tag(self) -> u8 {
        match self {
            EncryptionAlgorithm::ChaCha20Poly1305 => 1,
        }
    }
}

/// Symmetric key protecting one secret record
#[derive(Clone)]
pub struct DataKey {
    key: Zeroizing<[u8; 32]>,
    algorithm: EncryptionAlgorithm,
}

impl DataKey {
    /// Generate new random key
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut key[..]);
        Self {
            key,
            algorithm: EncryptionAlgorithm::ChaCha20Poly1305,
        }
    }

    /// Create from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SealError> {
        if bytes.len() != 32 {
            return Err(SealError::Failed("Invalid key length".to_string()));
        }
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(bytes);
        Ok(Self {
            key,
            algorithm: EncryptionAlgorithm::ChaCha20Poly1305,
        })
    }

    /// Get key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Algorithm this key is used with
    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    /// Encrypt data
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, String> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key[..]));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| e.to_string())?;

        let mut result = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        result.push(CIPHERTEXT_VERSION);
        result.push(self.algorithm.tag());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt data; any header or tag mismatch is an error
    pub fn decrypt(&self, data: &[u8]) -> Result<Zeroizing<Vec<u8>>, String> {
        if data.len() < HEADER_LEN {
            return Err("Invalid ciphertext length".to_string());
        }
        if data[0] != CIPHERTEXT_VERSION {
            return Err(format!("Unsupported encryption version: {}", data[0]));
        }
        if data[1] != self.algorithm.tag() {
            return Err(format!("Algorithm mismatch: got {}", data[1]));
        }

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key[..]));
        let nonce = Nonce::from_slice(&data[2..HEADER_LEN]);
        cipher
            .decrypt(nonce, &data[HEADER_LEN..])
            .map(Zeroizing::new)
            .map_err(|e| e.to_string())
    }
}

/// Data key wrapped by the platform keystore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKey {
    /// Keystore alias the key was sealed under
    pub key_id: String,
    /// Algorithm of the wrapped data key
    pub algorithm: EncryptionAlgorithm,
    /// Opaque sealed bytes
    #[serde(with = "crate::record::base64_bytes")]
    pub sealed: Vec<u8>,
}

impl SealedKey {
    /// Create new sealed key
    pub fn new(sealed: Vec<u8>, key_id: String, algorithm: EncryptionAlgorithm) -> Self {
        Self {
            key_id,
            algorithm,
            sealed,
        }
    }
}
