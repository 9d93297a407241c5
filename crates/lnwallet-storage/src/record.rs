//! Persisted form of the recovery phrase

use crate::security::SealedKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current record schema
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Encrypted recovery phrase plus metadata, stored as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Schema version
    pub schema_version: u32,
    /// When the record was first written
    pub created_at: DateTime<Utc>,
    /// Data key sealed by the platform keystore
    pub sealed_key: SealedKey,
    /// Phrase ciphertext under the data key
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

/// Record metadata readable without decryption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordMetadata {
    /// Schema version
    pub schema_version: u32,
    /// When the record was first written
    pub created_at: DateTime<Utc>,
}

impl SecretRecord {
    /// Serialize for the secure storage backend
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse bytes read from the backend
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Metadata view
    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            schema_version: self.schema_version,
            created_at: self.created_at,
        }
    }
}

/// Serde adapter storing byte vectors as standard base64 strings
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
