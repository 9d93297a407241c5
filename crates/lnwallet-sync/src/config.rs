//! Synchroniser configuration

use crate::RetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Synchroniser configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Bound on each engine call; expiry is a transient failure
    #[serde(with = "duration_ms", rename = "request_timeout_ms")]
    pub request_timeout: Duration,
    /// Backoff for the `*_with_retry` operations
    pub retry: RetryConfig,
    /// Payments requested per page
    pub page_size: u32,
    /// Engine endpoint; when set, each call is gated by the routing policy
    pub engine_endpoint: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            page_size: 25,
            engine_endpoint: None,
        }
    }
}

/// Serialize a `Duration` as integer milliseconds
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    /// Deserialize
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
