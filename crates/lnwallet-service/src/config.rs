//! Wallet configuration
//!
//! JSON file, then `LNWALLET_*` environment overrides, then validation.
//! Durations are stored as milliseconds.

use crate::{Error, Result};
use lnwallet_core::{DEFAULT_CHALLENGE_WORDS, PHRASE_WORD_COUNT};
use lnwallet_net::ProxySettings;
use lnwallet_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Overrides `proxy.default_socks_port`
pub const ENV_SOCKS_PORT: &str = "LNWALLET_SOCKS_PORT";
/// Overrides `sync.request_timeout` (seconds)
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "LNWALLET_REQUEST_TIMEOUT_SECS";
/// Overrides `sync.engine_endpoint`
pub const ENV_ENGINE_ENDPOINT: &str = "LNWALLET_ENGINE_ENDPOINT";

/// Onboarding settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingConfig {
    /// Words the user must replay to confirm the backup
    pub challenge_words: usize,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            challenge_words: DEFAULT_CHALLENGE_WORDS,
        }
    }
}

/// Wallet configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Local Tor proxy
    pub proxy: ProxySettings,
    /// Engine synchronisation
    pub sync: SyncConfig,
    /// First-run setup
    pub onboarding: OnboardingConfig,
}

impl WalletConfig {
    /// Parse from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Load from a JSON file, apply environment overrides and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        tracing::info!("Loaded wallet config from {}", path.display());
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Cannot serialize config: {}", e)))
    }

    /// Apply `LNWALLET_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_SOCKS_PORT) {
            self.proxy.default_socks_port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a port: {}", ENV_SOCKS_PORT, port)))?;
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} is not a number of seconds: {}",
                    ENV_REQUEST_TIMEOUT_SECS, secs
                ))
            })?;
            self.sync.request_timeout = Duration::from_secs(secs);
        }
        if let Some(endpoint) = lookup(ENV_ENGINE_ENDPOINT) {
            let endpoint = endpoint.trim();
            self.sync.engine_endpoint = (!endpoint.is_empty()).then(|| endpoint.to_string());
        }
        Ok(())
    }

    /// Reject settings that would break an invariant
    pub fn validate(&self) -> Result<()> {
        if self.sync.request_timeout.is_zero() {
            return Err(Error::Config("sync.request_timeout must be non-zero".to_string()));
        }
        if self.sync.retry.max_attempts == 0 {
            return Err(Error::Config("sync.retry.max_attempts must be at least 1".to_string()));
        }
        if self.sync.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config(
                "sync.retry.backoff_multiplier must be at least 1.0".to_string(),
            ));
        }
        if self.sync.page_size == 0 {
            return Err(Error::Config("sync.page_size must be non-zero".to_string()));
        }
        if !(1..=PHRASE_WORD_COUNT).contains(&self.onboarding.challenge_words) {
            return Err(Error::Config(format!(
                "onboarding.challenge_words must be between 1 and {}",
                PHRASE_WORD_COUNT
            )));
        }
        if self.proxy.socks_host.trim().is_empty() {
            return Err(Error::Config("proxy.socks_host must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = WalletConfig::default();
        config.validate().unwrap();
        assert_eq!(config.proxy.default_socks_port, 9050);
        assert_eq!(config.sync.request_timeout, Duration::from_secs(30));
        assert_eq!(config.onboarding.challenge_words, 3);
    }

    #[test]
    fn test_partial_json() {
        let config = WalletConfig::from_json(
            r#"{"sync": {"page_size": 50}, "onboarding": {"challenge_words": 4}}"#,
        )
        .unwrap();
        assert_eq!(config.sync.page_size, 50);
        assert_eq!(config.onboarding.challenge_words, 4);
        assert_eq!(config.proxy, ProxySettings::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = WalletConfig::default();
        assert_eq!(WalletConfig::from_json(&config.to_json().unwrap()).unwrap(), config);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SOCKS_PORT, "9150"),
            (ENV_REQUEST_TIMEOUT_SECS, "10"),
            (ENV_ENGINE_ENDPOINT, "https://node.example.com:8080"),
        ]
        .into_iter()
        .collect();

        let mut config = WalletConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.proxy.default_socks_port, 9150);
        assert_eq!(config.sync.request_timeout, Duration::from_secs(10));
        assert_eq!(
            config.sync.engine_endpoint.as_deref(),
            Some("https://node.example.com:8080")
        );
    }

    #[test]
    fn test_bad_override_rejected() {
        let mut config = WalletConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_SOCKS_PORT).then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = WalletConfig::default();
        config.sync.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = WalletConfig::default();
        config.sync.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = WalletConfig::default();
        config.onboarding.challenge_words = 25;
        assert!(config.validate().is_err());
        config.onboarding.challenge_words = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        std::fs::write(&path, r#"{"sync": {"request_timeout_ms": 5000}}"#).unwrap();

        let config = WalletConfig::load(&path).unwrap();
        // LNWALLET_REQUEST_TIMEOUT_SECS may be set in the environment
        if std::env::var(ENV_REQUEST_TIMEOUT_SECS).is_err() {
            assert_eq!(config.sync.request_timeout, Duration::from_secs(5));
        }

        assert!(matches!(
            WalletConfig::load(dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));
    }
}
