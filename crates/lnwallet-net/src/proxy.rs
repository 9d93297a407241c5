//! Local Tor proxy service boundary

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the local SOCKS proxy listens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Host the proxy binds to
    pub socks_host: String,
    /// Port assumed when a running proxy reports port 0. Set to 0 to treat
    /// such a proxy as unavailable.
    pub default_socks_port: u16,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            socks_host: "127.0.0.1".to_string(),
            default_socks_port: 9050,
        }
    }
}

/// SOCKS endpoint of a running proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    /// Host
    pub host: String,
    /// Port
    pub port: u16,
}

impl ProxyEndpoint {
    /// Create endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Proxy URL with remote DNS resolution, so onion names never hit the
    /// local resolver
    pub fn socks_url(&self) -> String {
        format!("socks5h://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Platform proxy/Tor service (Orbot, bundled tor daemon, ...)
#[async_trait]
pub trait ProxyService: Send + Sync {
    /// Whether the proxy is running and accepting connections
    async fn is_running(&self) -> bool;

    /// Whether the proxy is installed (not necessarily running)
    async fn is_available(&self) -> bool;

    /// SOCKS port of the running proxy, 0 if unknown
    async fn socks_port(&self) -> u16;
}

/// Proxy state for UI hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyStatus {
    /// No proxy installed
    NotInstalled,
    /// Installed but not running
    Stopped,
    /// Running on the given SOCKS port
    Running(u16),
}

impl ProxyStatus {
    /// Snapshot the state of `service`
    pub async fn query(service: &dyn ProxyService) -> Self {
        if service.is_running().await {
            ProxyStatus::Running(service.socks_port().await)
        } else if service.is_available().await {
            ProxyStatus::Stopped
        } else {
            ProxyStatus::NotInstalled
        }
    }

    /// Usable for proxied connections
    pub fn is_usable(&self) -> bool {
        matches!(self, ProxyStatus::Running(port) if *port != 0)
    }
}

/// Proxy service reporting a settable fixed state.
///
/// Used by tests and the developer harness; also suits desktop setups where
/// a system tor daemon is managed outside the wallet.
#[derive(Debug)]
pub struct StaticProxyService {
    status: RwLock<ProxyStatus>,
}

impl StaticProxyService {
    /// Create with the given status
    pub fn new(status: ProxyStatus) -> Self {
        Self {
            status: RwLock::new(status),
        }
    }

    /// Running on `port`
    pub fn running(port: u16) -> Self {
        Self::new(ProxyStatus::Running(port))
    }

    /// Installed but stopped
    pub fn stopped() -> Self {
        Self::new(ProxyStatus::Stopped)
    }

    /// Change the reported status
    pub fn set_status(&self, status: ProxyStatus) {
        *self.status.write() = status;
    }
}

#[async_trait]
impl ProxyService for StaticProxyService {
    async fn is_running(&self) -> bool {
        matches!(*self.status.read(), ProxyStatus::Running(_))
    }

    async fn is_available(&self) -> bool {
        !matches!(*self.status.read(), ProxyStatus::NotInstalled)
    }

    async fn socks_port(&self) -> u16 {
        match *self.status.read() {
            ProxyStatus::Running(port) => port,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = ProxySettings::default();
        assert_eq!(settings.socks_host, "127.0.0.1");
        assert_eq!(settings.default_socks_port, 9050);
    }

    #[test]
    fn test_settings_partial_json() {
        let settings: ProxySettings =
            serde_json::from_str(r#"{"default_socks_port": 9150}"#).unwrap();
        assert_eq!(settings.socks_host, "127.0.0.1");
        assert_eq!(settings.default_socks_port, 9150);
    }

    #[test]
    fn test_endpoint_urls() {
        let endpoint = ProxyEndpoint::new("127.0.0.1", 9050);
        assert_eq!(endpoint.socks_url(), "socks5h://127.0.0.1:9050");
        assert_eq!(endpoint.to_string(), "127.0.0.1:9050");
    }

    #[tokio::test]
    async fn test_status_query() {
        let service = StaticProxyService::new(ProxyStatus::NotInstalled);
        assert_eq!(ProxyStatus::query(&service).await, ProxyStatus::NotInstalled);

        service.set_status(ProxyStatus::Stopped);
        assert_eq!(ProxyStatus::query(&service).await, ProxyStatus::Stopped);
        assert!(service.is_available().await);
        assert!(!service.is_running().await);

        service.set_status(ProxyStatus::Running(9050));
        let status = ProxyStatus::query(&service).await;
        assert_eq!(status, ProxyStatus::Running(9050));
        assert!(status.is_usable());
        assert!(!ProxyStatus::Running(0).is_usable());
    }
}
