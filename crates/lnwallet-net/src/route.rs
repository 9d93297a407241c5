//! Per-request route decisions
//!
//! A [`RouteDecision`] is computed fresh for each request from the proxy
//! service's current state and is never cached: Tor can stop at any moment.

use crate::onion::OnionClassifier;
use crate::proxy::{ProxyEndpoint, ProxyService, ProxySettings};
use crate::{Error, Result, RoutingPolicyViolation};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default bound on a proxy status query
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Routing facts for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    /// Destination host
    pub host: String,
    /// The destination is only reachable through Tor
    pub target_requires_anonymization: bool,
    /// The proxy is running with a usable SOCKS port
    pub proxy_available: bool,
    /// SOCKS endpoint when the proxy is available
    pub proxy_endpoint: Option<ProxyEndpoint>,
}

/// How a request will actually be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Direct clearnet connection
    Direct,
    /// Through the SOCKS proxy
    Proxied(ProxyEndpoint),
}

impl RouteDecision {
    /// Apply the routing policy.
    ///
    /// Anonymization required with no proxy is a violation, never a silent
    /// direct connection. Clearnet destinations always go direct.
    pub fn enforce(&self) -> std::result::Result<Route, RoutingPolicyViolation> {
        if !self.target_requires_anonymization {
            return Ok(Route::Direct);
        }
        match (&self.proxy_endpoint, self.proxy_available) {
            (Some(endpoint), true) => Ok(Route::Proxied(endpoint.clone())),
            _ => {
                warn!(host = %self.host, "Anonymized route required but proxy unavailable");
                Err(RoutingPolicyViolation {
                    host: self.host.clone(),
                })
            }
        }
    }
}

impl Route {
    /// Whether traffic goes through the proxy
    pub fn is_proxied(&self) -> bool {
        matches!(self, Route::Proxied(_))
    }

    /// Build an HTTP client for this route
    pub fn http_client(&self, timeout: Duration) -> Result<reqwest::Client> {
        let builder = reqwest::Client::builder().timeout(timeout);
        let builder = match self {
            Route::Direct => builder.no_proxy(),
            Route::Proxied(endpoint) => {
                let proxy_url = endpoint.socks_url();
                debug!("Creating HTTP client with SOCKS5 proxy: {}", proxy_url);
                let proxy = reqwest::Proxy::all(&proxy_url)
                    .map_err(|e| Error::Client(format!("Failed to create SOCKS5 proxy: {}", e)))?;
                builder.proxy(proxy)
            }
        };
        builder
            .build()
            .map_err(|e| Error::Client(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Classifies destinations and snapshots proxy availability
pub struct RouteResolver {
    proxy: Arc<dyn ProxyService>,
    settings: ProxySettings,
    classifier: OnionClassifier,
    status_timeout: Duration,
}

impl RouteResolver {
    /// Create resolver over a proxy service
    pub fn new(proxy: Arc<dyn ProxyService>, settings: ProxySettings) -> Result<Self> {
        Ok(Self {
            proxy,
            settings,
            classifier: OnionClassifier::new()?,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
        })
    }

    /// Bound each proxy status query; an expired query counts as not running
    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    /// Decide the route for `destination`.
    ///
    /// Never contacts the destination. Inputs without a scheme are read as
    /// `http://` URLs.
    pub async fn resolve(&self, destination: &str) -> Result<RouteDecision> {
        let host = parse_host(destination)?;
        let target_requires_anonymization = self.classifier.is_onion_host(&host);

        let port = match tokio::time::timeout(self.status_timeout, self.running_port()).await {
            Ok(port) => port,
            Err(_) => {
                warn!("Proxy status query timed out");
                None
            }
        };
        // A running proxy that reports no port listens on the configured default
        let proxy_endpoint = port
            .map(|reported| match reported {
                0 => self.settings.default_socks_port,
                reported => reported,
            })
            .filter(|port| *port != 0)
            .map(|port| ProxyEndpoint::new(self.settings.socks_host.clone(), port));

        let decision = RouteDecision {
            host,
            target_requires_anonymization,
            proxy_available: proxy_endpoint.is_some(),
            proxy_endpoint,
        };
        debug!(
            host = %decision.host,
            anonymize = decision.target_requires_anonymization,
            proxy_available = decision.proxy_available,
            "Route resolved"
        );
        Ok(decision)
    }

    /// Resolve and enforce in one step
    pub async fn route_for(&self, destination: &str) -> Result<Route> {
        Ok(self.resolve(destination).await?.enforce()?)
    }

    async fn running_port(&self) -> Option<u16> {
        if self.proxy.is_running().await {
            Some(self.proxy.socks_port().await)
        } else {
            None
        }
    }
}

fn parse_host(destination: &str) -> Result<String> {
    let trimmed = destination.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let url = Url::parse(&candidate)
        .map_err(|e| Error::InvalidDestination(format!("{}: {}", trimmed, e)))?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(host.to_string()),
        _ => Err(Error::InvalidDestination(format!("{}: no host", trimmed))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host() {
        assert_eq!(parse_host("https://example.com:8080/x").unwrap(), "example.com");
        assert_eq!(parse_host("example.com").unwrap(), "example.com");
        assert_eq!(parse_host("  node.example.com:9735 ").unwrap(), "node.example.com");
        assert!(matches!(parse_host(""), Err(Error::InvalidDestination(_))));
        assert!(matches!(parse_host("http://"), Err(Error::InvalidDestination(_))));
    }

    #[test]
    fn test_enforce_matrix() {
        let endpoint = ProxyEndpoint::new("127.0.0.1", 9050);
        let decision = |requires, endpoint: Option<ProxyEndpoint>| RouteDecision {
            host: "h".to_string(),
            target_requires_anonymization: requires,
            proxy_available: endpoint.is_some(),
            proxy_endpoint: endpoint,
        };

        assert_eq!(decision(false, None).enforce(), Ok(Route::Direct));
        assert_eq!(decision(false, Some(endpoint.clone())).enforce(), Ok(Route::Direct));
        assert_eq!(
            decision(true, Some(endpoint.clone())).enforce(),
            Ok(Route::Proxied(endpoint))
        );
        assert_eq!(
            decision(true, None).enforce(),
            Err(RoutingPolicyViolation {
                host: "h".to_string()
            })
        );
    }

    #[test]
    fn test_http_client_builds_for_both_routes() {
        let timeout = Duration::from_secs(10);
        assert!(Route::Direct.http_client(timeout).is_ok());
        let proxied = Route::Proxied(ProxyEndpoint::new("127.0.0.1", 9050));
        assert!(proxied.is_proxied());
        assert!(proxied.http_client(timeout).is_ok());
    }
}
