//! Network routing policy
//!
//! Decides per request whether a destination must be reached through the
//! local Tor SOCKS proxy, and refuses to fall back to a direct connection
//! when it must but the proxy is unavailable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connection;
pub mod error;
pub mod onion;
pub mod proxy;
pub mod route;

pub use connection::ConnectionDescriptor;
pub use error::{Error, Result, RoutingPolicyViolation};
pub use onion::OnionClassifier;
pub use proxy::{ProxyEndpoint, ProxyService, ProxySettings, ProxyStatus, StaticProxyService};
pub use route::{Route, RouteDecision, RouteResolver};
