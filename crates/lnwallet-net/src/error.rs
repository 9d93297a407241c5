//! Error types

/// Anonymization was required for a destination but no proxy was usable.
///
/// Always fatal to the enclosing operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Destination {host} requires Tor but the proxy is not available")]
pub struct RoutingPolicyViolation {
    /// Host that required anonymization
    pub host: String,
}

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Destination could not be parsed as a URL with a host
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    /// Connection descriptor lacks `host:port`
    #[error("Connection descriptor is missing host and port")]
    MissingHostPort,

    /// Connection descriptor lacks the macaroon parameter
    #[error("Connection descriptor is missing the macaroon")]
    MissingMacaroon,

    /// Routing policy refused the request
    #[error(transparent)]
    Policy(#[from] RoutingPolicyViolation),

    /// HTTP client construction failed
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Internal setup failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
