//! Node connection descriptors
//!
//! Consumes `scheme://host:port?macaroon=...&cert=...` strings (lndconnect and
//! similar) as pasted or scanned by the user.

use crate::{Error, Result};
use percent_encoding::percent_decode_str;
use std::fmt;
use url::Url;

/// Parsed node connection
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// REST endpoint, `https://host:port`
    pub rest_url: String,
    /// Authentication macaroon as given
    pub macaroon: String,
    /// TLS certificate, if supplied
    pub cert: Option<String>,
}

impl ConnectionDescriptor {
    /// Parse a descriptor URL
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let url = Url::parse(input)
            .map_err(|e| Error::InvalidDestination(format!("connection descriptor: {}", e)))?;

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or(Error::MissingHostPort)?;
        // `Url` drops a port equal to the scheme default, so `:443` on https
        // is only visible in the raw authority.
        if !has_explicit_port(input) {
            return Err(Error::MissingHostPort);
        }
        let port = url.port_or_known_default().ok_or(Error::MissingHostPort)?;

        let mut macaroon = None;
        let mut cert = None;
        for (key, value) in query_params(url.query().unwrap_or_default())? {
            match key.as_str() {
                "macaroon" => macaroon = Some(value),
                "cert" => cert = Some(value),
                _ => {}
            }
        }
        let macaroon = macaroon
            .filter(|m| !m.is_empty())
            .ok_or(Error::MissingMacaroon)?;

        Ok(Self {
            rest_url: format!("https://{}:{}", host, port),
            macaroon,
            cert: cert.filter(|c| !c.is_empty()),
        })
    }
}

fn has_explicit_port(input: &str) -> bool {
    let rest = input.split_once("://").map_or(input, |(_, rest)| rest);
    let authority = rest
        .split(|c| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let after_host = match host_port.rfind(']') {
        Some(end) => &host_port[end + 1..],
        None => host_port,
    };
    after_host
        .split_once(':')
        .is_some_and(|(_, port)| !port.is_empty())
}

/// Percent-decode `k=v&k=v` pairs. Unlike form decoding, `+` is kept, so
/// standard base64 values survive.
fn query_params(query: &str) -> Result<Vec<(String, String)>> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok((decode_component(key)?, decode_component(value)?))
        })
        .collect()
}

fn decode_component(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::InvalidDestination(format!("connection descriptor: {}", e)))
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("rest_url", &self.rest_url)
            .field("macaroon", &"<redacted>")
            .field("cert", &self.cert.as_ref().map(|_| "<present>"))
            .finish()
    }
}
