//! Onion service address classification

use crate::{Error, Result};
use regex::Regex;

/// Recognises onion service hosts: any host whose last label is `onion`.
///
/// The label in front is not checked for v2/v3 shape. A malformed or legacy
/// onion name must still never be resolved over clearnet.
#[derive(Debug, Clone)]
pub struct OnionClassifier {
    pattern: Regex,
}

impl OnionClassifier {
    /// Compile the classifier
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"(?i)^(?:[a-z0-9-]+\.)+onion\.?$")
            .map_err(|e| Error::Internal(format!("Invalid onion regex: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Whether `host` (no scheme, no port) is an onion address
    pub fn is_onion_host(&self, host: &str) -> bool {
        self.pattern.is_match(host)
    }
}
