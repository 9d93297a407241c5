//! Error types for the wallet core
//!
//! `ValidationError` covers malformed user input (always recoverable by
//! re-prompting). `Error` adds the few failures the core itself can hit.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed phrase or amount input.
///
/// Variants never carry the offending words themselves so that an error can
/// be logged without leaking recovery phrase material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Wrong number of words
    #[error("Expected {expected} words, found {found}")]
    WordCount {
        /// Required word count
        expected: usize,
        /// Word count supplied
        found: usize,
    },

    /// A word is not in the wordlist (0-based position)
    #[error("Word {} is not in the wordlist", position + 1)]
    UnknownWord {
        /// 0-based position of the offending word
        position: usize,
    },

    /// Words are valid but the embedded checksum does not verify
    #[error("Recovery phrase checksum mismatch")]
    InvalidChecksum,

    /// Amount cannot be represented
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl ValidationError {
    /// Actionable text for the re-prompt
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::WordCount { expected, found } => format!(
                "Your recovery phrase must have {} words, but {} were entered.",
                expected, found
            ),
            ValidationError::UnknownWord { position } => format!(
                "Word {} is not a valid recovery word. Please check its spelling.",
                position + 1
            ),
            ValidationError::InvalidChecksum => {
                "The recovery phrase is invalid. Please check the words and their order.".to_string()
            }
            ValidationError::InvalidAmount(_) => {
                "The amount is invalid. Please enter a valid amount.".to_string()
            }
        }
    }
}

/// Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The OS entropy source failed; not retryable at this layer
    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),
}

impl Error {
    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation(ValidationError::InvalidAmount(_)) => ErrorCategory::Amount,
            Error::Validation(_) => ErrorCategory::Phrase,
            Error::EntropyUnavailable(_) => ErrorCategory::Entropy,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Recovery phrase errors
    Phrase,
    /// Amount errors
    Amount,
    /// Entropy source errors
    Entropy,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Phrase => write!(f, "Phrase"),
            ErrorCategory::Amount => write!(f, "Amount"),
            ErrorCategory::Entropy => write!(f, "Entropy"),
        }
    }
}
