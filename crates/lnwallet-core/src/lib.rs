//! Lightning wallet core
//!
//! Recovery phrase handling (generation, validation, normalisation and the
//! backup word challenge), satoshi/millisatoshi conversion rules, and the
//! balance and payment data model shared by the storage, sync and service
//! layers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod error;
pub mod mnemonic;
pub mod payment;

pub use amount::{Msat, Rounding, MSAT_PER_SAT};
pub use error::{Error, ErrorCategory, Result, ValidationError};
pub use mnemonic::{
    BackupChallenge, RecoveryPhrase, RecoveryPhraseManager, DEFAULT_CHALLENGE_WORDS,
    PHRASE_ENTROPY_BYTES, PHRASE_WORD_COUNT,
};
pub use payment::{Balance, Payment, PaymentDirection, PaymentId, PaymentStatus};
