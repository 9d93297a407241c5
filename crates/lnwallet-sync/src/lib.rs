//! Wallet state synchronisation
//!
//! Keeps a local `{Balance, [Payment]}` projection consistent with the payment
//! engine. Pages are merged idempotently by payment id, pending payments settle
//! in place, and every engine call is bounded by a timeout and cancellable.
//!
//! Failure policy: [`SyncError::Transient`] may be retried with backoff
//! ([`with_retry`]); [`SyncError::Fatal`] halts the synchroniser until
//! [`WalletSynchronizer::resume`] is called.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod projection;
pub mod retry;
pub mod sync;

pub use cancel::CancelToken;
pub use config::SyncConfig;
pub use engine::{
    EngineBalance, EngineError, EnginePage, EnginePayment, PaymentEngine, ScriptedPaymentEngine,
};
pub use error::{Result, SyncError};
pub use projection::{MergeOutcome, Projection, ProjectionSnapshot};
pub use retry::{with_retry, RetryConfig};
pub use sync::{Cursor, PagedTransactionView, SyncStatus, WalletSynchronizer};
