//! Payment engine boundary
//!
//! The engine (Breez-SDK-like node) is authoritative for balance and payment
//! history. Both calls are network-bound and may fail or hang.

use crate::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lnwallet_core::{Balance, Msat, Payment, PaymentDirection, PaymentId, PaymentStatus};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Engine failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Engine unreachable or request failed in transit
    #[error("Engine unreachable: {0}")]
    Network(String),

    /// Engine reported corrupt or incompatible state
    #[error("Engine incompatible: {0}")]
    Incompatible(String),
}

impl From<EngineError> for SyncError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Network(msg) => SyncError::Transient(msg),
            EngineError::Incompatible(msg) => SyncError::Fatal(msg),
        }
    }
}

/// Balance as reported by the engine, in millisatoshis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineBalance {
    /// Spendable over Lightning
    pub lightning_msat: i64,
    /// Spendable on-chain
    pub onchain_msat: i64,
    /// Incoming, unsettled
    pub pending_in_msat: i64,
    /// Outgoing, unsettled
    pub pending_out_msat: i64,
}

impl EngineBalance {
    /// Convert to satoshis; negative values are an incompatibility
    pub fn to_balance(&self) -> Result<Balance> {
        Ok(Balance::from_msat(
            Msat::from_engine(self.lightning_msat)?,
            Msat::from_engine(self.onchain_msat)?,
            Msat::from_engine(self.pending_in_msat)?,
            Msat::from_engine(self.pending_out_msat)?,
        ))
    }
}

/// Payment as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePayment {
    /// Engine id
    pub id: String,
    /// Direction
    pub direction: PaymentDirection,
    /// Status
    pub status: PaymentStatus,
    /// Amount in millisatoshis
    pub amount_msat: i64,
    /// Fee in millisatoshis
    pub fee_msat: i64,
    /// Memo
    pub description: Option<String>,
    /// Unix seconds
    pub timestamp: i64,
}

impl EnginePayment {
    /// Convert to the wallet model
    pub fn to_payment(&self) -> Result<Payment> {
        if self.id.is_empty() {
            return Err(SyncError::Fatal("Engine payment without id".to_string()));
        }
        let timestamp: DateTime<Utc> = DateTime::from_timestamp(self.timestamp, 0)
            .ok_or_else(|| {
                SyncError::Fatal(format!(
                    "Payment {} has invalid timestamp {}",
                    self.id, self.timestamp
                ))
            })?;
        Ok(Payment::from_msat(
            PaymentId::new(self.id.clone()),
            self.direction,
            self.status,
            Msat::from_engine(self.amount_msat)?,
            Msat::from_engine(self.fee_msat)?,
            self.description.clone(),
            timestamp,
        ))
    }
}

/// One page of payment history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnginePage {
    /// Payments, newest first
    pub items: Vec<EnginePayment>,
    /// Token for the next page, `None` at the end
    pub next_cursor: Option<String>,
}

/// Payment engine
#[async_trait]
pub trait PaymentEngine: Send + Sync {
    /// Current balance
    async fn get_balance(&self) -> std::result::Result<EngineBalance, EngineError>;

    /// Page of payments after `cursor` (newest first when `None`)
    async fn list_payments(
        &self,
        cursor: Option<String>,
        limit: u32,
    ) -> std::result::Result<EnginePage, EngineError>;
}

/// In-memory engine with scriptable failures and latency.
///
/// Cursors are offsets into the newest-first history, so inserting a new
/// payment shifts later pages and produces overlapping pages, as real
/// engines do.
#[derive(Default)]
pub struct ScriptedPaymentEngine {
    state: Mutex<ScriptState>,
}

#[derive(Default)]
struct ScriptState {
    balance: EngineBalance,
    payments: Vec<EnginePayment>,
    failures: VecDeque<EngineError>,
    delay: Option<Duration>,
    calls: u32,
}

impl ScriptedPaymentEngine {
    /// Empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Set reported balance
    pub fn set_balance(&self, balance: EngineBalance) {
        self.state.lock().balance = balance;
    }

    /// Insert or replace a payment by id
    pub fn upsert_payment(&self, payment: EnginePayment) {
        let mut state = self.state.lock();
        match state.payments.iter().position(|p| p.id == payment.id) {
            Some(index) => state.payments[index] = payment,
            None => state.payments.push(payment),
        }
        state
            .payments
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
    }

    /// Fail the next call with `error`; queued failures are consumed in order
    pub fn fail_next(&self, error: EngineError) {
        self.state.lock().failures.push_back(error);
    }

    /// Delay every call by `delay`
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().delay = delay;
    }

    /// Number of calls received
    pub fn calls(&self) -> u32 {
        self.state.lock().calls
    }

    fn begin_call(&self) -> (Option<Duration>, Option<EngineError>) {
        let mut state = self.state.lock();
        state.calls += 1;
        (state.delay, state.failures.pop_front())
    }

    async fn simulate(&self) -> std::result::Result<(), EngineError> {
        let (delay, failure) = self.begin_call();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentEngine for ScriptedPaymentEngine {
    async fn get_balance(&self) -> std::result::Result<EngineBalance, EngineError> {
        self.simulate().await?;
        Ok(self.state.lock().balance)
    }

    async fn list_payments(
        &self,
        cursor: Option<String>,
        limit: u32,
    ) -> std::result::Result<EnginePage, EngineError> {
        self.simulate().await?;

        let offset = match cursor {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| EngineError::Incompatible(format!("Unknown cursor {}", token)))?,
            None => 0,
        };
        let state = self.state.lock();
        let end = offset.saturating_add(limit as usize).min(state.payments.len());
        let items = state
            .payments
            .get(offset..end)
            .map(|slice| slice.to_vec())
            .unwrap_or_default();
        let next_cursor = (end < state.payments.len()).then(|| end.to_string());
        Ok(EnginePage { items, next_cursor })
    }
}
