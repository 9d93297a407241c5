//! Wallet state synchroniser

use crate::engine::{EngineError, PaymentEngine};
use crate::projection::{Projection, ProjectionSnapshot};
use crate::retry::with_retry;
use crate::{CancelToken, Result, SyncConfig, SyncError};
use lnwallet_core::{Balance, Payment};
use lnwallet_net::{Error as NetError, RouteResolver};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Opaque continuation token, valid only in the session that issued it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    session: Uuid,
    token: String,
}

/// One fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedTransactionView {
    /// Payments of this page, newest first
    pub payments: Vec<Payment>,
    /// Cursor for the next page, `None` at the end
    pub next_cursor: Option<Cursor>,
}

/// Synchroniser status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Accepting calls
    Active,
    /// Stopped after a fatal error until [`WalletSynchronizer::resume`]
    Halted {
        /// The fatal error message
        reason: String,
    },
}

struct SessionState {
    session: Uuid,
    status: SyncStatus,
}

/// Pulls balance and payments from the engine into the local projection.
///
/// `refresh_balance` and `fetch_page` may run concurrently; writes into the
/// projection are serialised by a single lock.
pub struct WalletSynchronizer {
    engine: Arc<dyn PaymentEngine>,
    config: SyncConfig,
    router: Option<Arc<RouteResolver>>,
    projection: RwLock<Projection>,
    state: Mutex<SessionState>,
    cancel: CancelToken,
}

impl WalletSynchronizer {
    /// Create synchroniser with an empty projection
    pub fn new(engine: Arc<dyn PaymentEngine>, config: SyncConfig) -> Self {
        Self {
            engine,
            config,
            router: None,
            projection: RwLock::new(Projection::new()),
            state: Mutex::new(SessionState {
                session: Uuid::new_v4(),
                status: SyncStatus::Active,
            }),
            cancel: CancelToken::new(),
        }
    }

    /// Gate engine calls on the routing policy for `config.engine_endpoint`
    pub fn with_router(mut self, router: Arc<RouteResolver>) -> Self {
        self.router = Some(router);
        self
    }

    /// Start from a previously saved projection
    pub fn with_snapshot(self, snapshot: ProjectionSnapshot) -> Self {
        *self.projection.write() = Projection::restore(snapshot);
        self
    }

    /// Token cancelling in-flight calls. Once cancelled, calls fail with
    /// [`SyncError::Cancelled`] until the token is reset.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current status
    pub fn status(&self) -> SyncStatus {
        self.state.lock().status.clone()
    }

    /// Clear a halt after the caller has taken corrective action
    pub fn resume(&self) {
        let mut state = self.state.lock();
        if let SyncStatus::Halted { reason } = &state.status {
            info!("Resuming sync after halt: {}", reason);
        }
        state.status = SyncStatus::Active;
    }

    /// Start a new session; cursors from earlier sessions become invalid
    pub fn reset_session(&self) {
        let mut state = self.state.lock();
        state.session = Uuid::new_v4();
        debug!(session = %state.session, "New sync session");
    }

    /// Last known good balance
    pub fn balance(&self) -> Option<Balance> {
        self.projection.read().balance()
    }

    /// All known payments, newest first
    pub fn payments(&self) -> Vec<Payment> {
        self.projection.read().payments()
    }

    /// Pending payments, newest first
    pub fn pending(&self) -> Vec<Payment> {
        self.projection.read().pending()
    }

    /// Snapshot for persistence
    pub fn snapshot(&self) -> ProjectionSnapshot {
        self.projection.read().snapshot()
    }

    /// Pull the authoritative balance
    pub async fn refresh_balance(&self) -> Result<Balance> {
        let result = self.refresh_balance_inner().await;
        self.observe(result)
    }

    /// Fetch one page of payments and merge it into the projection.
    ///
    /// `None` fetches the most recent page.
    pub async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<PagedTransactionView> {
        let result = self.fetch_page_inner(cursor).await;
        self.observe(result)
    }

    /// [`refresh_balance`](Self::refresh_balance) with backoff on transient failures
    pub async fn refresh_balance_with_retry(&self) -> Result<Balance> {
        with_retry(&self.config.retry, &self.cancel, || self.refresh_balance()).await
    }

    /// [`fetch_page`](Self::fetch_page) with backoff on transient failures
    pub async fn fetch_page_with_retry(
        &self,
        cursor: Option<&Cursor>,
    ) -> Result<PagedTransactionView> {
        with_retry(&self.config.retry, &self.cancel, || self.fetch_page(cursor)).await
    }

    async fn refresh_balance_inner(&self) -> Result<Balance> {
        self.check_active()?;
        self.check_route().await?;

        let reported = self.call("get_balance", self.engine.get_balance()).await?;
        let balance = reported.to_balance()?;

        self.projection.write().set_balance(balance);
        debug!(
            lightning_sats = balance.lightning_sats,
            onchain_sats = balance.onchain_sats,
            "Balance refreshed"
        );
        Ok(balance)
    }

    async fn fetch_page_inner(&self, cursor: Option<&Cursor>) -> Result<PagedTransactionView> {
        self.check_active()?;
        let session = self.state.lock().session;
        let token = match cursor {
            Some(cursor) if cursor.session != session => {
                return Err(SyncError::Fatal(
                    "Stale cursor from a previous sync session".to_string(),
                ));
            }
            Some(cursor) => Some(cursor.token.clone()),
            None => None,
        };
        self.check_route().await?;

        let page = self
            .call(
                "list_payments",
                self.engine.list_payments(token, self.config.page_size),
            )
            .await?;

        // Convert the whole page first so a bad item rejects the page
        // before anything is merged.
        let mut payments = page
            .items
            .iter()
            .map(|item| item.to_payment())
            .collect::<Result<Vec<_>>>()?;
        payments.sort_by(|a, b| a.display_cmp(b));

        let outcome = self.projection.write().merge(payments.iter().cloned());
        debug!(
            inserted = outcome.inserted,
            settled = outcome.settled,
            unchanged = outcome.unchanged,
            rejected = outcome.rejected,
            "Merged payment page"
        );

        Ok(PagedTransactionView {
            payments,
            next_cursor: page.next_cursor.map(|token| Cursor { session, token }),
        })
    }

    /// Bound an engine call by the request timeout and the cancel token
    async fn call<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, EngineError>>,
    {
        let timeout = self.config.request_timeout;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("{} cancelled", operation);
                Err(SyncError::Cancelled)
            }
            result = tokio::time::timeout(timeout, future) => match result {
                Ok(result) => result.map_err(SyncError::from),
                Err(_) => Err(SyncError::Transient(format!(
                    "{} timed out after {:?}",
                    operation, timeout
                ))),
            },
        }
    }

    async fn check_route(&self) -> Result<()> {
        let (Some(router), Some(endpoint)) = (&self.router, &self.config.engine_endpoint) else {
            return Ok(());
        };
        match router.route_for(endpoint).await {
            Ok(_) => Ok(()),
            Err(NetError::Policy(violation)) => Err(SyncError::RoutingPolicy(violation)),
            Err(e) => Err(SyncError::Fatal(format!("Engine endpoint unusable: {}", e))),
        }
    }

    fn check_active(&self) -> Result<()> {
        match &self.state.lock().status {
            SyncStatus::Active => Ok(()),
            SyncStatus::Halted { reason } => Err(SyncError::Fatal(reason.clone())),
        }
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        match &result {
            Err(SyncError::Fatal(reason)) => {
                let mut state = self.state.lock();
                if state.status == SyncStatus::Active {
                    error!("Sync halted: {}", reason);
                    state.status = SyncStatus::Halted {
                        reason: reason.clone(),
                    };
                }
            }
            Err(SyncError::Transient(reason)) => warn!("Transient sync failure: {}", reason),
            Err(SyncError::RoutingPolicy(violation)) => warn!("{}", violation),
            _ => {}
        }
        result
    }
}
