//! Wallet service facade

use crate::{Error, OnboardingMachine, Result, WalletConfig};
use lnwallet_core::RecoveryPhrase;
use lnwallet_net::{ProxyService, ProxyStatus, RouteDecision, RouteResolver};
use lnwallet_storage::{
    KeySealer, RecordMetadata, ResetChallenge, RetrieveError, SecretStore, SecureStorage, WipeError,
};
use lnwallet_sync::{PaymentEngine, ProjectionSnapshot, WalletSynchronizer};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Code shown to the user, who must type it back to confirm a reset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetConfirmation {
    /// Code to display
    pub code: String,
}

/// Entry point for the presentation layer
pub struct WalletService {
    config: WalletConfig,
    store: Arc<SecretStore>,
    proxy: Arc<dyn ProxyService>,
    router: Arc<RouteResolver>,
    pending_reset: Mutex<Option<ResetChallenge>>,
}

impl WalletService {
    /// Wire the service over platform collaborators
    pub fn new(
        config: WalletConfig,
        storage: Arc<dyn SecureStorage>,
        sealer: Arc<dyn KeySealer>,
        proxy: Arc<dyn ProxyService>,
    ) -> Result<Self> {
        config.validate()?;
        let router = Arc::new(RouteResolver::new(proxy.clone(), config.proxy.clone())?);
        Ok(Self {
            config,
            store: Arc::new(SecretStore::new(storage, sealer)),
            proxy,
            router,
            pending_reset: Mutex::new(None),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Whether a wallet exists. Derived from the stored record on every call.
    pub fn is_initialized(&self) -> bool {
        self.store.is_initialized()
    }

    /// Metadata of the stored record, without decrypting
    pub fn record_metadata(&self) -> Result<Option<RecordMetadata>> {
        Ok(self.store.record_metadata()?)
    }

    /// Onboarding machine; already `Ready` when a wallet exists
    pub fn onboarding(&self) -> OnboardingMachine {
        OnboardingMachine::new(self.store.clone(), &self.config.onboarding)
    }

    /// Decrypt the recovery phrase for an explicit backup view
    pub fn recovery_phrase(&self) -> Result<RecoveryPhrase> {
        Ok(self.store.retrieve()?)
    }

    /// Route decision for `destination`
    pub async fn resolve_route(&self, destination: &str) -> Result<RouteDecision> {
        Ok(self.router.resolve(destination).await?)
    }

    /// Proxy state for UI hints
    pub async fn proxy_status(&self) -> ProxyStatus {
        ProxyStatus::query(self.proxy.as_ref()).await
    }

    /// Synchroniser over `engine`. Only available once onboarding stored a
    /// wallet.
    pub fn synchronizer(&self, engine: Arc<dyn PaymentEngine>) -> Result<WalletSynchronizer> {
        if !self.is_initialized() {
            return Err(Error::Retrieve(RetrieveError::NotInitialized));
        }
        Ok(WalletSynchronizer::new(engine, self.config.sync.clone()).with_router(self.router.clone()))
    }

    /// Synchroniser warm-started from a saved projection
    pub fn synchronizer_from_snapshot(
        &self,
        engine: Arc<dyn PaymentEngine>,
        snapshot: ProjectionSnapshot,
    ) -> Result<WalletSynchronizer> {
        Ok(self.synchronizer(engine)?.with_snapshot(snapshot))
    }

    /// Start a wallet reset. Replaces any earlier unconfirmed reset.
    pub fn begin_reset(&self) -> ResetConfirmation {
        let challenge = self.store.begin_reset();
        let confirmation = ResetConfirmation {
            code: challenge.code().to_string(),
        };
        *self.pending_reset.lock() = Some(challenge);
        confirmation
    }

    /// Wipe the wallet if `typed` matches the pending reset code. The pending
    /// reset is consumed either way.
    pub fn confirm_reset(&self, typed: &str) -> Result<()> {
        let challenge = self
            .pending_reset
            .lock()
            .take()
            .ok_or(WipeError::ConfirmationMismatch)?;
        let authorization = challenge.confirm(typed).map_err(|e| {
            warn!("Wallet reset confirmation mismatch");
            e
        })?;
        self.store.wipe(authorization)?;
        info!("Wallet reset complete");
        Ok(())
    }
}
