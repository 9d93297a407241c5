//! Synchroniser behaviour against the scripted engine

use chrono::{TimeZone, Utc};
use lnwallet_core::{Payment, PaymentDirection, PaymentId, PaymentStatus};
use lnwallet_net::{ProxySettings, RouteResolver, StaticProxyService};
use lnwallet_sync::*;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const ONION_ENDPOINT: &str = "http://abcdefghijklmnopqrstuvwxyz234567abcdefghijklmnopqrstuv.onion:8080";

// ============================================================================
// Helpers
// ============================================================================

fn engine_payment(id: &str, status: PaymentStatus, ts: i64) -> EnginePayment {
    EnginePayment {
        id: id.to_string(),
        direction: PaymentDirection::Outgoing,
        status,
        amount_msat: 21_001,
        fee_msat: 1_500,
        description: Some(format!("payment {}", id)),
        timestamp: 1_700_000_000 + ts,
    }
}

fn synchronizer(config: SyncConfig) -> (Arc<ScriptedPaymentEngine>, WalletSynchronizer) {
    let engine = Arc::new(ScriptedPaymentEngine::new());
    (engine.clone(), WalletSynchronizer::new(engine, config))
}

fn ids(payments: &[Payment]) -> Vec<String> {
    payments.iter().map(|p| p.id.to_string()).collect()
}

// ============================================================================
// Merge semantics
// ============================================================================

#[tokio::test]
async fn test_refetching_same_page_does_not_duplicate() {
    let (engine, sync) = synchronizer(SyncConfig::default());
    for i in 0..4 {
        engine.upsert_payment(engine_payment(&format!("p{}", i), PaymentStatus::Complete, i));
    }

    sync.fetch_page(None).await.unwrap();
    let once = sync.payments();
    sync.fetch_page(None).await.unwrap();

    assert_eq!(sync.payments(), once);
    assert_eq!(ids(&once), vec!["p3", "p2", "p1", "p0"]);
}

#[tokio::test]
async fn test_overlapping_pages_after_new_payment() {
    let config = SyncConfig {
        page_size: 2,
        ..SyncConfig::default()
    };
    let (engine, sync) = synchronizer(config);
    for i in 0..4 {
        engine.upsert_payment(engine_payment(&format!("p{}", i), PaymentStatus::Complete, i));
    }

    let first = sync.fetch_page(None).await.unwrap();
    assert_eq!(ids(&first.payments), vec!["p3", "p2"]);

    // A new payment shifts the offsets; the next page overlaps the first.
    engine.upsert_payment(engine_payment("p4", PaymentStatus::Complete, 4));
    let second = sync.fetch_page(first.next_cursor.as_ref()).await.unwrap();
    assert_eq!(ids(&second.payments), vec!["p2", "p1"]);

    let third = sync.fetch_page(second.next_cursor.as_ref()).await.unwrap();
    assert_eq!(ids(&third.payments), vec!["p0"]);
    assert_eq!(third.next_cursor, None);

    sync.fetch_page(None).await.unwrap();
    assert_eq!(ids(&sync.payments()), vec!["p4", "p3", "p2", "p1", "p0"]);
}

#[tokio::test]
async fn test_pending_becomes_complete_once_in_original_position() {
    let (engine, sync) = synchronizer(SyncConfig::default());
    engine.upsert_payment(engine_payment("newer", PaymentStatus::Complete, 30));
    engine.upsert_payment(engine_payment("inflight", PaymentStatus::Pending, 20));
    engine.upsert_payment(engine_payment("older", PaymentStatus::Complete, 10));

    sync.fetch_page(None).await.unwrap();
    assert_eq!(sync.pending().len(), 1);

    engine.upsert_payment(engine_payment("inflight", PaymentStatus::Complete, 20));
    sync.fetch_page(None).await.unwrap();

    let payments = sync.payments();
    assert_eq!(ids(&payments), vec!["newer", "inflight", "older"]);
    assert_eq!(payments[1].status, PaymentStatus::Complete);
    assert!(sync.pending().is_empty());
}

#[tokio::test]
async fn test_failed_payment_never_resurrected() {
    let (engine, sync) = synchronizer(SyncConfig::default());
    engine.upsert_payment(engine_payment("p", PaymentStatus::Failed, 1));
    sync.fetch_page(None).await.unwrap();

    engine.upsert_payment(engine_payment("p", PaymentStatus::Complete, 1));
    sync.fetch_page(None).await.unwrap();

    let payment = sync.payments().into_iter().next().unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn test_payment_rounding() {
    let (engine, sync) = synchronizer(SyncConfig::default());
    engine.upsert_payment(engine_payment("p", PaymentStatus::Complete, 1));
    sync.fetch_page(None).await.unwrap();

    let payment = &sync.payments()[0];
    // outgoing amount and fee are what the user pays: ceiling
    assert_eq!(payment.amount_sats, 22);
    assert_eq!(payment.fee_sats, 2);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_hung_engine_times_out_as_transient() {
    let config = SyncConfig {
        request_timeout: Duration::from_secs(5),
        ..SyncConfig::default()
    };
    let (engine, sync) = synchronizer(config);
    engine.set_delay(Some(Duration::from_secs(60)));

    let err = sync.refresh_balance().await.unwrap_err();
    assert!(matches!(err, SyncError::Transient(_)));
    assert_eq!(sync.status(), SyncStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_fetch_leaves_projection_untouched() {
    let (engine, sync) = synchronizer(SyncConfig::default());
    engine.upsert_payment(engine_payment("p", PaymentStatus::Complete, 1));
    engine.set_delay(Some(Duration::from_secs(1)));

    let sync = Arc::new(sync);
    let token = sync.cancel_token();
    let task = {
        let sync = sync.clone();
        tokio::spawn(async move { sync.fetch_page(None).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();

    assert_eq!(task.await.unwrap(), Err(SyncError::Cancelled));
    assert!(sync.payments().is_empty());

    token.reset();
    engine.set_delay(None);
    sync.fetch_page(None).await.unwrap();
    assert_eq!(sync.payments().len(), 1);
}

#[tokio::test]
async fn test_fatal_halts_until_resume() {
    let (engine, sync) = synchronizer(SyncConfig::default());
    engine.fail_next(EngineError::Incompatible("unsupported node version".into()));

    let err = sync.refresh_balance().await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(
        sync.status(),
        SyncStatus::Halted {
            reason: "unsupported node version".to_string()
        }
    );

    // Halted calls do not reach the engine
    let calls = engine.calls();
    assert_eq!(sync.refresh_balance().await.unwrap_err(), err);
    assert_eq!(sync.fetch_page(None).await.unwrap_err(), err);
    assert_eq!(engine.calls(), calls);

    sync.resume();
    assert!(sync.refresh_balance().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_from_transient_failures() {
    let (engine, sync) = synchronizer(SyncConfig::default());
    engine.fail_next(EngineError::Network("offline".into()));
    engine.fail_next(EngineError::Network("offline".into()));
    engine.set_balance(EngineBalance {
        lightning_msat: 10_000,
        ..EngineBalance::default()
    });

    let balance = sync.refresh_balance_with_retry().await.unwrap();
    assert_eq!(balance.lightning_sats, 10);
    assert_eq!(engine.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_does_not_repeat_fatal() {
    let (engine, sync) = synchronizer(SyncConfig::default());
    engine.fail_next(EngineError::Incompatible("corrupt".into()));

    assert!(sync.fetch_page_with_retry(None).await.unwrap_err().is_fatal());
    assert_eq!(engine.calls(), 1);
}

#[tokio::test]
async fn test_balance_matches_engine_spendable() {
    let (engine, sync) = synchronizer(SyncConfig::default());
    engine.set_balance(EngineBalance {
        lightning_msat: 1_500,
        onchain_msat: 100_000,
        pending_in_msat: 1_500,
        pending_out_msat: 999,
    });

    let balance = sync.refresh_balance().await.unwrap();
    assert_eq!(balance.lightning_sats, 1);
    assert_eq!(balance.onchain_sats, 100);
    assert_eq!(balance.pending_incoming_sats, 2);
    assert_eq!(balance.pending_outgoing_sats, 1);
    assert_eq!(balance.spendable_sats(), Some(101));
}

// ============================================================================
// Routing policy
// ============================================================================

#[tokio::test]
async fn test_onion_engine_requires_proxy() {
    let proxy = Arc::new(StaticProxyService::stopped());
    let router = Arc::new(RouteResolver::new(proxy.clone(), ProxySettings::default()).unwrap());
    let config = SyncConfig {
        engine_endpoint: Some(ONION_ENDPOINT.to_string()),
        ..SyncConfig::default()
    };
    let (engine, sync) = synchronizer(config);
    let sync = sync.with_router(router);

    let err = sync.refresh_balance().await.unwrap_err();
    assert!(matches!(err, SyncError::RoutingPolicy(_)));
    assert_eq!(engine.calls(), 0);
    assert_eq!(sync.status(), SyncStatus::Active);

    proxy.set_status(lnwallet_net::ProxyStatus::Running(9050));
    assert!(sync.refresh_balance().await.is_ok());
    assert_eq!(engine.calls(), 1);
}

// ============================================================================
// Snapshot
// ============================================================================

#[tokio::test]
async fn test_warm_start_from_snapshot() {
    let (engine, sync) = synchronizer(SyncConfig::default());
    engine.upsert_payment(engine_payment("p", PaymentStatus::Pending, 1));
    sync.fetch_page(None).await.unwrap();
    let snapshot = sync.snapshot();

    let (engine, restored) = synchronizer(SyncConfig::default());
    let restored = restored.with_snapshot(snapshot);
    assert_eq!(restored.pending().len(), 1);

    engine.upsert_payment(engine_payment("p", PaymentStatus::Complete, 1));
    restored.fetch_page(None).await.unwrap();
    assert_eq!(restored.payments().len(), 1);
    assert!(restored.pending().is_empty());
}

// ============================================================================
// Properties
// ============================================================================

fn arb_status() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Pending),
        Just(PaymentStatus::Complete),
        Just(PaymentStatus::Failed),
    ]
}

fn arb_payment() -> impl Strategy<Value = Payment> {
    (0u8..20, arb_status(), 0i64..1_000, 0u64..1_000_000).prop_map(|(id, status, ts, sats)| {
        Payment {
            id: PaymentId::new(format!("p{}", id)),
            direction: PaymentDirection::Incoming,
            status,
            amount_sats: sats,
            fee_sats: 0,
            description: None,
            timestamp: Utc.timestamp_opt(ts, 0).single().unwrap(),
        }
    })
}

proptest! {
    /// Property: merging a page twice equals merging it once
    #[test]
    fn prop_merge_idempotent(page in prop::collection::vec(arb_payment(), 0..40)) {
        let mut once = Projection::new();
        once.merge(page.clone());

        let mut twice = Projection::new();
        twice.merge(page.clone());
        twice.merge(page);

        prop_assert_eq!(once.payments(), twice.payments());
    }

    /// Property: ids are unique and the order is newest first
    #[test]
    fn prop_ids_unique_and_ordered(
        first in prop::collection::vec(arb_payment(), 0..40),
        second in prop::collection::vec(arb_payment(), 0..40),
    ) {
        let mut projection = Projection::new();
        projection.merge(first);
        projection.merge(second);

        let payments = projection.payments();
        let mut seen = std::collections::HashSet::new();
        for payment in &payments {
            prop_assert!(seen.insert(payment.id.clone()));
        }
        for pair in payments.windows(2) {
            prop_assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }
}
