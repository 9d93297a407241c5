//! Local `{Balance, [Payment]}` projection
//!
//! `merge` is the only mutator of the payment set. The synchroniser converts a
//! whole page before calling it and holds the write lock for the duration, so
//! readers never see half a page.

use lnwallet_core::{Balance, Payment, PaymentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// What a merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// New payments
    pub inserted: usize,
    /// Pending payments that settled
    pub settled: usize,
    /// Already known, nothing changed
    pub unchanged: usize,
    /// Illegal status changes ignored
    pub rejected: usize,
}

impl MergeOutcome {
    /// Whether the projection changed
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.settled > 0
    }
}

/// Serialisable copy of the projection for warm starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionSnapshot {
    /// Last known good balance
    pub balance: Option<Balance>,
    /// Payments in display order
    pub payments: Vec<Payment>,
}

/// Local projection
#[derive(Debug, Clone, Default)]
pub struct Projection {
    balance: Option<Balance>,
    payments: HashMap<PaymentId, Payment>,
}

impl Projection {
    /// Empty projection
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a snapshot
    pub fn restore(snapshot: ProjectionSnapshot) -> Self {
        let mut projection = Self {
            balance: snapshot.balance,
            payments: HashMap::new(),
        };
        projection.merge(snapshot.payments);
        projection
    }

    /// Snapshot for persistence
    pub fn snapshot(&self) -> ProjectionSnapshot {
        ProjectionSnapshot {
            balance: self.balance,
            payments: self.payments(),
        }
    }

    /// Last known good balance
    pub fn balance(&self) -> Option<Balance> {
        self.balance
    }

    /// Replace the balance
    pub fn set_balance(&mut self, balance: Balance) {
        self.balance = Some(balance);
    }

    /// Payments, newest first, ties broken by id
    pub fn payments(&self) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self.payments.values().cloned().collect();
        payments.sort_by(|a, b| a.display_cmp(b));
        payments
    }

    /// Pending payments in display order
    pub fn pending(&self) -> Vec<Payment> {
        self.payments()
            .into_iter()
            .filter(|p| !p.status.is_terminal())
            .collect()
    }

    /// Look up one payment
    pub fn get(&self, id: &PaymentId) -> Option<&Payment> {
        self.payments.get(id)
    }

    /// Number of payments
    pub fn len(&self) -> usize {
        self.payments.len()
    }

    /// No payments known
    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    /// Merge payments by id.
    ///
    /// Unknown ids are inserted. A known pending payment reported in a terminal
    /// state is settled in place, keeping its original timestamp. Terminal
    /// payments never change.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = Payment>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for payment in incoming {
            let Some(existing) = self.payments.get_mut(&payment.id) else {
                self.payments.insert(payment.id.clone(), payment);
                outcome.inserted += 1;
                continue;
            };

            if existing.status == payment.status {
                outcome.unchanged += 1;
            } else if existing.status.can_transition_to(payment.status) {
                existing.status = payment.status;
                existing.fee_sats = payment.fee_sats;
                outcome.settled += 1;
            } else {
                warn!(
                    payment_id = %existing.id,
                    from = ?existing.status,
                    to = ?payment.status,
                    "Ignoring status change of settled payment"
                );
                outcome.rejected += 1;
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lnwallet_core::{PaymentDirection, PaymentStatus};

    fn payment(id: &str, status: PaymentStatus, ts: i64) -> Payment {
        Payment {
            id: PaymentId::new(id),
            direction: PaymentDirection::Outgoing,
            status,
            amount_sats: 100,
            fee_sats: 1,
            description: None,
            timestamp: Utc.timestamp_opt(ts, 0).single().unwrap(),
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let page = vec![
            payment("a", PaymentStatus::Complete, 30),
            payment("b", PaymentStatus::Pending, 20),
            payment("c", PaymentStatus::Failed, 10),
        ];
        let mut projection = Projection::new();
        let first = projection.merge(page.clone());
        let once = projection.payments();

        let second = projection.merge(page);
        assert_eq!(first.inserted, 3);
        assert_eq!(second.unchanged, 3);
        assert!(!second.changed());
        assert_eq!(projection.payments(), once);
    }

    #[test]
    fn test_pending_settles_in_place() {
        let mut projection = Projection::new();
        projection.merge(vec![
            payment("new", PaymentStatus::Complete, 50),
            payment("p", PaymentStatus::Pending, 40),
            payment("old", PaymentStatus::Complete, 30),
        ]);

        let mut settled = payment("p", PaymentStatus::Complete, 45);
        settled.fee_sats = 3;
        let outcome = projection.merge(vec![settled]);
        assert_eq!(outcome.settled, 1);

        let payments = projection.payments();
        assert_eq!(payments.len(), 3);
        assert_eq!(payments[1].id.as_str(), "p");
        assert_eq!(payments[1].status, PaymentStatus::Complete);
        assert_eq!(payments[1].fee_sats, 3);
        assert_eq!(payments[1].timestamp.timestamp(), 40);
        assert!(projection.pending().is_empty());
    }

    #[test]
    fn test_terminal_status_is_immutable() {
        let mut projection = Projection::new();
        projection.merge(vec![payment("a", PaymentStatus::Failed, 10)]);

        let outcome = projection.merge(vec![
            payment("a", PaymentStatus::Complete, 10),
            payment("a", PaymentStatus::Pending, 10),
        ]);
        assert_eq!(outcome.rejected, 2);
        assert_eq!(
            projection.get(&PaymentId::new("a")).unwrap().status,
            PaymentStatus::Failed
        );
    }

    #[test]
    fn test_order_ties_broken_by_id() {
        let mut projection = Projection::new();
        projection.merge(vec![
            payment("b", PaymentStatus::Complete, 10),
            payment("a", PaymentStatus::Complete, 10),
            payment("c", PaymentStatus::Complete, 11),
        ]);
        let ids: Vec<_> = projection
            .payments()
            .into_iter()
            .map(|p| p.id.0)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut projection = Projection::new();
        projection.set_balance(Balance {
            lightning_sats: 5,
            ..Balance::default()
        });
        projection.merge(vec![
            payment("a", PaymentStatus::Pending, 10),
            payment("b", PaymentStatus::Complete, 20),
        ]);

        let snapshot = projection.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored = Projection::restore(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.pending().len(), 1);
        assert_eq!(restored.balance().unwrap().lightning_sats, 5);
    }
}
