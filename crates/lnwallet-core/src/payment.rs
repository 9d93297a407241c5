//! Balance and payment model
//!
//! Values here are already in whole satoshis; conversion from the engine's
//! millisatoshi figures happens once, at construction.

use crate::{Msat, Rounding};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Wallet balance in satoshis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Spendable over Lightning (floored)
    pub lightning_sats: u64,
    /// Spendable on-chain (floored)
    pub onchain_sats: u64,
    /// Incoming, not yet settled (ceiled)
    pub pending_incoming_sats: u64,
    /// Outgoing, not yet settled (ceiled)
    pub pending_outgoing_sats: u64,
}

impl Balance {
    /// Convert engine-reported millisatoshis.
    ///
    /// Spendable figures are floored, pending figures are ceiled.
    pub fn from_msat(lightning: Msat, onchain: Msat, pending_in: Msat, pending_out: Msat) -> Self {
        Self {
            lightning_sats: lightning.to_sats(Rounding::Spendable),
            onchain_sats: onchain.to_sats(Rounding::Spendable),
            pending_incoming_sats: pending_in.to_sats(Rounding::Payable),
            pending_outgoing_sats: pending_out.to_sats(Rounding::Payable),
        }
    }

    /// Lightning plus on-chain, `None` on overflow
    pub fn spendable_sats(&self) -> Option<u64> {
        self.lightning_sats.checked_add(self.onchain_sats)
    }
}

/// Stable payment identifier, the dedup key across sync pages
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl PaymentId {
    /// Wrap an engine id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payment direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentDirection {
    /// Received
    Incoming,
    /// Sent
    Outgoing,
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// In flight
    Pending,
    /// Settled
    Complete,
    /// Failed or expired
    Failed,
}

impl PaymentStatus {
    /// Complete and Failed are terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Pending may move to a terminal state once; terminal states never move.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        *self == next || (*self == Self::Pending && next.is_terminal())
    }
}

/// A wallet payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique, stable id
    pub id: PaymentId,
    /// Direction
    pub direction: PaymentDirection,
    /// Status
    pub status: PaymentStatus,
    /// Amount in satoshis
    pub amount_sats: u64,
    /// Fee in satoshis (ceiled)
    pub fee_sats: u64,
    /// Optional memo/description
    pub description: Option<String>,
    /// When the payment was created
    pub timestamp: DateTime<Utc>,
}

impl Payment {
    /// Build from engine millisatoshi figures.
    ///
    /// Incoming amounts are floored (what actually arrived). Outgoing amounts
    /// and fees are ceiled (what the user pays).
    pub fn from_msat(
        id: PaymentId,
        direction: PaymentDirection,
        status: PaymentStatus,
        amount: Msat,
        fee: Msat,
        description: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let amount_sats = match direction {
            PaymentDirection::Incoming => amount.to_sats(Rounding::Spendable),
            PaymentDirection::Outgoing => amount.to_sats(Rounding::Payable),
        };
        Self {
            id,
            direction,
            status,
            amount_sats,
            fee_sats: fee.to_sats(Rounding::Payable),
            description,
            timestamp,
        }
    }

    /// Display order: newest first, ties broken by id so the order is total.
    pub fn display_cmp(&self, other: &Payment) -> Ordering {
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn test_balance_rounding() {
        let balance = Balance::from_msat(Msat(1500), Msat(2999), Msat(1500), Msat(1));
        assert_eq!(balance.lightning_sats, 1);
        assert_eq!(balance.onchain_sats, 2);
        assert_eq!(balance.pending_incoming_sats, 2);
        assert_eq!(balance.pending_outgoing_sats, 1);
        assert_eq!(balance.spendable_sats(), Some(3));
    }

    #[test]
    fn test_status_transitions() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Complete));
        assert!(Pending.can_transition_to(Failed));
        assert!(Complete.can_transition_to(Complete));
        assert!(!Complete.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Pending));
        assert!(!Complete.can_transition_to(Pending));
    }

    #[test]
    fn test_payment_amount_rounding_by_direction() {
        let incoming = Payment::from_msat(
            PaymentId::new("in"),
            PaymentDirection::Incoming,
            PaymentStatus::Complete,
            Msat(1500),
            Msat::ZERO,
            None,
            at(0),
        );
        let outgoing = Payment::from_msat(
            PaymentId::new("out"),
            PaymentDirection::Outgoing,
            PaymentStatus::Complete,
            Msat(1500),
            Msat(10),
            None,
            at(0),
        );
        assert_eq!(incoming.amount_sats, 1);
        assert_eq!(outgoing.amount_sats, 2);
        assert_eq!(outgoing.fee_sats, 1);
    }

    #[test]
    fn test_display_order() {
        let make = |id: &str, secs| {
            Payment::from_msat(
                PaymentId::new(id),
                PaymentDirection::Incoming,
                PaymentStatus::Complete,
                Msat(1000),
                Msat::ZERO,
                None,
                at(secs),
            )
        };
        let mut payments = vec![make("b", 10), make("c", 20), make("a", 10)];
        payments.sort_by(Payment::display_cmp);
        let ids: Vec<_> = payments.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&PaymentStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
