//! Millisatoshi to satoshi conversion
//!
//! The payment engine reports millisatoshis. Anything the wallet can spend
//! is truncated (floor) so it never shows more than it can afford; anything
//! the user must pay or is still waiting on is rounded up (ceiling) so it is
//! never under-quoted.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Millisatoshis per satoshi
pub const MSAT_PER_SAT: u64 = 1_000;

/// Rounding direction when converting to whole satoshis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Spendable funds and amounts received: floor
    Spendable,
    /// Fees, invoice amounts, pending amounts: ceiling
    Payable,
}

/// Amount in millisatoshis
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Msat(pub u64);

impl Msat {
    /// Zero
    pub const ZERO: Msat = Msat(0);

    /// Engine values arrive as signed integers; negatives are rejected.
    pub fn from_engine(value: i64) -> Result<Self> {
        u64::try_from(value).map(Msat).map_err(|_| {
            Error::Validation(crate::ValidationError::InvalidAmount(format!(
                "negative msat value {}",
                value
            )))
        })
    }

    /// Truncate to whole satoshis
    pub fn floor_sats(self) -> u64 {
        self.0 / MSAT_PER_SAT
    }

    /// Round up to whole satoshis
    pub fn ceil_sats(self) -> u64 {
        self.0.div_ceil(MSAT_PER_SAT)
    }

    /// Convert with an explicit rounding rule
    pub fn to_sats(self, rounding: Rounding) -> u64 {
        match rounding {
            Rounding::Spendable => self.floor_sats(),
            Rounding::Payable => self.ceil_sats(),
        }
    }
}

impl fmt::Display for Msat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} msat", self.0)
    }
}
