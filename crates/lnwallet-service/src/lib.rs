//! Wallet service layer
//!
//! Wires the recovery phrase store, routing policy and synchroniser behind
//! [`WalletService`], sequences first-run setup through
//! [`OnboardingMachine`], and maps every lower-layer failure to a
//! [`Disposition`] the presentation layer acts on.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod onboarding;
pub mod wallet;

pub use config::{OnboardingConfig, WalletConfig};
pub use error::{Disposition, Error, ErrorCategory, Result};
pub use logging::{init_tracing, init_tracing_with_default};
pub use onboarding::{
    OnboardingError, OnboardingMachine, OnboardingState, ReadyTransition, SecuritySetup,
};
pub use wallet::{ResetConfirmation, WalletService};
