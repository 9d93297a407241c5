//! First-run onboarding state machine
//!
//! `Start -> {Creating, Importing} -> PhraseEstablished -> BackupConfirmed ->
//! SecuritySetupComplete -> Ready`
//!
//! The machine is the single source of truth for the current step. The
//! recovery phrase is stored exactly once, when the backup challenge is
//! answered correctly, so a device lost mid-onboarding is still recoverable
//! from the phrase the user just wrote down.

use crate::{Disposition, OnboardingConfig};
use lnwallet_core::{BackupChallenge, RecoveryPhrase, RecoveryPhraseManager, ValidationError};
use lnwallet_storage::{SecretStore, StoreError};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Onboarding step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingState {
    /// Nothing chosen yet
    Start,
    /// New phrase generated, waiting for reveal and acknowledgement
    Creating,
    /// Waiting for the user's existing phrase
    Importing,
    /// Phrase known, waiting for the backup challenge
    PhraseEstablished,
    /// Challenge passed and phrase stored
    BackupConfirmed,
    /// PIN / biometrics configured
    SecuritySetupComplete,
    /// Terminal
    Ready,
}

impl fmt::Display for OnboardingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OnboardingState::Start => "Start",
            OnboardingState::Creating => "Creating",
            OnboardingState::Importing => "Importing",
            OnboardingState::PhraseEstablished => "PhraseEstablished",
            OnboardingState::BackupConfirmed => "BackupConfirmed",
            OnboardingState::SecuritySetupComplete => "SecuritySetupComplete",
            OnboardingState::Ready => "Ready",
        };
        f.write_str(name)
    }
}

/// Security choices made during onboarding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecuritySetup {
    /// App PIN enabled
    pub pin_enabled: bool,
    /// Biometric unlock enabled
    pub biometrics_enabled: bool,
}

/// Result of [`OnboardingMachine::finish`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyTransition {
    /// This call entered `Ready`
    Entered,
    /// The machine was already `Ready`
    AlreadyReady,
}

/// Onboarding errors
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    /// Action not allowed in the current state
    #[error("Cannot {action} while in state {state}")]
    InvalidTransition {
        /// Current state
        state: OnboardingState,
        /// Attempted action
        action: &'static str,
    },

    /// The generated phrase has not been shown to the user yet
    #[error("Recovery phrase must be revealed before it is acknowledged")]
    NotRevealed,

    /// Imported phrase rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backup challenge answered incorrectly
    #[error("Backup words do not match (attempt {attempts})")]
    ChallengeMismatch {
        /// Failed attempts so far
        attempts: u32,
    },

    /// Phrase generation failed
    #[error("Could not generate recovery phrase: {0}")]
    Generation(lnwallet_core::Error),

    /// Storing the phrase failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OnboardingError {
    /// How the caller should react
    pub fn disposition(&self) -> Disposition {
        match self {
            OnboardingError::Validation(_) | OnboardingError::ChallengeMismatch { .. } => {
                Disposition::Reprompt
            }
            OnboardingError::InvalidTransition { .. } | OnboardingError::NotRevealed => {
                Disposition::Abort
            }
            OnboardingError::Generation(_) | OnboardingError::Store(_) => Disposition::NotifyUser,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            OnboardingError::Validation(e) => e.user_message(),
            OnboardingError::ChallengeMismatch { .. } => {
                "Those words don't match your recovery phrase. Check your backup and try again."
                    .to_string()
            }
            OnboardingError::Store(StoreError::AlreadyInitialized) => {
                "A wallet already exists on this device.".to_string()
            }
            OnboardingError::Store(StoreError::PersistenceFailure(_)) => {
                "Your recovery phrase could not be saved securely. Check that a device passcode is set and try again.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

type Result<T> = std::result::Result<T, OnboardingError>;

/// Drives phrase creation or import, backup confirmation and security setup
pub struct OnboardingMachine {
    store: Arc<SecretStore>,
    challenge_words: usize,
    state: OnboardingState,
    phrase: Option<RecoveryPhrase>,
    revealed: bool,
    challenge: Option<BackupChallenge>,
    attempts: u32,
    security: Option<SecuritySetup>,
}

impl OnboardingMachine {
    /// Create a machine over `store`. Starts in `Ready` if a wallet already
    /// exists.
    pub fn new(store: Arc<SecretStore>, config: &OnboardingConfig) -> Self {
        let state = if store.is_initialized() {
            OnboardingState::Ready
        } else {
            OnboardingState::Start
        };
        Self {
            store,
            challenge_words: config.challenge_words,
            state,
            phrase: None,
            revealed: false,
            challenge: None,
            attempts: 0,
            security: None,
        }
    }

    /// Current step
    pub fn state(&self) -> OnboardingState {
        self.state
    }

    /// Failed backup challenge attempts; no limit is enforced here
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Positions (0-based) the user must replay, once the phrase is established
    pub fn challenge(&self) -> Option<&BackupChallenge> {
        self.challenge.as_ref()
    }

    /// Security choices, once made
    pub fn security_setup(&self) -> Option<SecuritySetup> {
        self.security
    }

    /// `Start -> Creating`: generate a fresh phrase
    pub fn begin_create(&mut self) -> Result<()> {
        self.expect_state(OnboardingState::Start, "create a wallet")?;
        let phrase = RecoveryPhraseManager::generate().map_err(OnboardingError::Generation)?;
        self.phrase = Some(phrase);
        self.revealed = false;
        self.transition(OnboardingState::Creating);
        Ok(())
    }

    /// Show the generated phrase. Required before
    /// [`acknowledge_backup`](Self::acknowledge_backup).
    pub fn reveal(&mut self) -> Result<&RecoveryPhrase> {
        self.expect_state(OnboardingState::Creating, "reveal the phrase")?;
        self.revealed = true;
        self.phrase.as_ref().ok_or(OnboardingError::InvalidTransition {
            state: self.state,
            action: "reveal the phrase",
        })
    }

    /// `Creating -> PhraseEstablished`: the user has written the phrase down
    pub fn acknowledge_backup(&mut self) -> Result<()> {
        self.expect_state(OnboardingState::Creating, "acknowledge the backup")?;
        if !self.revealed {
            return Err(OnboardingError::NotRevealed);
        }
        self.establish();
        Ok(())
    }

    /// `Start -> Importing`
    pub fn begin_import(&mut self) -> Result<()> {
        self.expect_state(OnboardingState::Start, "import a wallet")?;
        self.transition(OnboardingState::Importing);
        Ok(())
    }

    /// `Importing -> PhraseEstablished` if `raw_input` is a valid phrase.
    /// Invalid input leaves the machine in `Importing`.
    pub fn submit_import(&mut self, raw_input: &str) -> Result<()> {
        self.expect_state(OnboardingState::Importing, "submit a phrase")?;
        let phrase = RecoveryPhraseManager::parse(raw_input).map_err(|e| {
            warn!("Imported phrase rejected: {}", e);
            OnboardingError::Validation(e)
        })?;
        self.phrase = Some(phrase);
        self.establish();
        Ok(())
    }

    /// `PhraseEstablished -> BackupConfirmed`.
    ///
    /// `answers` are the words at the challenge positions, in order. A
    /// mismatch keeps the state and increments [`attempts`](Self::attempts).
    /// A match stores the phrase; a store failure also keeps the state.
    pub fn confirm_backup(&mut self, answers: &[String]) -> Result<()> {
        self.expect_state(OnboardingState::PhraseEstablished, "confirm the backup")?;
        let (Some(phrase), Some(challenge)) = (&self.phrase, &self.challenge) else {
            return Err(OnboardingError::InvalidTransition {
                state: self.state,
                action: "confirm the backup",
            });
        };

        if !challenge.verify(phrase, answers) {
            self.attempts += 1;
            warn!(attempts = self.attempts, "Backup challenge failed");
            return Err(OnboardingError::ChallengeMismatch {
                attempts: self.attempts,
            });
        }

        self.store.store(phrase)?;
        self.transition(OnboardingState::BackupConfirmed);
        Ok(())
    }

    /// `BackupConfirmed -> SecuritySetupComplete`
    pub fn complete_security_setup(&mut self, setup: SecuritySetup) -> Result<()> {
        self.expect_state(OnboardingState::BackupConfirmed, "complete security setup")?;
        self.security = Some(setup);
        self.transition(OnboardingState::SecuritySetupComplete);
        Ok(())
    }

    /// `SecuritySetupComplete -> Ready`. Calling again once `Ready` is a
    /// no-op success.
    pub fn finish(&mut self) -> Result<ReadyTransition> {
        match self.state {
            OnboardingState::Ready => Ok(ReadyTransition::AlreadyReady),
            OnboardingState::SecuritySetupComplete => {
                self.clear_phrase();
                self.transition(OnboardingState::Ready);
                Ok(ReadyTransition::Entered)
            }
            state => Err(OnboardingError::InvalidTransition {
                state,
                action: "finish onboarding",
            }),
        }
    }

    /// Abandon the flow and return to `Start`. Only allowed before the
    /// phrase is stored.
    pub fn cancel(&mut self) -> Result<()> {
        match self.state {
            OnboardingState::Start => Ok(()),
            OnboardingState::Creating
            | OnboardingState::Importing
            | OnboardingState::PhraseEstablished => {
                self.clear_phrase();
                self.attempts = 0;
                self.transition(OnboardingState::Start);
                Ok(())
            }
            state => Err(OnboardingError::InvalidTransition {
                state,
                action: "cancel onboarding",
            }),
        }
    }

    fn establish(&mut self) {
        if let Some(phrase) = &self.phrase {
            self.challenge = Some(BackupChallenge::random(phrase, self.challenge_words));
        }
        self.attempts = 0;
        self.transition(OnboardingState::PhraseEstablished);
    }

    fn clear_phrase(&mut self) {
        // RecoveryPhrase zeroises its words on drop
        self.phrase = None;
        self.challenge = None;
        self.revealed = false;
    }

    fn expect_state(&self, expected: OnboardingState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(OnboardingError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    fn transition(&mut self, next: OnboardingState) {
        info!(from = %self.state, to = %next, "Onboarding transition");
        self.state = next;
    }
}
