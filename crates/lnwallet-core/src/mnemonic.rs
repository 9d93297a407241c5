//! Recovery phrase management
//!
//! 24-word BIP-39 phrases over the English wordlist. Wordlist lookup and
//! checksum math are delegated to the `bip39` crate; this module owns the
//! phrase lifecycle around them: generation from OS entropy, normalisation of
//! typed or pasted input, validation that never panics, and the word-position
//! challenge used to confirm a written backup.

use crate::{Error, Result, ValidationError};
use bip39::{Language, Mnemonic};
use rand::rngs::OsRng;
use rand::seq::index;
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// Words in a recovery phrase
pub const PHRASE_WORD_COUNT: usize = 24;

/// Entropy behind a 24-word phrase (256 bits)
pub const PHRASE_ENTROPY_BYTES: usize = 32;

/// Words asked back during backup confirmation
pub const DEFAULT_CHALLENGE_WORDS: usize = 3;

/// A validated 24-word recovery phrase.
///
/// Words are zeroized on drop. `Debug` is redacted and there is no `Display`,
/// so a phrase cannot end up in a log line by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct RecoveryPhrase {
    words: Zeroizing<Vec<String>>,
}

impl RecoveryPhrase {
    /// Build a phrase from raw entropy.
    pub fn from_entropy(entropy: &[u8; PHRASE_ENTROPY_BYTES]) -> Result<Self> {
        let mnemonic = Mnemonic::from_entropy_in(Language::English, entropy)
            .map_err(|e| Error::EntropyUnavailable(e.to_string()))?;
        let words = mnemonic.words().map(str::to_string).collect();
        Ok(Self {
            words: Zeroizing::new(words),
        })
    }

    /// Build a phrase from words, validating them first.
    pub fn from_words(words: &[String]) -> std::result::Result<Self, ValidationError> {
        RecoveryPhraseManager::validate_words(words)?;
        Ok(Self {
            words: Zeroizing::new(words.to_vec()),
        })
    }

    /// Words in order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Word at a 0-based position
    pub fn word(&self, position: usize) -> Option<&str> {
        self.words.get(position).map(String::as_str)
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false for a constructed phrase
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Space-separated phrase, zeroized when dropped
    pub fn to_phrase_string(&self) -> Zeroizing<String> {
        Zeroizing::new(self.words.join(" "))
    }
}

impl fmt::Debug for RecoveryPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoveryPhrase({} words, redacted)", self.words.len())
    }
}

/// Stateless phrase operations.
pub struct RecoveryPhraseManager;

impl RecoveryPhraseManager {
    /// Generate a fresh phrase from the OS CSPRNG.
    ///
    /// Fails only when the entropy source cannot be read.
    pub fn generate() -> Result<RecoveryPhrase> {
        let mut entropy = [0u8; PHRASE_ENTROPY_BYTES];
        OsRng
            .try_fill_bytes(&mut entropy)
            .map_err(|e| Error::EntropyUnavailable(e.to_string()))?;

        let phrase = RecoveryPhrase::from_entropy(&entropy);
        entropy.zeroize();

        if phrase.is_ok() {
            tracing::debug!("Generated new recovery phrase");
        }
        phrase
    }

    /// True iff every word is in the wordlist, there are exactly 24 of them
    /// and the checksum verifies.
    pub fn validate(candidate: &[String]) -> bool {
        Self::validate_words(candidate).is_ok()
    }

    /// Like [`validate`](Self::validate) but reports why a candidate failed.
    pub fn validate_words(candidate: &[String]) -> std::result::Result<(), ValidationError> {
        if candidate.len() != PHRASE_WORD_COUNT {
            return Err(ValidationError::WordCount {
                expected: PHRASE_WORD_COUNT,
                found: candidate.len(),
            });
        }

        let language = Language::English;
        if let Some(position) = candidate
            .iter()
            .position(|word| language.find_word(word).is_none())
        {
            return Err(ValidationError::UnknownWord { position });
        }

        let joined = Zeroizing::new(candidate.join(" "));
        match Mnemonic::parse_in_normalized(language, &joined) {
            Ok(_) => Ok(()),
            Err(bip39::Error::BadWordCount(found)) => Err(ValidationError::WordCount {
                expected: PHRASE_WORD_COUNT,
                found,
            }),
            Err(bip39::Error::UnknownWord(position)) => {
                Err(ValidationError::UnknownWord { position })
            }
            Err(_) => Err(ValidationError::InvalidChecksum),
        }
    }

    /// Lower-case, trim and split on any whitespace.
    ///
    /// Pasted phrases (newlines, tabs, repeated spaces, odd casing) and
    /// hand-typed ones normalise to the same word sequence.
    pub fn normalize(raw_input: &str) -> Vec<String> {
        raw_input
            .trim()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect()
    }

    /// Normalise then validate, returning the phrase.
    pub fn parse(raw_input: &str) -> std::result::Result<RecoveryPhrase, ValidationError> {
        let words = Zeroizing::new(Self::normalize(raw_input));
        RecoveryPhrase::from_words(&words)
    }
}

/// Word-position challenge used to confirm a written-down backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupChallenge {
    positions: Vec<usize>,
}

impl BackupChallenge {
    /// Pick `count` distinct positions, sorted ascending.
    ///
    /// `count` is clamped to the phrase length.
    pub fn random(phrase: &RecoveryPhrase, count: usize) -> Self {
        let count = count.clamp(1, phrase.len().max(1));
        let mut positions = index::sample(&mut OsRng, phrase.len(), count).into_vec();
        positions.sort_unstable();
        Self { positions }
    }

    /// Challenge over explicit 0-based positions.
    pub fn with_positions(mut positions: Vec<usize>) -> Self {
        positions.sort_unstable();
        positions.dedup();
        Self { positions }
    }

    /// 0-based positions asked for
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// 1-based positions for display ("word #3")
    pub fn display_positions(&self) -> Vec<usize> {
        self.positions.iter().map(|p| p + 1).collect()
    }

    /// Check answers given in the same order as [`positions`](Self::positions).
    ///
    /// Each answer is normalised before comparison; every answer must match
    /// exactly and the answer count must equal the position count.
    pub fn verify(&self, phrase: &RecoveryPhrase, answers: &[String]) -> bool {
        if answers.len() != self.positions.len() {
            return false;
        }
        self.positions
            .iter()
            .zip(answers)
            .all(|(&position, answer)| {
                let normalized = RecoveryPhraseManager::normalize(answer);
                match (phrase.word(position), normalized.as_slice()) {
                    (Some(expected), [given]) => expected == given,
                    _ => false,
                }
            })
    }
}
