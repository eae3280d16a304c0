//! # Recovery Phrase (BIP-39)
//!
//! A 12-word mnemonic: 128 bits of entropy, the seed material for the
//! hierarchical-deterministic key tree in [`super::hdkey`].

use bip39::{Language, Mnemonic};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Number of words in a generated mnemonic.
pub const WORD_COUNT: usize = 12;

/// A BIP-39 recovery phrase.
///
/// Zeroized on drop; `Debug` is redacted so the phrase never lands in a log
/// line by accident.
#[derive(Clone, ZeroizeOnDrop)]
pub struct RecoveryPhrase {
    phrase: String,
}

impl RecoveryPhrase {
    /// Generate a fresh 12-word mnemonic using the OS RNG.
    pub fn generate() -> Self {
        let mut entropy = [0u8; 16]; // 128 bits -> 12 words
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut entropy);
        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
            .expect("128 bits is valid BIP-39 entropy");
        entropy.zeroize();
        Self {
            phrase: mnemonic.to_string(),
        }
    }

    /// Parse and validate an existing phrase.
    pub fn from_phrase(phrase: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_in(Language::English, phrase)
            .map_err(|e| Error::InvalidRecoveryPhrase(e.to_string()))?;
        if mnemonic.word_count() != WORD_COUNT {
            return Err(Error::InvalidRecoveryPhrase(format!(
                "expected {} words, got {}",
                WORD_COUNT,
                mnemonic.word_count()
            )));
        }
        Ok(Self {
            phrase: mnemonic.to_string(),
        })
    }

    /// The phrase as a space-separated string of words.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Derive the 64-byte BIP-39 seed (PBKDF2-HMAC-SHA512, 2048 rounds, no
    /// passphrase).
    pub fn to_seed(&self) -> zeroize::Zeroizing<[u8; 64]> {
        let mnemonic = Mnemonic::parse_in(Language::English, &self.phrase)
            .expect("phrase was already validated at construction");
        zeroize::Zeroizing::new(mnemonic.to_seed(""))
    }
}

impl std::fmt::Debug for RecoveryPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecoveryPhrase([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_has_twelve_words() {
        let phrase = RecoveryPhrase::generate();
        assert_eq!(phrase.phrase().split_whitespace().count(), WORD_COUNT);
    }

    #[test]
    fn test_generate_is_random() {
        let a = RecoveryPhrase::generate();
        let b = RecoveryPhrase::generate();
        assert_ne!(a.phrase(), b.phrase());
    }

    #[test]
    fn test_roundtrip_from_phrase() {
        let original = RecoveryPhrase::generate();
        let restored = RecoveryPhrase::from_phrase(original.phrase()).unwrap();
        assert_eq!(original.phrase(), restored.phrase());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(RecoveryPhrase::from_phrase("not a valid phrase at all here").is_err());
    }

    #[test]
    fn test_rejects_wrong_word_count() {
        let phrase_24 = "abandon ".repeat(23) + "art";
        assert!(RecoveryPhrase::from_phrase(&phrase_24).is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let phrase = RecoveryPhrase::generate();
        let debug = format!("{:?}", phrase);
        assert_eq!(debug, "RecoveryPhrase([REDACTED])");
    }

    #[test]
    fn test_seed_is_deterministic() {
        let phrase = RecoveryPhrase::generate();
        let seed1 = phrase.to_seed();
        let seed2 = phrase.to_seed();
        assert_eq!(*seed1, *seed2);
    }
}
