//! # Hierarchical-Deterministic Key Derivation (BIP-32/BIP-44)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    KEY DERIVATION HIERARCHY                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  BIP-39 Recovery Phrase (12 words, 128 bits of entropy)                │
//! │                          │                                              │
//! │                          ▼  PBKDF2-HMAC-SHA512 (2048 rounds)           │
//! │                  BIP-39 Seed (64 bytes)                                │
//! │                          │                                              │
//! │                          ▼  BIP-32                                     │
//! │           m/44'/0'/<account>'/0/<index>                                │
//! │                          │                                              │
//! │                          ▼                                              │
//! │            secp256k1 Keypair (signing + ECDH)                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `account` is the hardened component that identifies an [`crate::identity::Identity`];
//! `index` is the unhardened rotation counter within that identity.

use std::str::FromStr;

use bip32::{DerivationPath, Prefix, XPrv};
use k256::ecdsa::SigningKey;
use zeroize::Zeroizing;

use crate::crypto::keys::Keypair;
use crate::crypto::mnemonic::RecoveryPhrase;
use crate::error::{Error, Result};

/// BIP-44 purpose field used by every derivation path in this wallet.
pub const PURPOSE: u32 = 44;

/// BIP-44 coin type. `0` is used as a placeholder; the DID method does not
/// correspond to a single registered coin.
pub const COIN_TYPE: u32 = 0;

/// A BIP-32 extended key tree rooted at a wallet's BIP-39 seed.
pub struct HDKey {
    seed: Zeroizing<[u8; 64]>,
}

impl HDKey {
    /// Derive the root key tree from a recovery phrase.
    pub fn from_mnemonic(phrase: &RecoveryPhrase) -> Self {
        Self {
            seed: phrase.to_seed(),
        }
    }

    /// Reconstruct from a previously-extracted 64-byte seed.
    pub fn from_seed(seed: [u8; 64]) -> Self {
        Self {
            seed: Zeroizing::new(seed),
        }
    }

    fn path_for(account: u32, index: u32) -> Result<DerivationPath> {
        let path_str = format!("m/{PURPOSE}'/{COIN_TYPE}'/{account}'/0/{index}");
        DerivationPath::from_str(&path_str)
            .map_err(|e| Error::KeyDerivationFailed(format!("bad derivation path: {e}")))
    }

    /// Derive the secp256k1 keypair at `m/44'/0'/account'/0/index`.
    ///
    /// `account` is hardened; `index` is not, matching the path the rest of
    /// this spec assumes.
    pub fn derive(&self, account: u32, index: u32) -> Result<Keypair> {
        let path = Self::path_for(account, index)?;
        let xprv = XPrv::derive_from_path(&*self.seed, &path)
            .map_err(|e| Error::KeyDerivationFailed(e.to_string()))?;

        let secret_bytes = xprv.private_key().to_bytes();
        let signing_key = SigningKey::from_slice(secret_bytes.as_slice())
            .map_err(|e| Error::KeyDerivationFailed(e.to_string()))?;

        Ok(Keypair::from_signing_key(&signing_key))
    }

    /// Serialize the root extended private and public keys for persistence
    /// in the wallet file (`seed.hdkey.xpriv` / `seed.hdkey.xpub`).
    pub fn extended_keys(&self) -> Result<(String, String)> {
        let xprv = XPrv::new(&*self.seed)
            .map_err(|e| Error::KeyDerivationFailed(e.to_string()))?;
        let xpub = xprv.public_key();
        Ok((
            xprv.to_string(Prefix::XPRV).to_string(),
            xpub.to_string(Prefix::XPUB),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let phrase = RecoveryPhrase::generate();
        let hdkey = HDKey::from_mnemonic(&phrase);

        let a = hdkey.derive(0, 0).unwrap();
        let b = hdkey.derive(0, 0).unwrap();
        assert_eq!(a.public_jwk(), b.public_jwk());
    }

    #[test]
    fn test_different_accounts_differ() {
        let phrase = RecoveryPhrase::generate();
        let hdkey = HDKey::from_mnemonic(&phrase);

        let a = hdkey.derive(0, 0).unwrap();
        let b = hdkey.derive(1, 0).unwrap();
        assert_ne!(a.public_jwk(), b.public_jwk());
    }

    #[test]
    fn test_rotation_produces_new_key_per_index() {
        let phrase = RecoveryPhrase::generate();
        let hdkey = HDKey::from_mnemonic(&phrase);

        let k0 = hdkey.derive(0, 0).unwrap();
        let k1 = hdkey.derive(0, 1).unwrap();
        let k2 = hdkey.derive(0, 2).unwrap();

        assert_ne!(k0.public_jwk(), k1.public_jwk());
        assert_ne!(k1.public_jwk(), k2.public_jwk());
    }

    #[test]
    fn test_same_seed_reproduces_historical_keys() {
        let phrase = RecoveryPhrase::generate();
        let hdkey_a = HDKey::from_mnemonic(&phrase);
        let hdkey_b = HDKey::from_mnemonic(&phrase);

        for index in 0..4 {
            assert_eq!(
                hdkey_a.derive(0, index).unwrap().public_jwk(),
                hdkey_b.derive(0, index).unwrap().public_jwk()
            );
        }
    }

    #[test]
    fn test_extended_keys_serialize() {
        let phrase = RecoveryPhrase::generate();
        let hdkey = HDKey::from_mnemonic(&phrase);
        let (xpriv, xpub) = hdkey.extended_keys().unwrap();
        assert!(xpriv.starts_with("xprv"));
        assert!(xpub.starts_with("xpub"));
    }
}
