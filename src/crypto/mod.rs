//! # Cryptography
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    KEY HIERARCHY                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                   │
//! │  Recovery Phrase (BIP-39, 12 words / 128 bits)                   │
//! │                          │                                        │
//! │                          ▼                                        │
//! │              BIP-39 Seed (64 bytes)                               │
//! │                          │                                        │
//! │                          ▼  BIP-32: m/44'/0'/account'/0/index     │
//! │              secp256k1 Keypair (JWK)                              │
//! │                     │              │                              │
//! │                     ▼              ▼                              │
//! │            ECDSA sign/verify   ECDH + HKDF + AES-256-GCM          │
//! │            (signing.rs)        (encryption.rs)                    │
//! │                                                                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every structured value is run through [`canonical::canonicalize`] before
//! it is hashed or signed, so the same logical document always produces the
//! same bytes.

pub mod canonical;
pub mod encryption;
pub mod hdkey;
pub mod keys;
pub mod mnemonic;
pub mod signing;

pub use canonical::{canonicalize, canonicalize_value};
pub use encryption::{decrypt_json, decrypt_message, encrypt_json, encrypt_message};
pub use hdkey::HDKey;
pub use keys::{Keypair, PrivateJwk, PublicJwk};
pub use mnemonic::RecoveryPhrase;
pub use signing::{hash_message, sign_hash, verify_sig};
