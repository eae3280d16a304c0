//! # MDIP Wallet Core
//!
//! The non-UI engine behind a self-sovereign identity wallet: DID lifecycle
//! management, BIP-32/39 hierarchical key derivation and rotation, ECDH +
//! AEAD message envelopes, and the verifiable-credential issue/attest/
//! accept/revoke/verify pipeline, including challenge/response presentation.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          WALLET CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │  Identity   │  │  Registry   │  │   Wallet    │  │  Credential  │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - did:mdip  │  │ - Gatekeeper│  │ - Seed/HD    │  │ - Envelopes  │   │
//! │  │ - rotate    │  │   trait     │  │   key store  │  │ - VC issue/  │   │
//! │  │ - backup/   │  │ - HTTP +    │  │ - File/      │  │   attest/    │   │
//! │  │   recover   │  │   in-memory │  │   memory     │  │   revoke     │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘  │ - challenge/ │   │
//! │         │                │                │          │   response   │   │
//! │         └────────────────┴────────────────┴──────────┴──────┬───────┘   │
//! │                                   │                          │           │
//! │                                   ▼                          │           │
//! │                          ┌─────────────────┐                 │           │
//! │                          │     Engine      │◄────────────────┘           │
//! │                          │  WalletEngine   │                             │
//! │                          └────────┬────────┘                             │
//! │                                   │                                       │
//! │  ┌─────────────┐  ┌──────────────┴──────┐  ┌─────────────┐              │
//! │  │   Crypto    │  │       Config         │  │    Error    │              │
//! │  │             │  │                      │  │             │              │
//! │  │ - secp256k1 │  │ - env-layered        │  │ - single    │              │
//! │  │ - AES-GCM   │  │   WalletConfig       │  │   typed     │              │
//! │  │ - JCS (RFC  │  │                      │  │   Error enum│              │
//! │  │   8785)     │  │                      │  │             │              │
//! │  └─────────────┘  └──────────────────────┘  └─────────────┘              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - The single typed error spanning every component
//! - [`crypto`] - secp256k1 keys, BIP-39/32 derivation, ECDH envelopes, JCS, signing
//! - [`identity`] - `did:mdip` identifiers and the identity manager (create/rotate/backup/recover)
//! - [`registry`] - The pluggable gatekeeper abstraction (HTTP client + in-memory test fake)
//! - [`wallet`] - Persistent wallet state and its storage abstraction (file + in-memory)
//! - [`credential`] - Message envelopes, verifiable credentials, challenge/response presentation
//! - [`engine`] - [`WalletEngine`], the façade every operation above is implemented against
//! - [`config`] - Layered runtime configuration
//! - [`time`] - RFC 3339 timestamp helpers
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Key Derivation (BIP-39 mnemonic -> BIP-32/44 HD tree)         │
//! │  ────────────────────────────────────────────────────────────          │
//! │  Every identity's signing key is derived deterministically at          │
//! │  m/44'/0'/account'/0/index; only the mnemonic and derivation           │
//! │  coordinates need to be retained to reconstruct any key.               │
//! │                                                                         │
//! │  Layer 2: Message-Level E2E Encryption (ECDH + AES-256-GCM)            │
//! │  ─────────────────────────────────────────────────────────────         │
//! │  Every message is encrypted with a shared secret derived via           │
//! │  secp256k1 ECDH + HKDF-SHA256 between sender and recipient keys.        │
//! │                                                                         │
//! │  Layer 3: Message Authentication (detached ECDSA signatures)           │
//! │  ──────────────────────────────────────────────────────                │
//! │  DID operations, credentials, and challenges are signed over their     │
//! │  RFC 8785 canonical form, preventing forgery and tampering.            │
//! │                                                                         │
//! │  Layer 4: At-Rest Mnemonic Encryption (AES-256-GCM)                    │
//! │  ─────────────────────────────────────────────────                     │
//! │  The mnemonic is never persisted in plaintext; the wallet file         │
//! │  stores it encrypted under a key derived from itself, a round-trip     │
//! │  integrity check rather than a secrecy boundary.                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod config;
pub mod credential;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod identity;
pub mod registry;
/// RFC 3339 timestamp helpers used for signature timestamps and challenge expiry.
pub mod time;
pub mod wallet;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::WalletConfig;
pub use engine::WalletEngine;
pub use error::{Error, Result};
pub use identity::Did;

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of the wallet core.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging.
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version.
    pub version: &'static str,
    /// Build profile (debug/release).
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.version, version());
    }
}
