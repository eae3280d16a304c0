//! # Wallet store
//!
//! The process-wide persistent state: the encrypted mnemonic, the
//! serialized HD key, the identity/account allocator, and the name/DID
//! tables. A [`WalletStore`] abstracts over *where* the blob lives so the
//! identity/credential engines can be driven against an in-memory fake in
//! tests and a real file on disk in production.

mod file_store;
mod memory_store;

pub use file_store::FileWalletStore;
pub use memory_store::MemoryWalletStore;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The serialized BIP-32 extended key pair, as persisted in the wallet file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedHdKey {
    pub xpriv: String,
    pub xpub: String,
}

/// The seed section of the wallet file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedSection {
    /// The mnemonic, encrypted at rest under a key derived from itself.
    pub mnemonic: String,
    pub hdkey: SerializedHdKey,
}

/// A single managed identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub did: String,
    pub account: u32,
    pub index: u32,
    #[serde(default)]
    pub owned: Vec<String>,
    #[serde(default)]
    pub held: Vec<String>,
}

impl Identity {
    pub fn new(did: String, account: u32) -> Self {
        Self {
            did,
            account,
            index: 0,
            owned: Vec::new(),
            held: Vec::new(),
        }
    }
}

/// The wallet's full persistent state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub seed: SeedSection,
    pub counter: u32,
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub ids: HashMap<String, Identity>,
    #[serde(default)]
    pub names: HashMap<String, String>,
}

impl Wallet {
    /// Build a fresh wallet record around a freshly-encrypted seed section.
    pub fn new(seed: SeedSection) -> Self {
        Self {
            seed,
            counter: 0,
            current: String::new(),
            ids: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// `true` if `name` is already taken by either an identity or an alias.
    pub fn name_taken(&self, name: &str) -> bool {
        self.ids.contains_key(name) || self.names.contains_key(name)
    }

    pub fn current_identity(&self) -> Option<&Identity> {
        if self.current.is_empty() {
            None
        } else {
            self.ids.get(&self.current)
        }
    }

    pub fn current_identity_mut(&mut self) -> Option<&mut Identity> {
        if self.current.is_empty() {
            None
        } else {
            let current = self.current.clone();
            self.ids.get_mut(&current)
        }
    }
}

/// Storage abstraction for the wallet blob: `load`/`save`/`exists`.
///
/// Implementations must make `save` atomic from the perspective of a
/// concurrent `load` — a reader must never observe a partially written
/// blob.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn load(&self) -> Result<Option<Wallet>>;
    async fn save(&self, wallet: &Wallet) -> Result<()>;
    async fn exists(&self) -> Result<bool>;
}
