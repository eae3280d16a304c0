//! # Identity manager
//!
//! ```text
//! (none) --createId(name)--> Active(index=0)
//! Active(i) --rotateKeys()--> Active(i+1)       [requires current]
//! Active(_) --removeId(name)--> (removed locally; DID remains in registry)
//! Active(_) --backupId()--> Active(_) with vault DID in metadata
//! (none) --recoverId(did)--> Active(_) reconstructed from vault
//! ```
//!
//! Every entry point below takes the wallet mutex only after any registry
//! round trip has completed, per the concurrency strategy in [`crate::engine`].

pub mod did;

pub use did::Did;

use std::collections::HashMap;

use serde_json::json;

use crate::crypto::canonical::canonicalize;
use crate::crypto::signing::hash_message;
use crate::engine::{mdip, sign_operation, WalletEngine};
use crate::error::{Error, Result};
use crate::registry::{OpType, Operation};
use crate::wallet::Identity;

/// A directory listing entry: identity name and whether it is `current`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSummary {
    pub name: String,
    pub did: String,
    pub is_current: bool,
}

impl WalletEngine {
    /// `createId(name, registry?)`.
    #[tracing::instrument(skip(self))]
    pub async fn create_id(&self, name: &str, registry: Option<&str>) -> Result<Did> {
        let registry = registry.unwrap_or("peerbit");

        let account = {
            let wallet = self.wallet.lock().await;
            if wallet.name_taken(name) {
                return Err(Error::NameTaken(name.to_string()));
            }
            wallet.counter
        };

        let keypair = self.keypair_for(account, 0)?;
        let op = Operation {
            op: OpType::Create,
            did: None,
            mdip: mdip("create", registry),
            public_jwk: Some(keypair.public_jwk()),
            doc: None,
            prev: None,
            signature: None,
        };
        // A create operation is self-signed: the signer DID is the content
        // hash of this very operation, so it does not exist until after the
        // gatekeeper computes it. The registry verifies the signature
        // against the embedded publicJwk instead of a DID lookup.
        let signed_op = sign_operation(op, "", keypair.private_jwk())?;

        let did = self.gatekeeper.create_did(signed_op).await?;

        let mut wallet = self.wallet.lock().await;
        if wallet.name_taken(name) {
            return Err(Error::NameTaken(name.to_string()));
        }
        wallet
            .ids
            .insert(name.to_string(), Identity::new(did.as_str().to_string(), account));
        wallet.current = name.to_string();
        wallet.counter += 1;
        self.store.save(&wallet).await?;

        Ok(did)
    }

    /// `useId(name)`.
    pub async fn use_id(&self, name: &str) -> Result<()> {
        let mut wallet = self.wallet.lock().await;
        if !wallet.ids.contains_key(name) {
            return Err(Error::NoSuchId(name.to_string()));
        }
        wallet.current = name.to_string();
        self.store.save(&wallet).await?;
        Ok(())
    }

    /// `listIds()`.
    pub async fn list_ids(&self) -> Vec<IdSummary> {
        let wallet = self.wallet.lock().await;
        let mut out: Vec<IdSummary> = wallet
            .ids
            .iter()
            .map(|(name, identity)| IdSummary {
                name: name.clone(),
                did: identity.did.clone(),
                is_current: *name == wallet.current,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// `removeId(name)`.
    pub async fn remove_id(&self, name: &str) -> Result<()> {
        let mut wallet = self.wallet.lock().await;
        if wallet.ids.remove(name).is_none() {
            return Err(Error::NoSuchId(name.to_string()));
        }
        if wallet.current == name {
            wallet.current = String::new();
        }
        self.store.save(&wallet).await?;
        Ok(())
    }

    /// `addName(alias, did)`: register a human-readable alias for any DID.
    /// Fails `NameAlreadyInUse` if `alias` collides with an identity name or
    /// an existing alias — `ids` and `names` share one namespace.
    pub async fn add_name(&self, alias: &str, did: &str) -> Result<()> {
        let mut wallet = self.wallet.lock().await;
        if wallet.name_taken(alias) {
            return Err(Error::NameAlreadyInUse);
        }
        wallet.names.insert(alias.to_string(), did.to_string());
        self.store.save(&wallet).await?;
        Ok(())
    }

    /// `removeName(alias)`: idempotent — removing an alias that was never
    /// registered still reports success.
    pub async fn remove_name(&self, alias: &str) -> Result<bool> {
        let mut wallet = self.wallet.lock().await;
        wallet.names.remove(alias);
        self.store.save(&wallet).await?;
        Ok(true)
    }

    /// `rotateKeys()`.
    #[tracing::instrument(skip(self))]
    pub async fn rotate_keys(&self) -> Result<()> {
        let (account, index, did_str) = {
            let wallet = self.wallet.lock().await;
            let identity = wallet.current_identity().ok_or(Error::NoCurrentId)?;
            (identity.account, identity.index, identity.did.clone())
        };

        let did = Did::parse(&did_str)?;
        let resolved = self.gatekeeper.resolve_did(&did).await?;
        let prev = resolved.did_document_metadata.version_id.clone();

        let old_keypair = self.keypair_for(account, index)?;
        let new_keypair = self.keypair_for(account, index + 1)?;

        let op = Operation {
            op: OpType::Update,
            did: Some(did_str.clone()),
            mdip: mdip("update", "peerbit"),
            public_jwk: Some(new_keypair.public_jwk()),
            doc: None,
            prev,
            signature: None,
        };
        let signed_op = sign_operation(op, &did_str, old_keypair.private_jwk())?;
        self.gatekeeper.update_did(signed_op).await?;

        let mut wallet = self.wallet.lock().await;
        let identity = wallet.current_identity_mut().ok_or(Error::NoCurrentId)?;
        identity.index += 1;
        self.store.save(&wallet).await?;
        Ok(())
    }

    /// `backupWallet()`: encrypt the serialized wallet and anchor the
    /// ciphertext as a data-DID controlled by the wallet's own mnemonic-derived
    /// account-0 key.
    #[tracing::instrument(skip(self))]
    pub async fn backup_wallet(&self) -> Result<Did> {
        let wallet_json = {
            let wallet = self.wallet.lock().await;
            canonicalize(&*wallet)?
        };

        let keypair = self.keypair_for(0, 0)?;
        let envelope = crate::crypto::encryption::encrypt_message(
            &wallet_json,
            keypair.private_jwk(),
            &keypair.public_jwk(),
        )?;

        let op = Operation {
            op: OpType::Create,
            did: None,
            mdip: mdip("create", "peerbit"),
            public_jwk: None,
            doc: Some(json!({ "data": { "kind": "wallet-backup", "ciphertext": envelope } })),
            prev: None,
            signature: None,
        };
        let signed_op = sign_operation(op, "", keypair.private_jwk())?;
        self.gatekeeper.create_did(signed_op).await
    }

    /// `recoverWallet(did)`.
    #[tracing::instrument(skip(self))]
    pub async fn recover_wallet(&self, did: &Did) -> Result<()> {
        let document = self.gatekeeper.resolve_did(did).await?;
        let ciphertext = document
            .did_document_metadata
            .data
            .as_ref()
            .and_then(|d| d.get("ciphertext"))
            .and_then(|c| c.as_str())
            .ok_or(Error::CannotRecoverWallet)?;

        let keypair = self.keypair_for(0, 0)?;
        let plaintext = crate::crypto::encryption::decrypt_message(
            ciphertext,
            keypair.private_jwk(),
            &keypair.public_jwk(),
        )
        .map_err(|_| Error::CannotRecoverWallet)?;

        let restored: crate::wallet::Wallet =
            serde_json::from_str(&plaintext).map_err(|_| Error::CannotRecoverWallet)?;

        let mut wallet = self.wallet.lock().await;
        *wallet = restored;
        self.store.save(&wallet).await?;
        Ok(())
    }

    /// `backupId()`: places an encrypted blob of the current identity
    /// (including `owned`/`held`) into a vault DID, referenced from the
    /// controller DID's metadata.
    #[tracing::instrument(skip(self))]
    pub async fn backup_id(&self) -> Result<Did> {
        let (account, identity, did_str) = {
            let wallet = self.wallet.lock().await;
            let identity = wallet.current_identity().ok_or(Error::NoCurrentId)?.clone();
            (identity.account, identity.clone(), identity.did.clone())
        };

        let keypair = self.keypair_for(account, identity.index)?;
        let identity_json = canonicalize(&identity)?;
        let envelope = crate::crypto::encryption::encrypt_message(
            &identity_json,
            keypair.private_jwk(),
            &keypair.public_jwk(),
        )?;

        let vault_op = Operation {
            op: OpType::Create,
            did: None,
            mdip: mdip("create", "peerbit"),
            public_jwk: None,
            doc: Some(json!({ "data": { "kind": "identity-vault", "ciphertext": envelope } })),
            prev: None,
            signature: None,
        };
        let signed_vault_op = sign_operation(vault_op, &did_str, keypair.private_jwk())?;
        let vault_did = self.gatekeeper.create_did(signed_vault_op).await?;

        let did = Did::parse(&did_str)?;
        let resolved = self.gatekeeper.resolve_did(&did).await?;
        let update_op = Operation {
            op: OpType::Update,
            did: Some(did_str.clone()),
            mdip: mdip("update", "peerbit"),
            public_jwk: None,
            doc: Some(json!({ "vault": vault_did.as_str() })),
            prev: resolved.did_document_metadata.version_id.clone(),
            signature: None,
        };
        let signed_update = sign_operation(update_op, &did_str, keypair.private_jwk())?;
        self.gatekeeper.update_did(signed_update).await?;

        Ok(vault_did)
    }

    /// `recoverId(did)`: fails `CannotRecoverId` if the wallet's seed cannot
    /// decrypt the vault (a different wallet is in use).
    #[tracing::instrument(skip(self))]
    pub async fn recover_id(&self, did: &Did) -> Result<String> {
        let document = self.gatekeeper.resolve_did(did).await?;
        let vault_did_str = document
            .did_document_metadata
            .vault
            .ok_or(Error::CannotRecoverId)?;
        let vault_did = Did::parse(&vault_did_str)?;
        let vault_document = self.gatekeeper.resolve_did(&vault_did).await?;
        let ciphertext = vault_document
            .did_document_metadata
            .data
            .as_ref()
            .and_then(|d| d.get("ciphertext"))
            .and_then(|c| c.as_str())
            .ok_or(Error::CannotRecoverId)?;

        for (account, index) in candidate_derivation_points(&self.wallet).await {
            let keypair = match self.keypair_for(account, index) {
                Ok(k) => k,
                Err(_) => continue,
            };
            match crate::crypto::encryption::decrypt_message(
                ciphertext,
                keypair.private_jwk(),
                &keypair.public_jwk(),
            ) {
                Ok(plaintext) => {
                    let identity: Identity = match serde_json::from_str(&plaintext) {
                        Ok(id) => id,
                        Err(_) => continue,
                    };
                    let name = identity.did.clone();
                    let mut wallet = self.wallet.lock().await;
                    wallet.ids.insert(name.clone(), identity);
                    wallet.current = name.clone();
                    self.store.save(&wallet).await?;
                    return Ok(name);
                }
                // A failed AEAD open just means this key wasn't the right
                // one; per the spec, every exhaustion path here collapses to
                // `CannotRecoverId`, not the underlying crypto error.
                Err(_) => continue,
            }
        }
        Err(Error::CannotRecoverId)
    }
}

/// Upper bound on the rotation index scanned per account when recovering an
/// identity that is no longer present in `wallet.ids` (removed locally, or a
/// seed-restored wallet that never held it) — there is nothing left in the
/// wallet to read its actual rotation count from, so this is a generous cap
/// rather than a derived value.
const MAX_RECOVERY_ROTATION_DEPTH: u32 = 64;

/// Every `(account, index)` worth trying to re-derive the vault-decrypting
/// key at: the full allocated account range (`0..wallet.counter`), crossed
/// with every rotation index up to [`MAX_RECOVERY_ROTATION_DEPTH`]. Scanning
/// the allocated range — rather than only accounts already present in
/// `wallet.ids` — is what lets `recoverId` reconstruct an identity that was
/// `removeId`'d locally, or restored into a fresh wallet via `recoverWallet`,
/// as long as the seed matches.
async fn candidate_derivation_points(
    wallet: &tokio::sync::Mutex<crate::wallet::Wallet>,
) -> Vec<(u32, u32)> {
    let wallet = wallet.lock().await;
    let mut points = Vec::new();
    for account in (0..wallet.counter).rev() {
        for index in (0..=MAX_RECOVERY_ROTATION_DEPTH).rev() {
            points.push((account, index));
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use crate::registry::InMemoryGatekeeper;
    use crate::wallet::MemoryWalletStore;
    use std::sync::Arc;

    async fn new_engine() -> WalletEngine {
        let store = Arc::new(MemoryWalletStore::new());
        let gatekeeper = Arc::new(InMemoryGatekeeper::new());
        WalletEngine::create(store, gatekeeper, WalletConfig::default(), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_wallet_starts_empty() {
        let engine = new_engine().await;
        let wallet = engine.wallet.lock().await;
        assert_eq!(wallet.counter, 0);
        assert!(wallet.ids.is_empty());
    }

    #[tokio::test]
    async fn test_create_id_sets_current_and_increments_counter() {
        let engine = new_engine().await;
        engine.create_id("Bob", None).await.unwrap();
        let wallet = engine.wallet.lock().await;
        assert_eq!(wallet.current, "Bob");
        assert_eq!(wallet.counter, 1);
    }

    #[tokio::test]
    async fn test_create_id_twice_fails_name_taken() {
        let engine = new_engine().await;
        engine.create_id("Bob", None).await.unwrap();
        let err = engine.create_id("Bob", None).await.unwrap_err();
        assert!(matches!(err, Error::NameTaken(_)));
    }

    #[tokio::test]
    async fn test_use_id_missing_fails() {
        let engine = new_engine().await;
        let err = engine.use_id("Nobody").await.unwrap_err();
        assert!(matches!(err, Error::NoSuchId(_)));
    }

    #[tokio::test]
    async fn test_remove_current_id_clears_current() {
        let engine = new_engine().await;
        engine.create_id("Bob", None).await.unwrap();
        engine.remove_id("Bob").await.unwrap();
        let wallet = engine.wallet.lock().await;
        assert_eq!(wallet.current, "");
    }

    #[tokio::test]
    async fn test_add_name_then_rejects_collision() {
        let engine = new_engine().await;
        engine.create_id("Bob", None).await.unwrap();
        engine.add_name("bob-work", "did:mdip:somewhere").await.unwrap();

        let err = engine.add_name("Bob", "did:mdip:elsewhere").await.unwrap_err();
        assert!(matches!(err, Error::NameAlreadyInUse));
        let err = engine.add_name("bob-work", "did:mdip:elsewhere").await.unwrap_err();
        assert!(matches!(err, Error::NameAlreadyInUse));
    }

    #[tokio::test]
    async fn test_remove_name_is_idempotent() {
        let engine = new_engine().await;
        engine.add_name("alias", "did:mdip:somewhere").await.unwrap();
        assert!(engine.remove_name("alias").await.unwrap());
        assert!(engine.remove_name("alias").await.unwrap());
        assert!(engine.remove_name("never-registered").await.unwrap());
    }

    #[tokio::test]
    async fn test_rotate_keys_requires_current() {
        let engine = new_engine().await;
        let err = engine.rotate_keys().await.unwrap_err();
        assert!(matches!(err, Error::NoCurrentId));
    }

    #[tokio::test]
    async fn test_rotate_keys_increments_index() {
        let engine = new_engine().await;
        engine.create_id("Bob", None).await.unwrap();
        engine.rotate_keys().await.unwrap();
        let wallet = engine.wallet.lock().await;
        assert_eq!(wallet.ids.get("Bob").unwrap().index, 1);
    }

    #[tokio::test]
    async fn test_backup_and_recover_wallet_roundtrip() {
        let engine = new_engine().await;
        engine.create_id("Bob", None).await.unwrap();
        let did = engine.backup_wallet().await.unwrap();

        let before = {
            let wallet = engine.wallet.lock().await;
            wallet.clone()
        };

        engine.recover_wallet(&did).await.unwrap();

        let after = engine.wallet.lock().await;
        assert_eq!(before.ids.len(), after.ids.len());
        assert_eq!(before.counter, after.counter);
    }

    #[tokio::test]
    async fn test_recover_id_after_local_removal() {
        let engine = new_engine().await;
        let did = engine.create_id("Bob", None).await.unwrap();
        let vault_did = engine.backup_id().await.unwrap();
        engine.remove_id("Bob").await.unwrap();
        {
            let wallet = engine.wallet.lock().await;
            assert!(!wallet.ids.contains_key("Bob"));
        }

        let name = engine.recover_id(&vault_did).await.unwrap();
        assert_eq!(name, did.as_str());
        let wallet = engine.wallet.lock().await;
        assert_eq!(wallet.ids.get(&name).unwrap().did, did.as_str());
        assert_eq!(wallet.current, name);
    }

    #[tokio::test]
    async fn test_recover_id_different_seed_fails() {
        let gatekeeper = Arc::new(InMemoryGatekeeper::new());
        let engine = WalletEngine::create(
            Arc::new(MemoryWalletStore::new()),
            gatekeeper.clone(),
            WalletConfig::default(),
            None,
        )
        .await
        .unwrap();
        engine.create_id("Bob", None).await.unwrap();
        let vault_did = engine.backup_id().await.unwrap();

        let other = WalletEngine::create(
            Arc::new(MemoryWalletStore::new()),
            gatekeeper.clone(),
            WalletConfig::default(),
            None,
        )
        .await
        .unwrap();
        // Give `other` an allocated account range to actually scan, so the
        // failure comes from a real wrong-seed decryption attempt rather than
        // an empty candidate list.
        other.create_id("Carol", None).await.unwrap();
        let err = other.recover_id(&vault_did).await.unwrap_err();
        assert!(matches!(err, Error::CannotRecoverId));
    }
}
