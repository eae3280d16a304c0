//! # Wallet engine
//!
//! The façade the identity manager (§4.D) and credential/messaging engine
//! (§4.E) are implemented against: a single [`Wallet`] guarded by a
//! `tokio::sync::Mutex`, a pluggable [`WalletStore`], and a pluggable
//! [`Gatekeeper`].
//!
//! Registry I/O always completes before the mutex is taken for the
//! mutate-then-save critical section, so the lock is never held across an
//! `.await` on network I/O.

use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::config::WalletConfig;
use crate::crypto::canonical::canonicalize;
use crate::crypto::hdkey::HDKey;
use crate::crypto::keys::{Keypair, PrivateJwk};
use crate::crypto::mnemonic::RecoveryPhrase;
use crate::crypto::signing::{hash_message, sign_hash};
use crate::error::{Error, Result};
use crate::registry::{Gatekeeper, Mdip, Operation, OperationSignature};
use crate::wallet::{SeedSection, SerializedHdKey, Wallet, WalletStore};

/// Ties together persistent wallet state, the derivation tree, the storage
/// backend, and the registry client.
pub struct WalletEngine {
    pub(crate) wallet: Mutex<Wallet>,
    mnemonic: RecoveryPhrase,
    hdkey: HDKey,
    pub(crate) store: Arc<dyn WalletStore>,
    pub(crate) gatekeeper: Arc<dyn Gatekeeper>,
    pub(crate) config: WalletConfig,
}

fn mnemonic_key(phrase: &RecoveryPhrase) -> [u8; 32] {
    Sha256::digest(phrase.phrase().as_bytes()).into()
}

/// Encrypt the mnemonic under a key derived from itself: a round-trip
/// consistency check, not a secrecy boundary (the plaintext mnemonic is
/// never persisted; it lives only in [`WalletEngine::mnemonic`] for the
/// life of the process).
fn encrypt_mnemonic_blob(phrase: &RecoveryPhrase) -> Result<String> {
    let key_bytes = mnemonic_key(phrase);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));

    let mut nonce_bytes = [0u8; 12];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, phrase.phrase().as_bytes())
        .map_err(|e| Error::KeyExchangeFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(12 + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(URL_SAFE_NO_PAD.encode(out))
}

fn decrypt_mnemonic_blob(blob: &str, phrase: &RecoveryPhrase) -> Result<String> {
    let raw = URL_SAFE_NO_PAD
        .decode(blob)
        .map_err(|_| Error::CannotRecoverWallet)?;
    if raw.len() < 12 {
        return Err(Error::CannotRecoverWallet);
    }
    let (nonce_bytes, ciphertext) = raw.split_at(12);
    let key_bytes = mnemonic_key(phrase);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| Error::CannotRecoverWallet)?;
    String::from_utf8(plaintext).map_err(|_| Error::CannotRecoverWallet)
}

impl WalletEngine {
    /// `newWallet(mnemonic?)`: build and persist a fresh wallet, overwriting
    /// any existing state unconditionally.
    pub async fn create(
        store: Arc<dyn WalletStore>,
        gatekeeper: Arc<dyn Gatekeeper>,
        config: WalletConfig,
        mnemonic: Option<RecoveryPhrase>,
    ) -> Result<Self> {
        let mnemonic = mnemonic.unwrap_or_else(RecoveryPhrase::generate);
        let hdkey = HDKey::from_mnemonic(&mnemonic);
        let (xpriv, xpub) = hdkey.extended_keys()?;
        let encrypted_mnemonic = encrypt_mnemonic_blob(&mnemonic)?;

        let wallet = Wallet::new(SeedSection {
            mnemonic: encrypted_mnemonic,
            hdkey: SerializedHdKey { xpriv, xpub },
        });
        store.save(&wallet).await?;

        Ok(Self {
            wallet: Mutex::new(wallet),
            mnemonic,
            hdkey,
            store,
            gatekeeper,
            config,
        })
    }

    /// Load a previously-created wallet; the caller must supply the
    /// mnemonic that unlocks it (it is never reconstructible from the
    /// wallet file alone — see [`encrypt_mnemonic_blob`]).
    pub async fn open(
        store: Arc<dyn WalletStore>,
        gatekeeper: Arc<dyn Gatekeeper>,
        config: WalletConfig,
        mnemonic: RecoveryPhrase,
    ) -> Result<Self> {
        let wallet = store
            .load()
            .await?
            .ok_or_else(|| Error::StorageReadError("no wallet found".to_string()))?;
        let hdkey = HDKey::from_mnemonic(&mnemonic);

        Ok(Self {
            wallet: Mutex::new(wallet),
            mnemonic,
            hdkey,
            store,
            gatekeeper,
            config,
        })
    }

    /// `decryptMnemonic()`: a round-trip test, returning the plaintext
    /// mnemonic if the stored ciphertext still decrypts to it.
    pub async fn decrypt_mnemonic(&self) -> Result<String> {
        let wallet = self.wallet.lock().await;
        let plaintext = decrypt_mnemonic_blob(&wallet.seed.mnemonic, &self.mnemonic)?;
        if plaintext != self.mnemonic.phrase() {
            return Err(Error::CannotRecoverWallet);
        }
        Ok(plaintext)
    }

    pub(crate) fn mnemonic(&self) -> &RecoveryPhrase {
        &self.mnemonic
    }

    pub(crate) fn keypair_for(&self, account: u32, index: u32) -> Result<Keypair> {
        self.hdkey.derive(account, index)
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }
}

/// Sign a canonicalized operation (with any existing `signature` stripped)
/// and attach an `OperationSignature`.
pub(crate) fn sign_operation(
    mut op: Operation,
    signer: &str,
    private: &PrivateJwk,
) -> Result<Operation> {
    op.signature = None;
    let canonical = canonicalize(&op)?;
    let hash = hash_message(&canonical);
    let value = sign_hash(&hash, private)?;

    op.signature = Some(OperationSignature {
        signer: signer.to_string(),
        signed: crate::time::now_iso(),
        hash,
        value,
    });
    Ok(op)
}

pub(crate) fn mdip(op_type: &str, registry: &str) -> Mdip {
    Mdip::new(op_type, registry)
}
