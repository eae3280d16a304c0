//! # Message Envelopes
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                ASYMMETRIC MESSAGE ENVELOPE                    │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                                │
//! │  sender privateJwk ──┐                                        │
//! │                      ├─ ECDH (secp256k1) ─► shared secret     │
//! │  recipient publicJwk ┘                          │              │
//! │                                                  ▼              │
//! │                                    HKDF-SHA256 ─► 256-bit key  │
//! │                                                  │              │
//! │                                                  ▼              │
//! │                         AES-256-GCM(random 96-bit nonce)       │
//! │                                                  │              │
//! │                                                  ▼              │
//! │                         base64url(nonce ‖ ciphertext)          │
//! │                                                                │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decryption runs the identical ECDH from the other side: the shared secret
//! `dA * QB == dB * QA` is the same regardless of which party computes it.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hkdf::Hkdf;
use k256::ecdh::diffie_hellman;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;

use crate::crypto::keys::{PrivateJwk, PublicJwk};
use crate::error::{Error, Result};

const NONCE_LEN: usize = 12;
const HKDF_INFO: &[u8] = b"mdip-message-envelope-v1";

fn to_secret_key(private: &PrivateJwk) -> Result<k256::SecretKey> {
    let signing_key = private.to_signing_key()?;
    k256::SecretKey::from_slice(&signing_key.to_bytes())
        .map_err(|e| Error::InvalidKey(e.to_string()))
}

fn to_public_key(public: &PublicJwk) -> Result<k256::PublicKey> {
    let verifying_key = public.to_verifying_key()?;
    let encoded = verifying_key.to_encoded_point(false);
    k256::PublicKey::from_sec1_bytes(encoded.as_bytes())
        .map_err(|e| Error::InvalidKey(e.to_string()))
}

fn derive_key(own_private: &PrivateJwk, other_public: &PublicJwk) -> Result<[u8; 32]> {
    let secret_key = to_secret_key(own_private)?;
    let public_key = to_public_key(other_public)?;

    let shared = diffie_hellman(secret_key.to_nonzero_scalar(), public_key.as_affine());
    let hk = Hkdf::<Sha256>::new(None, shared.raw_secret_bytes().as_slice());

    let mut okm = [0u8; 32];
    hk.expand(HKDF_INFO, &mut okm)
        .map_err(|e| Error::KeyDerivationFailed(e.to_string()))?;
    Ok(okm)
}

/// Encrypt a UTF-8 message for `recipient_public`, signed implicitly by the
/// ECDH binding to `sender_private`.
pub fn encrypt_message(
    plaintext: &str,
    sender_private: &PrivateJwk,
    recipient_public: &PublicJwk,
) -> Result<String> {
    let key_bytes = derive_key(sender_private, recipient_public)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| Error::KeyExchangeFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(URL_SAFE_NO_PAD.encode(out))
}

/// Decrypt an envelope produced by [`encrypt_message`].
pub fn decrypt_message(
    envelope_b64: &str,
    recipient_private: &PrivateJwk,
    sender_public: &PublicJwk,
) -> Result<String> {
    let raw = URL_SAFE_NO_PAD
        .decode(envelope_b64)
        .map_err(|e| Error::DecryptionFailed(e.to_string()))?;
    if raw.len() < NONCE_LEN {
        return Err(Error::TamperedCiphertext);
    }
    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);

    let key_bytes = derive_key(recipient_private, sender_public)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| Error::TamperedCiphertext)?;

    String::from_utf8(plaintext).map_err(|e| Error::DecryptionFailed(e.to_string()))
}

/// Canonicalize and encrypt a structured value.
pub fn encrypt_json<T: Serialize>(
    value: &T,
    sender_private: &PrivateJwk,
    recipient_public: &PublicJwk,
) -> Result<String> {
    let canonical = crate::crypto::canonical::canonicalize(value)?;
    encrypt_message(&canonical, sender_private, recipient_public)
}

/// Decrypt and parse a structured value produced by [`encrypt_json`].
pub fn decrypt_json<T: DeserializeOwned>(
    envelope_b64: &str,
    recipient_private: &PrivateJwk,
    sender_public: &PublicJwk,
) -> Result<T> {
    let plaintext = decrypt_message(envelope_b64, recipient_private, sender_public)?;
    serde_json::from_str(&plaintext).map_err(|e| Error::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey as SK;
    use rand::rngs::OsRng;

    fn keypair() -> (PrivateJwk, PublicJwk) {
        let signing_key = SK::random(&mut OsRng);
        let private = PrivateJwk::from_signing_key(&signing_key);
        let public = private.public();
        (private, public)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let (alice_priv, alice_pub) = keypair();
        let (bob_priv, bob_pub) = keypair();

        let envelope = encrypt_message("hello bob", &alice_priv, &bob_pub).unwrap();
        let plaintext = decrypt_message(&envelope, &bob_priv, &alice_pub).unwrap();
        assert_eq!(plaintext, "hello bob");
    }

    #[test]
    fn test_shared_secret_is_symmetric() {
        let (alice_priv, alice_pub) = keypair();
        let (bob_priv, bob_pub) = keypair();

        assert_eq!(
            derive_key(&alice_priv, &bob_pub).unwrap(),
            derive_key(&bob_priv, &alice_pub).unwrap()
        );
    }

    #[test]
    fn test_wrong_recipient_key_fails() {
        let (alice_priv, _) = keypair();
        let (bob_priv, bob_pub) = keypair();
        let (_, eve_pub) = keypair();

        let envelope = encrypt_message("secret", &alice_priv, &bob_pub).unwrap();
        assert!(decrypt_message(&envelope, &bob_priv, &eve_pub).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let (alice_priv, alice_pub) = keypair();
        let (bob_priv, bob_pub) = keypair();

        let envelope = encrypt_message("secret", &alice_priv, &bob_pub).unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&envelope).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let tampered = URL_SAFE_NO_PAD.encode(raw);

        assert!(decrypt_message(&tampered, &bob_priv, &alice_pub).is_err());
    }

    #[derive(Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Payload {
        msg: String,
        count: u32,
    }

    #[test]
    fn test_encrypt_decrypt_json_roundtrip() {
        let (alice_priv, alice_pub) = keypair();
        let (bob_priv, bob_pub) = keypair();

        let payload = Payload {
            msg: "hi".to_string(),
            count: 7,
        };
        let envelope = encrypt_json(&payload, &alice_priv, &bob_pub).unwrap();
        let restored: Payload = decrypt_json(&envelope, &bob_priv, &alice_pub).unwrap();
        assert_eq!(payload, restored);
    }
}
