//! # Signing
//!
//! `hashMessage` / `signHash` / `verifySig`: SHA-256 over canonicalized
//! bytes, ECDSA (secp256k1) over the resulting digest.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::crypto::keys::{PrivateJwk, PublicJwk};
use crate::error::{Error, Result};

/// SHA-256 hex digest of a UTF-8 message, suitable as input to [`sign_hash`].
pub fn hash_message(message: &str) -> String {
    let digest = Sha256::digest(message.as_bytes());
    hex::encode(digest)
}

/// Sign a hash (as produced by [`hash_message`]) with a private JWK.
pub fn sign_hash(hash_hex: &str, private: &PrivateJwk) -> Result<String> {
    let digest = decode_hash(hash_hex)?;
    let signing_key: SigningKey = private.to_signing_key()?;
    let signature: Signature = signing_key
        .try_sign(&digest)
        .map_err(|e| Error::SigningFailed(e.to_string()))?;
    Ok(hex::encode(signature.to_bytes()))
}

/// Verify a signature produced by [`sign_hash`] against a public JWK.
pub fn verify_sig(hash_hex: &str, signature_hex: &str, public: &PublicJwk) -> Result<bool> {
    let digest = decode_hash(hash_hex)?;
    let verifying_key: VerifyingKey = public.to_verifying_key()?;
    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| Error::InvalidKey(format!("bad signature hex: {e}")))?;
    let signature = Signature::from_slice(&sig_bytes)
        .map_err(|e| Error::InvalidKey(format!("bad signature bytes: {e}")))?;

    Ok(verifying_key.verify(&digest, &signature).is_ok())
}

fn decode_hash(hash_hex: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hash_hex).map_err(|_| Error::InvalidInput)?;
    bytes.try_into().map_err(|_| Error::InvalidInput)
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
    fn test_hash_is_deterministic() {
        assert_eq!(hash_message("hello"), hash_message("hello"));
        assert_ne!(hash_message("hello"), hash_message("world"));
    }

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let (private, public) = keypair();
        let hash = hash_message("a credential body");
        let sig = sign_hash(&hash, &private).unwrap();
        assert!(verify_sig(&hash, &sig, &public).unwrap());
    }

    #[test]
    fn test_verify_rejects_tampered_hash() {
        let (private, public) = keypair();
        let hash = hash_message("original");
        let sig = sign_hash(&hash, &private).unwrap();
        let other_hash = hash_message("tampered");
        assert!(!verify_sig(&other_hash, &sig, &public).unwrap());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let (private, _) = keypair();
        let (_, other_public) = keypair();
        let hash = hash_message("a credential body");
        let sig = sign_hash(&hash, &private).unwrap();
        assert!(!verify_sig(&hash, &sig, &other_public).unwrap());
    }

    #[test]
    fn test_signatures_are_deterministic_rfc6979() {
        let (private, _) = keypair();
        let hash = hash_message("deterministic?");
        let sig_a = sign_hash(&hash, &private).unwrap();
        let sig_b = sign_hash(&hash, &private).unwrap();
        assert_eq!(sig_a, sig_b);
    }

    #[test]
    fn test_rejects_malformed_hash_hex() {
        let (private, _) = keypair();
        assert!(sign_hash("not-hex", &private).is_err());
    }
}
