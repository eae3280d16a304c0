//! # Keys and JWK encoding
//!
//! secp256k1 keypairs expressed as JSON Web Keys, the wire shape used
//! everywhere a key crosses into a DID document, an operation, or a
//! signature.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// A secp256k1 public key as a JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
}

/// A secp256k1 private key as a JSON Web Key.
///
/// `Debug` is intentionally not derived; see the manual impl below, which
/// redacts `d`.
#[derive(Clone, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct PrivateJwk {
    #[zeroize(skip)]
    pub kty: String,
    #[zeroize(skip)]
    pub crv: String,
    #[zeroize(skip)]
    pub x: String,
    #[zeroize(skip)]
    pub y: String,
    pub d: String,
}

impl std::fmt::Debug for PrivateJwk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateJwk")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("d", &"[REDACTED]")
            .finish()
    }
}

impl PublicJwk {
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let x = point.x().expect("uncompressed point has x");
        let y = point.y().expect("uncompressed point has y");
        Self {
            kty: "EC".to_string(),
            crv: "secp256k1".to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
        }
    }

    pub fn to_verifying_key(&self) -> Result<VerifyingKey> {
        if self.kty != "EC" || self.crv != "secp256k1" {
            return Err(Error::InvalidKey(format!(
                "unsupported JWK kty/crv: {}/{}",
                self.kty, self.crv
            )));
        }
        let x = URL_SAFE_NO_PAD
            .decode(&self.x)
            .map_err(|e| Error::InvalidKey(format!("bad JWK x: {e}")))?;
        let y = URL_SAFE_NO_PAD
            .decode(&self.y)
            .map_err(|e| Error::InvalidKey(format!("bad JWK y: {e}")))?;

        let mut sec1 = Vec::with_capacity(65);
        sec1.push(0x04);
        sec1.extend_from_slice(&x);
        sec1.extend_from_slice(&y);

        VerifyingKey::from_sec1_bytes(&sec1)
            .map_err(|e| Error::InvalidKey(format!("invalid curve point: {e}")))
    }

    /// Raw 33-byte SEC1 compressed encoding, used as input to DID derivation
    /// and content hashing.
    pub fn to_sec1_compressed(&self) -> Result<Vec<u8>> {
        let key = self.to_verifying_key()?;
        Ok(key.to_encoded_point(true).as_bytes().to_vec())
    }
}

impl PrivateJwk {
    pub fn from_signing_key(key: &SigningKey) -> Self {
        let public = PublicJwk::from_verifying_key(key.verifying_key());
        let d = key.to_bytes();
        Self {
            kty: public.kty,
            crv: public.crv,
            x: public.x,
            y: public.y,
            d: URL_SAFE_NO_PAD.encode(d),
        }
    }

    pub fn to_signing_key(&self) -> Result<SigningKey> {
        let mut d = URL_SAFE_NO_PAD
            .decode(&self.d)
            .map_err(|e| Error::InvalidKey(format!("bad JWK d: {e}")))?;
        let key = SigningKey::from_slice(&d).map_err(|e| Error::InvalidKey(e.to_string()));
        d.zeroize();
        key
    }

    pub fn public(&self) -> PublicJwk {
        PublicJwk {
            kty: self.kty.clone(),
            crv: self.crv.clone(),
            x: self.x.clone(),
            y: self.y.clone(),
        }
    }
}

/// A derived secp256k1 keypair.
#[derive(Debug, Clone)]
pub struct Keypair {
    pub private: PrivateJwk,
}

impl Keypair {
    pub fn from_signing_key(key: &SigningKey) -> Self {
        Self {
            private: PrivateJwk::from_signing_key(key),
        }
    }

    pub fn public_jwk(&self) -> PublicJwk {
        self.private.public()
    }

    pub fn private_jwk(&self) -> &PrivateJwk {
        &self.private
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey as SK;
    use rand::rngs::OsRng;

    #[test]
    fn test_jwk_roundtrip() {
        let signing_key = SK::random(&mut OsRng);
        let keypair = Keypair::from_signing_key(&signing_key);
        let public = keypair.public_jwk();

        assert_eq!(public.kty, "EC");
        assert_eq!(public.crv, "secp256k1");

        let restored = public.to_verifying_key().unwrap();
        assert_eq!(restored, *signing_key.verifying_key());
    }

    #[test]
    fn test_private_jwk_roundtrip() {
        let signing_key = SK::random(&mut OsRng);
        let private = PrivateJwk::from_signing_key(&signing_key);
        let restored = private.to_signing_key().unwrap();
        assert_eq!(restored.to_bytes(), signing_key.to_bytes());
    }

    #[test]
    fn test_private_jwk_debug_redacts_d() {
        let signing_key = SK::random(&mut OsRng);
        let private = PrivateJwk::from_signing_key(&signing_key);
        let debug = format!("{:?}", private);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(&private.d));
    }

    #[test]
    fn test_reject_wrong_curve() {
        let bad = PublicJwk {
            kty: "EC".into(),
            crv: "P-256".into(),
            x: "AA".into(),
            y: "AA".into(),
        };
        assert!(bad.to_verifying_key().is_err());
    }
}
