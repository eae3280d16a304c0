//! `addSignature` / `verifySignature`: detached signatures over canonicalized
//! JSON objects.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::Signature;
use crate::crypto::canonical::canonicalize_value;
use crate::crypto::keys::{PrivateJwk, PublicJwk};
use crate::crypto::signing::{hash_message, sign_hash, verify_sig};
use crate::error::{Error, Result};
use crate::time::now_iso;

fn strip_signature(value: &mut serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            map.remove("signature");
            Ok(())
        }
        _ => Err(Error::InvalidInput),
    }
}

/// Sign `obj`'s canonicalized residue (with any existing `signature` field
/// stripped) and attach a fresh `signature` block.
pub fn add_signature<T: Serialize + DeserializeOwned>(
    obj: &T,
    signer_did: &str,
    private: &PrivateJwk,
) -> Result<T> {
    let mut value = serde_json::to_value(obj)?;
    strip_signature(&mut value)?;

    let canonical = canonicalize_value(&value)?;
    let hash = hash_message(&canonical);
    let sig_value = sign_hash(&hash, private)?;

    let signature = Signature {
        signer: signer_did.to_string(),
        signed: now_iso(),
        hash,
        value: sig_value,
    };

    if let serde_json::Value::Object(map) = &mut value {
        map.insert("signature".to_string(), serde_json::to_value(&signature)?);
    }
    Ok(serde_json::from_value(value)?)
}

/// Verify a signature attached by [`add_signature`]. Returns `false` (never
/// an error) for a null/missing signature or a mismatch, per the policy in
/// the error-handling design: verification failures on well-formed inputs
/// are a boolean, not a typed error.
pub fn verify_signature(value: &serde_json::Value, public: &PublicJwk) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let Some(sig_raw) = obj.get("signature") else {
        return false;
    };
    if sig_raw.is_null() {
        return false;
    }
    let Ok(signature) = serde_json::from_value::<Signature>(sig_raw.clone()) else {
        return false;
    };

    let mut residue = value.clone();
    if strip_signature(&mut residue).is_err() {
        return false;
    }
    let Ok(canonical) = canonicalize_value(&residue) else {
        return false;
    };
    let hash = hash_message(&canonical);
    if hash != signature.hash {
        return false;
    }

    verify_sig(&hash, &signature.value, public).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey as SK;
    use rand::rngs::OsRng;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Thing {
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<Signature>,
    }

    fn keypair() -> (PrivateJwk, PublicJwk) {
        let signing_key = SK::random(&mut OsRng);
        let private = PrivateJwk::from_signing_key(&signing_key);
        let public = private.public();
        (private, public)
    }

    #[test]
    fn test_add_then_verify() {
        let (private, public) = keypair();
        let thing = Thing {
            value: "hello".to_string(),
            signature: None,
        };
        let signed: Thing = add_signature(&thing, "did:mdip:issuer", &private).unwrap();
        let value = serde_json::to_value(&signed).unwrap();
        assert!(verify_signature(&value, &public));
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let (private, public) = keypair();
        let thing = Thing {
            value: "hello".to_string(),
            signature: None,
        };
        let signed: Thing = add_signature(&thing, "did:mdip:issuer", &private).unwrap();
        let mut value = serde_json::to_value(&signed).unwrap();
        value["value"] = serde_json::json!("tampered");
        assert!(!verify_signature(&value, &public));
    }

    #[test]
    fn test_verify_rejects_missing_signature() {
        let value = serde_json::json!({"value": "hello"});
        let (_, public) = keypair();
        assert!(!verify_signature(&value, &public));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let (private, _) = keypair();
        let (_, other_public) = keypair();
        let thing = Thing {
            value: "hello".to_string(),
            signature: None,
        };
        let signed: Thing = add_signature(&thing, "did:mdip:issuer", &private).unwrap();
        let value = serde_json::to_value(&signed).unwrap();
        assert!(!verify_signature(&value, &other_public));
    }
}
