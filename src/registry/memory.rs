//! In-memory gatekeeper fake used by the test harness (§4.I) to drive the
//! identity/credential engines without a live registry.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use super::{DidDocument, DidDocumentCore, DidDocumentMetadata, Gatekeeper, OpType, Operation, VerificationMethod};
use crate::crypto::canonical::canonicalize;
use crate::crypto::keys::PublicJwk;
use crate::crypto::signing::{hash_message, verify_sig};
use crate::identity::did::Did;
use crate::error::{Error, Result};

struct DidRecord {
    document: DidDocument,
    last_op_hash: String,
    seen_op_hashes: HashSet<String>,
}

fn op_hash(operation: &Operation) -> Result<String> {
    let canonical = canonicalize(operation)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

/// The key an `update`/`delete` operation on `did_str` must verify against: its
/// own current key if it has one (identity DIDs, which embed a `publicJwk` at
/// creation), otherwise its controller's current key (data/vault/credential
/// DIDs, created with no key of their own and anchored via someone else's
/// signature).
fn verifying_key_for(dids: &HashMap<String, DidRecord>, did_str: &str) -> Option<PublicJwk> {
    let record = dids.get(did_str)?;
    if let Some(key) = record.document.current_public_jwk() {
        return Some(key.clone());
    }
    let controller = record.document.did_document.controller.as_ref()?;
    dids.get(controller)?.document.current_public_jwk().cloned()
}

/// Recompute the hash `sign_operation` signed over (the operation with its
/// `signature` field stripped) and check it against `public_jwk`.
fn verify_operation_signature(operation: &Operation, public_jwk: Option<&PublicJwk>) -> Result<()> {
    let signature = operation
        .signature
        .as_ref()
        .ok_or_else(|| Error::RegistryRejected("operation is missing a signature".into()))?;
    let public_jwk = public_jwk.ok_or_else(|| {
        Error::RegistryRejected("no verification key on file for this DID's controller".into())
    })?;

    let mut unsigned = operation.clone();
    unsigned.signature = None;
    let canonical = canonicalize(&unsigned)?;
    if hash_message(&canonical) != signature.hash {
        return Err(Error::RegistryRejected(
            "signature hash does not match the operation body".into(),
        ));
    }
    match verify_sig(&signature.hash, &signature.value, public_jwk) {
        Ok(true) => Ok(()),
        _ => Err(Error::RegistryRejected(
            "signature does not verify against the controller's current key".into(),
        )),
    }
}

/// A `HashMap`-backed, lock-protected gatekeeper that enforces the same
/// linear-history and dedup-by-hash rules a real registry would.
#[derive(Default)]
pub struct InMemoryGatekeeper {
    dids: RwLock<HashMap<String, DidRecord>>,
}

impl InMemoryGatekeeper {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Gatekeeper for InMemoryGatekeeper {
    async fn create_did(&self, operation: Operation) -> Result<Did> {
        if operation.op != OpType::Create {
            return Err(Error::RegistryRejected("expected create op".into()));
        }
        let did = Did::from_create_operation(&operation)?;
        let hash = op_hash(&operation)?;

        let controller = operation
            .signature
            .as_ref()
            .map(|s| s.signer.clone())
            .unwrap_or_else(|| did.as_str().to_string());

        let verification_method = match &operation.public_jwk {
            Some(jwk) => vec![VerificationMethod {
                id: format!("{did}#keys-1"),
                method_type: "JsonWebKey2020".to_string(),
                controller: did.as_str().to_string(),
                public_key_jwk: jwk.clone(),
            }],
            None => Vec::new(),
        };

        let metadata = DidDocumentMetadata {
            data: operation
                .doc
                .as_ref()
                .and_then(|d| d.get("data").cloned()),
            deactivated: false,
            manifest: None,
            vault: None,
            version_id: Some(hash.clone()),
        };

        let document = DidDocument {
            did_document: DidDocumentCore {
                id: Some(did.as_str().to_string()),
                controller: Some(controller),
                verification_method,
            },
            did_document_metadata: metadata,
        };

        let mut dids = self.dids.write();
        if dids.contains_key(did.as_str()) {
            return Err(Error::RegistryRejected(format!(
                "DID already exists: {did}"
            )));
        }
        let mut seen = HashSet::new();
        seen.insert(hash.clone());
        dids.insert(
            did.as_str().to_string(),
            DidRecord {
                document,
                last_op_hash: hash,
                seen_op_hashes: seen,
            },
        );
        Ok(did)
    }

    async fn resolve_did(&self, did: &Did) -> Result<DidDocument> {
        let dids = self.dids.read();
        match dids.get(did.as_str()) {
            Some(record) if record.document.did_document_metadata.deactivated => {
                // A deactivated DID resolves to an empty didDocument — no
                // live verification methods to decrypt or verify against —
                // with didDocumentMetadata.deactivated carried through.
                Ok(DidDocument {
                    did_document: DidDocumentCore::default(),
                    did_document_metadata: record.document.did_document_metadata.clone(),
                })
            }
            Some(record) => Ok(record.document.clone()),
            None => Err(Error::RegistryRejected(format!("unknown DID: {did}"))),
        }
    }

    async fn update_did(&self, operation: Operation) -> Result<()> {
        if operation.op != OpType::Update {
            return Err(Error::RegistryRejected("expected update op".into()));
        }
        let did_str = operation.did.clone().ok_or(Error::InvalidInput)?;
        let hash = op_hash(&operation)?;

        let mut dids = self.dids.write();
        let already_seen = dids
            .get(&did_str)
            .ok_or_else(|| Error::RegistryRejected(format!("unknown DID: {did_str}")))?
            .seen_op_hashes
            .contains(&hash);
        if already_seen {
            return Ok(());
        }

        // Verified against the key current *before* this op's own rotation
        // (if any) is applied below — a rotation is authorized by the key it
        // replaces, not the one it installs.
        let verifying_key = verifying_key_for(&dids, &did_str);
        verify_operation_signature(&operation, verifying_key.as_ref())?;

        let record = dids.get_mut(&did_str).expect("presence checked above");

        if operation.prev.as_deref() != Some(record.last_op_hash.as_str()) {
            return Err(Error::RegistryRejected(
                "prev hash does not match current history head".into(),
            ));
        }
        if record.document.did_document_metadata.deactivated {
            return Err(Error::RegistryRejected("DID is deactivated".into()));
        }

        if let Some(jwk) = &operation.public_jwk {
            // Append rather than overwrite: a rotation never erases the key
            // it replaces, so decrypt/verifySignature can still walk back to
            // whichever key was current when a given ciphertext or signature
            // was produced.
            let next = record.document.did_document.verification_method.len() + 1;
            record.document.did_document.verification_method.push(VerificationMethod {
                id: format!("{did_str}#keys-{next}"),
                method_type: "JsonWebKey2020".to_string(),
                controller: did_str.clone(),
                public_key_jwk: jwk.clone(),
            });
        }
        if let Some(doc) = &operation.doc {
            if let Some(data) = doc.get("data") {
                record.document.did_document_metadata.data = Some(data.clone());
            }
            if let Some(manifest) = doc.get("manifest") {
                record.document.did_document_metadata.manifest = Some(manifest.clone());
            }
            if let Some(vault) = doc.get("vault").and_then(|v| v.as_str()) {
                record.document.did_document_metadata.vault = Some(vault.to_string());
            }
        }

        record.last_op_hash = hash.clone();
        record.document.did_document_metadata.version_id = Some(hash.clone());
        record.seen_op_hashes.insert(hash);
        Ok(())
    }

    async fn delete_did(&self, operation: Operation) -> Result<()> {
        if operation.op != OpType::Delete {
            return Err(Error::RegistryRejected("expected delete op".into()));
        }
        let did_str = operation.did.clone().ok_or(Error::InvalidInput)?;
        let hash = op_hash(&operation)?;

        let mut dids = self.dids.write();
        let already_seen = dids
            .get(&did_str)
            .ok_or_else(|| Error::RegistryRejected(format!("unknown DID: {did_str}")))?
            .seen_op_hashes
            .contains(&hash);
        if already_seen {
            return Ok(());
        }

        let verifying_key = verifying_key_for(&dids, &did_str);
        verify_operation_signature(&operation, verifying_key.as_ref())?;

        let record = dids.get_mut(&did_str).expect("presence checked above");

        if operation.prev.as_deref() != Some(record.last_op_hash.as_str()) {
            return Err(Error::RegistryRejected(
                "prev hash does not match current history head".into(),
            ));
        }

        record.document.did_document_metadata.deactivated = true;
        record.last_op_hash = hash.clone();
        record.document.did_document_metadata.version_id = Some(hash.clone());
        record.seen_op_hashes.insert(hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{Keypair, PublicJwk};
    use crate::engine::sign_operation;
    use crate::registry::{Mdip, OpType};
    use k256::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    fn keypair() -> Keypair {
        Keypair::from_signing_key(&SigningKey::random(&mut OsRng))
    }

    fn create_op() -> Operation {
        Operation {
            op: OpType::Create,
            did: None,
            mdip: Mdip::new("create", "peerbit"),
            public_jwk: None,
            doc: None,
            prev: None,
            signature: None,
        }
    }

    /// A self-signed create op embedding `signer`'s public key, the same
    /// shape `createId` submits: signed with the key it is creating, since
    /// the DID itself doesn't exist until the gatekeeper hashes this op.
    fn create_signed_op(signer: &Keypair) -> Operation {
        let op = Operation {
            op: OpType::Create,
            did: None,
            mdip: Mdip::new("create", "peerbit"),
            public_jwk: Some(signer.public_jwk()),
            doc: None,
            prev: None,
            signature: None,
        };
        sign_operation(op, "", signer.private_jwk()).unwrap()
    }

    fn signed_update(
        did: &Did,
        prev: &str,
        rotate_to: Option<PublicJwk>,
        signer: &Keypair,
    ) -> Operation {
        let op = Operation {
            op: OpType::Update,
            did: Some(did.as_str().to_string()),
            mdip: Mdip::new("update", "peerbit"),
            public_jwk: rotate_to,
            doc: None,
            prev: Some(prev.to_string()),
            signature: None,
        };
        sign_operation(op, did.as_str(), signer.private_jwk()).unwrap()
    }

    fn signed_delete(did: &Did, prev: &str, signer: &Keypair) -> Operation {
        let op = Operation {
            op: OpType::Delete,
            did: Some(did.as_str().to_string()),
            mdip: Mdip::new("delete", "peerbit"),
            public_jwk: None,
            doc: None,
            prev: Some(prev.to_string()),
            signature: None,
        };
        sign_operation(op, did.as_str(), signer.private_jwk()).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_resolve() {
        let gk = InMemoryGatekeeper::new();
        let did = gk.create_did(create_op()).await.unwrap();
        let doc = gk.resolve_did(&did).await.unwrap();
        assert_eq!(doc.did_document.id.as_deref(), Some(did.as_str()));
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let gk = InMemoryGatekeeper::new();
        let op = create_op();
        gk.create_did(op.clone()).await.unwrap();
        assert!(gk.create_did(op).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_unknown_did_fails() {
        let gk = InMemoryGatekeeper::new();
        let bogus = Did::from_create_operation(&create_op()).unwrap();
        assert!(gk.resolve_did(&bogus).await.is_err());
    }

    #[tokio::test]
    async fn test_update_requires_matching_prev() {
        let gk = InMemoryGatekeeper::new();
        let signer = keypair();
        let op = create_signed_op(&signer);
        let hash = op_hash(&op).unwrap();
        let did = gk.create_did(op).await.unwrap();

        let bad_update = signed_update(&did, "wrong-hash", None, &signer);
        assert!(gk.update_did(bad_update).await.is_err());

        let good_update = signed_update(&did, &hash, None, &signer);
        assert!(gk.update_did(good_update).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_rejects_wrong_signer() {
        let gk = InMemoryGatekeeper::new();
        let signer = keypair();
        let impostor = keypair();
        let op = create_signed_op(&signer);
        let hash = op_hash(&op).unwrap();
        let did = gk.create_did(op).await.unwrap();

        let forged = signed_update(&did, &hash, None, &impostor);
        let err = gk.update_did(forged).await.unwrap_err();
        assert!(matches!(err, Error::RegistryRejected(_)));
    }

    #[tokio::test]
    async fn test_delete_marks_deactivated() {
        let gk = InMemoryGatekeeper::new();
        let signer = keypair();
        let op = create_signed_op(&signer);
        let hash = op_hash(&op).unwrap();
        let did = gk.create_did(op).await.unwrap();

        let delete_op = signed_delete(&did, &hash, &signer);
        gk.delete_did(delete_op).await.unwrap();

        let doc = gk.resolve_did(&did).await.unwrap();
        assert!(doc.did_document_metadata.deactivated);
    }

    #[tokio::test]
    async fn test_delete_rejects_wrong_signer() {
        let gk = InMemoryGatekeeper::new();
        let signer = keypair();
        let impostor = keypair();
        let op = create_signed_op(&signer);
        let hash = op_hash(&op).unwrap();
        let did = gk.create_did(op).await.unwrap();

        let forged = signed_delete(&did, &hash, &impostor);
        let err = gk.delete_did(forged).await.unwrap_err();
        assert!(matches!(err, Error::RegistryRejected(_)));

        let doc = gk.resolve_did(&did).await.unwrap();
        assert!(!doc.did_document_metadata.deactivated);
    }

    #[tokio::test]
    async fn test_resolve_deactivated_did_has_empty_document() {
        let gk = InMemoryGatekeeper::new();
        let signer = keypair();
        let op = create_signed_op(&signer);
        let hash0 = op_hash(&op).unwrap();
        let did = gk.create_did(op).await.unwrap();

        let rotated = keypair();
        let update = signed_update(&did, &hash0, Some(rotated.public_jwk()), &signer);
        let hash1 = op_hash(&update).unwrap();
        gk.update_did(update).await.unwrap();

        let delete_op = signed_delete(&did, &hash1, &rotated);
        gk.delete_did(delete_op).await.unwrap();

        let doc = gk.resolve_did(&did).await.unwrap();
        assert!(doc.did_document_metadata.deactivated);
        assert!(doc.did_document.verification_method.is_empty());
        assert!(doc.current_public_jwk().is_none());
        assert!(doc.did_document.id.is_none());
    }

    #[tokio::test]
    async fn test_rotation_appends_rather_than_overwrites() {
        let gk = InMemoryGatekeeper::new();
        let signer = keypair();
        let op = create_signed_op(&signer);
        let hash0 = op_hash(&op).unwrap();
        let did = gk.create_did(op).await.unwrap();

        let key1 = keypair();
        let update1 = signed_update(&did, &hash0, Some(key1.public_jwk()), &signer);
        let hash1 = op_hash(&update1).unwrap();
        gk.update_did(update1).await.unwrap();

        let key2 = keypair();
        // The rotation to key2 is authorized by key1, the key it replaces.
        let update2 = signed_update(&did, &hash1, Some(key2.public_jwk()), &key1);
        gk.update_did(update2).await.unwrap();

        let doc = gk.resolve_did(&did).await.unwrap();
        assert_eq!(doc.did_document.verification_method.len(), 2);
        assert_eq!(doc.current_public_jwk().unwrap(), &key2.public_jwk());
        let history: Vec<_> = doc.key_history().cloned().collect();
        assert_eq!(history, vec![key2.public_jwk(), key1.public_jwk()]);
    }
}
