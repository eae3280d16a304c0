//! # Credential and messaging engine
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                    CREDENTIAL LIFECYCLE                           │
//! ├───────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  createCredential(schema) ──► schema DID                          │
//! │         │                                                          │
//! │         ▼                                                          │
//! │  bindCredential(schema, subject) ──► unsigned VerifiableCredential │
//! │         │                                                          │
//! │         ▼                                                          │
//! │  attestCredential(vc) ──► signed + encrypted, anchored as a DID    │
//! │         │                     (issuer -> subject, held privately)  │
//! │         ▼                                                          │
//! │  acceptCredential(vcDid) ──► subject holds it                      │
//! │         │                                                          │
//! │    ┌────┴────┐                                                     │
//! │    ▼         ▼                                                     │
//! │  publish   revoke (issuer deactivates the anchored DID)             │
//! │                                                                     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                   PRESENTATION PROTOCOL                           │
//! ├───────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  verifier: createChallenge(reqs) ──► issueChallenge(subject)        │
//! │                                            │                        │
//! │                                            ▼                        │
//! │                          subject: createResponse(boundChallenge)    │
//! │                                            │                        │
//! │                                            ▼                        │
//! │                          verifier: verifyResponse(vpDid)            │
//! │                                                                     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every object that crosses between parties travels as an asymmetric
//! [`types::Envelope`], itself anchored as a data-DID — the same mechanism
//! `bindCredential`'s schema lookup and the challenge/response exchange both
//! build on.

pub mod schema;
pub mod signature;
pub mod types;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::crypto::canonical::canonicalize;
use crate::crypto::encryption;
use crate::crypto::keys::Keypair;
use crate::crypto::signing::hash_message;
use crate::engine::{mdip, sign_operation, WalletEngine};
use crate::error::{Error, Result};
use crate::identity::did::Did;
use crate::registry::{OpType, Operation};
use crate::time::{iso_after, now_iso};
use crate::wallet::Identity;

use types::{
    BoundChallenge, Challenge, CredentialSubject, DataPayload, Envelope, Presentation,
    PresentationCredential, VerifiableCredential,
};

impl WalletEngine {
    async fn require_current(&self) -> Result<(String, Identity)> {
        let wallet = self.wallet.lock().await;
        let identity = wallet.current_identity().ok_or(Error::NoCurrentId)?.clone();
        Ok((identity.did.clone(), identity))
    }

    /// Anchor `payload` as a data-DID controlled by `owner_did`, following
    /// the same self-describing-create-op pattern as `backupId`'s vault.
    async fn anchor_data(
        &self,
        owner_did: &str,
        keypair: &Keypair,
        payload: serde_json::Value,
    ) -> Result<Did> {
        let op = Operation {
            op: OpType::Create,
            did: None,
            mdip: mdip("create", "peerbit"),
            public_jwk: None,
            doc: Some(json!({ "data": payload })),
            prev: None,
            signature: None,
        };
        let signed_op = sign_operation(op, owner_did, keypair.private_jwk())?;
        self.gatekeeper.create_did(signed_op).await
    }

    async fn record_owned(&self, did: &str) -> Result<()> {
        let mut wallet = self.wallet.lock().await;
        let identity = wallet.current_identity_mut().ok_or(Error::NoCurrentId)?;
        identity.owned.push(did.to_string());
        self.store.save(&wallet).await?;
        Ok(())
    }

    async fn resolve_payload(&self, did_str: &str) -> Result<DataPayload> {
        let did = Did::parse(did_str)?;
        let doc = self.gatekeeper.resolve_did(&did).await?;
        let data = doc
            .did_document_metadata
            .data
            .ok_or(Error::InvalidInput)?;
        Ok(serde_json::from_value(data)?)
    }

    /// `encrypt(plaintext, receiverDid)`: anchor an asymmetric envelope
    /// readable by both the current identity and `receiver_did`.
    #[tracing::instrument(skip(self, plaintext))]
    pub async fn encrypt(&self, plaintext: &str, receiver_did: &str) -> Result<Did> {
        let (sender_did, identity) = self.require_current().await?;
        let keypair = self.keypair_for(identity.account, identity.index)?;

        let receiver = Did::parse(receiver_did)?;
        let receiver_doc = self.gatekeeper.resolve_did(&receiver).await?;
        let receiver_public = receiver_doc
            .current_public_jwk()
            .ok_or_else(|| Error::InvalidKey(format!("{receiver_did} has no current key")))?;

        let cipher_sender =
            encryption::encrypt_message(plaintext, keypair.private_jwk(), &keypair.public_jwk())?;
        let cipher_receiver =
            encryption::encrypt_message(plaintext, keypair.private_jwk(), receiver_public)?;

        let envelope = Envelope {
            sender: sender_did.clone(),
            cipher_hash: hash_message(plaintext),
            cipher_sender,
            cipher_receiver,
        };
        let payload = serde_json::to_value(DataPayload::Envelope { envelope })?;
        let anchored = self.anchor_data(&sender_did, &keypair, payload).await?;
        self.record_owned(anchored.as_str()).await?;
        Ok(anchored)
    }

    /// `decrypt(envelopeDid)`: try every key the current identity has ever
    /// held against every key the counterparty has ever rotated through,
    /// newest first. A rotation on either side never strands an older
    /// ciphertext, as long as the identity that produced it is still
    /// reachable in this wallet.
    #[tracing::instrument(skip(self))]
    pub async fn decrypt(&self, envelope_did: &str) -> Result<String> {
        let (my_did, identity) = self.require_current().await?;
        let payload = self.resolve_payload(envelope_did).await?;
        let DataPayload::Envelope { envelope } = payload else {
            return Err(Error::InvalidInput);
        };

        let is_sender = envelope.sender == my_did;
        let ciphertext = if is_sender {
            &envelope.cipher_sender
        } else {
            &envelope.cipher_receiver
        };

        let counterparty_doc = if is_sender {
            // Self-addressed leg: the ECDH counterparty was this identity's
            // own key at the time of encryption.
            let did = Did::parse(&my_did)?;
            self.gatekeeper.resolve_did(&did).await?
        } else {
            let sender = Did::parse(&envelope.sender)?;
            self.gatekeeper.resolve_did(&sender).await?
        };

        for own_index in (0..=identity.index).rev() {
            let own_keypair = self.keypair_for(identity.account, own_index)?;
            for other_public in counterparty_doc.key_history() {
                let Ok(plaintext) =
                    encryption::decrypt_message(ciphertext, own_keypair.private_jwk(), other_public)
                else {
                    continue;
                };
                if hash_message(&plaintext) != envelope.cipher_hash {
                    return Err(Error::TamperedCiphertext);
                }
                return Ok(plaintext);
            }
        }
        Err(Error::DecryptionFailed(
            "no key pair in this wallet recovered the plaintext".to_string(),
        ))
    }

    /// `encryptJSON`: canonicalize then [`encrypt`](Self::encrypt).
    pub async fn encrypt_json<T: Serialize>(&self, value: &T, receiver_did: &str) -> Result<Did> {
        let canonical = canonicalize(value)?;
        self.encrypt(&canonical, receiver_did).await
    }

    /// `decryptJSON`: [`decrypt`](Self::decrypt) then parse.
    pub async fn decrypt_json<T: DeserializeOwned>(&self, envelope_did: &str) -> Result<T> {
        let plaintext = self.decrypt(envelope_did).await?;
        serde_json::from_str(&plaintext).map_err(Error::from)
    }

    /// `addSignature(obj)` using the current identity's key.
    pub async fn add_signature<T: Serialize + DeserializeOwned>(&self, obj: &T) -> Result<T> {
        let (did, identity) = self.require_current().await?;
        let keypair = self.keypair_for(identity.account, identity.index)?;
        signature::add_signature(obj, &did, keypair.private_jwk())
    }

    /// `verifySignature(value)`: resolve the embedded signer DID and walk
    /// its full key history, newest first, since the signature may have
    /// been produced by a key that has since been rotated out.
    pub async fn verify_signature(&self, value: &serde_json::Value) -> Result<bool> {
        let Some(signer) = value
            .get("signature")
            .and_then(|s| s.get("signer"))
            .and_then(|s| s.as_str())
        else {
            return Ok(false);
        };
        let Ok(did) = Did::parse(signer) else {
            return Ok(false);
        };
        let Ok(doc) = self.gatekeeper.resolve_did(&did).await else {
            return Ok(false);
        };
        for public in doc.key_history() {
            if signature::verify_signature(value, public) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `createCredential(schema)`: anchor a JSON Schema as a reusable
    /// credential template.
    #[tracing::instrument(skip(self, schema))]
    pub async fn create_credential(&self, schema: serde_json::Value) -> Result<Did> {
        let (did, identity) = self.require_current().await?;
        let keypair = self.keypair_for(identity.account, identity.index)?;
        let payload = serde_json::to_value(DataPayload::CredentialSchema { schema })?;
        let anchored = self.anchor_data(&did, &keypair, payload).await?;
        self.record_owned(anchored.as_str()).await?;
        Ok(anchored)
    }

    /// `bindCredential(schemaDid, subjectDid)`: resolve the schema and fill
    /// the minimal instance that satisfies it (§9 open question, resolved
    /// by [`schema::minimal_instance`]).
    #[tracing::instrument(skip(self))]
    pub async fn bind_credential(
        &self,
        schema_did: &str,
        subject_did: &str,
    ) -> Result<VerifiableCredential> {
        let (issuer_did, _identity) = self.require_current().await?;
        let payload = self.resolve_payload(schema_did).await?;
        let DataPayload::CredentialSchema { schema } = payload else {
            return Err(Error::InvalidInput);
        };

        Ok(VerifiableCredential {
            context: types::VC_CONTEXT.to_string(),
            vc_type: vec!["VerifiableCredential".to_string()],
            issuer: issuer_did,
            credential_subject: CredentialSubject {
                id: subject_did.to_string(),
            },
            credential: schema::minimal_instance(&schema),
            credential_schema: schema_did.to_string(),
            valid_from: now_iso(),
            valid_until: None,
            signature: None,
        })
    }

    /// `attestCredential(vc)`: sign and deliver to the subject as a private
    /// encrypted envelope.
    #[tracing::instrument(skip(self, vc))]
    pub async fn attest_credential(&self, vc: VerifiableCredential) -> Result<Did> {
        let (issuer_did, _identity) = self.require_current().await?;
        if vc.issuer != issuer_did {
            return Err(Error::InvalidVC);
        }
        let signed: VerifiableCredential = self.add_signature(&vc).await?;
        let subject = signed.credential_subject.id.clone();
        let anchored = self.encrypt_json(&signed, &subject).await?;
        self.record_owned(anchored.as_str()).await?;
        Ok(anchored)
    }

    /// `acceptCredential(vcDid)`: decrypt, verify, and (if the subject
    /// matches the current identity) add to the held set.
    #[tracing::instrument(skip(self))]
    pub async fn accept_credential(&self, vc_did: &str) -> Result<bool> {
        let (my_did, _identity) = self.require_current().await?;
        let vc: VerifiableCredential = self.decrypt_json(vc_did).await?;
        let value = serde_json::to_value(&vc)?;
        if !self.verify_signature(&value).await? {
            return Ok(false);
        }
        if vc.credential_subject.id != my_did {
            return Ok(false);
        }

        let mut wallet = self.wallet.lock().await;
        let identity = wallet.current_identity_mut().ok_or(Error::NoCurrentId)?;
        identity.held.push(vc_did.to_string());
        self.store.save(&wallet).await?;
        Ok(true)
    }

    /// `revokeCredential(vcDid)`: only the issuer may deactivate it.
    #[tracing::instrument(skip(self))]
    pub async fn revoke_credential(&self, vc_did: &str) -> Result<bool> {
        let (my_did, identity) = self.require_current().await?;
        let vc: VerifiableCredential = self.decrypt_json(vc_did).await?;
        if vc.issuer != my_did {
            return Ok(false);
        }

        let did = Did::parse(vc_did)?;
        let doc = self.gatekeeper.resolve_did(&did).await?;
        if doc.did_document_metadata.deactivated {
            return Ok(false);
        }

        let keypair = self.keypair_for(identity.account, identity.index)?;
        let op = Operation {
            op: OpType::Delete,
            did: Some(vc_did.to_string()),
            mdip: mdip("delete", "peerbit"),
            public_jwk: None,
            doc: None,
            prev: doc.did_document_metadata.version_id.clone(),
            signature: None,
        };
        let signed_op = sign_operation(op, &my_did, keypair.private_jwk())?;
        self.gatekeeper.delete_did(signed_op).await?;
        Ok(true)
    }

    /// `publishCredential(vcDid, reveal)`: expose the (optionally redacted)
    /// credential body in the issuer's own DID document manifest.
    #[tracing::instrument(skip(self))]
    pub async fn publish_credential(&self, vc_did: &str, reveal: bool) -> Result<()> {
        let (my_did, identity) = self.require_current().await?;
        let mut vc: VerifiableCredential = self.decrypt_json(vc_did).await?;
        if !reveal {
            vc.credential = serde_json::Value::Null;
        }

        let did = Did::parse(&my_did)?;
        let doc = self.gatekeeper.resolve_did(&did).await?;
        let mut manifest = doc
            .did_document_metadata
            .manifest
            .as_ref()
            .and_then(|m| m.as_object().cloned())
            .unwrap_or_default();
        manifest.insert(
            vc_did.to_string(),
            serde_json::to_value(DataPayload::Credential { vc })?,
        );

        let keypair = self.keypair_for(identity.account, identity.index)?;
        let op = Operation {
            op: OpType::Update,
            did: Some(my_did.clone()),
            mdip: mdip("update", "peerbit"),
            public_jwk: None,
            doc: Some(json!({ "manifest": serde_json::Value::Object(manifest) })),
            prev: doc.did_document_metadata.version_id.clone(),
            signature: None,
        };
        let signed_op = sign_operation(op, &my_did, keypair.private_jwk())?;
        self.gatekeeper.update_did(signed_op).await
    }

    /// `unpublishCredential(vcDid)`: remove it from the manifest.
    #[tracing::instrument(skip(self))]
    pub async fn unpublish_credential(&self, vc_did: &str) -> Result<()> {
        let (my_did, identity) = self.require_current().await?;
        let did = Did::parse(&my_did)?;
        let doc = self.gatekeeper.resolve_did(&did).await?;
        let mut manifest = doc
            .did_document_metadata
            .manifest
            .as_ref()
            .and_then(|m| m.as_object().cloned())
            .unwrap_or_default();
        manifest.remove(vc_did);

        let keypair = self.keypair_for(identity.account, identity.index)?;
        let op = Operation {
            op: OpType::Update,
            did: Some(my_did.clone()),
            mdip: mdip("update", "peerbit"),
            public_jwk: None,
            doc: Some(json!({ "manifest": serde_json::Value::Object(manifest) })),
            prev: doc.did_document_metadata.version_id.clone(),
            signature: None,
        };
        let signed_op = sign_operation(op, &my_did, keypair.private_jwk())?;
        self.gatekeeper.update_did(signed_op).await
    }

    /// `createChallenge(requirements)`: anchor a reusable, unbound challenge.
    #[tracing::instrument(skip(self, challenge))]
    pub async fn create_challenge(&self, challenge: Challenge) -> Result<Did> {
        let (did, identity) = self.require_current().await?;
        let keypair = self.keypair_for(identity.account, identity.index)?;
        let payload = serde_json::to_value(DataPayload::Challenge { challenge })?;
        let anchored = self.anchor_data(&did, &keypair, payload).await?;
        self.record_owned(anchored.as_str()).await?;
        Ok(anchored)
    }

    /// `issueChallenge(challengeDid, subjectDid)`: bind a challenge to a
    /// subject, time-boxed to one hour, delivered as a private envelope.
    #[tracing::instrument(skip(self))]
    pub async fn issue_challenge(&self, challenge_did: &str, subject_did: &str) -> Result<Did> {
        let (verifier_did, _identity) = self.require_current().await?;
        let payload = self.resolve_payload(challenge_did).await?;
        let DataPayload::Challenge { challenge } = payload else {
            return Err(Error::InvalidInput);
        };

        let bound = BoundChallenge {
            challenge,
            from: verifier_did,
            to: subject_did.to_string(),
            valid_from: now_iso(),
            valid_until: iso_after(Duration::from_secs(3600)),
            signature: None,
        };
        let signed: BoundChallenge = self.add_signature(&bound).await?;
        let anchored = self.encrypt_json(&signed, subject_did).await?;
        self.record_owned(anchored.as_str()).await?;
        Ok(anchored)
    }

    /// `createResponse(boundChallengeDid)`: for each requirement, find a
    /// held credential satisfying it and re-encrypt a copy to the verifier.
    /// Requirements with no satisfying credential are simply absent from
    /// the resulting presentation.
    #[tracing::instrument(skip(self))]
    pub async fn create_response(&self, bound_challenge_did: &str) -> Result<Did> {
        let (my_did, _identity) = self.require_current().await?;
        let bound: BoundChallenge = self.decrypt_json(bound_challenge_did).await?;
        let value = serde_json::to_value(&bound)?;
        if !self.verify_signature(&value).await? {
            return Err(Error::InvalidInput);
        }
        if bound.to != my_did {
            return Err(Error::InvalidInput);
        }

        let held = {
            let wallet = self.wallet.lock().await;
            wallet
                .current_identity()
                .ok_or(Error::NoCurrentId)?
                .held
                .clone()
        };

        let mut credentials = Vec::new();
        for requirement in &bound.challenge.credentials {
            let mut found = None;
            for vc_did in &held {
                let Ok(vc) = self.decrypt_json::<VerifiableCredential>(vc_did).await else {
                    continue;
                };
                if vc.credential_schema == requirement.schema
                    && requirement.attestors.contains(&vc.issuer)
                {
                    found = Some(vc_did.clone());
                    break;
                }
            }
            let Some(vc_did) = found else {
                continue;
            };
            let vc: VerifiableCredential = self.decrypt_json(&vc_did).await?;
            let vp = self.encrypt_json(&vc, &bound.from).await?;
            credentials.push(PresentationCredential {
                vc: vc_did,
                vp: vp.as_str().to_string(),
            });
        }

        let presentation = Presentation {
            challenge: bound_challenge_did.to_string(),
            credentials,
        };
        let anchored = self.encrypt_json(&presentation, &bound.from).await?;
        self.record_owned(anchored.as_str()).await?;
        Ok(anchored)
    }

    /// `verifyResponse(vpDid)`: decrypt the presentation and its matching
    /// bound challenge, then keep only the credentials that satisfy a
    /// requirement, verify, and are not revoked. Anything that drops out —
    /// wrong schema, wrong attestor, bad signature, revoked — is silently
    /// absent from the result rather than failing the whole call.
    #[tracing::instrument(skip(self))]
    pub async fn verify_response(&self, vp_did: &str) -> Result<Vec<VerifiableCredential>> {
        let presentation: Presentation = self.decrypt_json(vp_did).await?;
        let bound: BoundChallenge = self.decrypt_json(&presentation.challenge).await?;

        let mut verified = Vec::new();
        for requirement in &bound.challenge.credentials {
            for entry in &presentation.credentials {
                let Ok(vc) = self.decrypt_json::<VerifiableCredential>(&entry.vp).await else {
                    continue;
                };
                if vc.credential_schema != requirement.schema
                    || !requirement.attestors.contains(&vc.issuer)
                {
                    continue;
                }
                let value = match serde_json::to_value(&vc) {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                if !self.verify_signature(&value).await.unwrap_or(false) {
                    continue;
                }
                let Ok(did) = Did::parse(&entry.vc) else {
                    continue;
                };
                let deactivated = self
                    .gatekeeper
                    .resolve_did(&did)
                    .await
                    .map(|doc| doc.did_document_metadata.deactivated)
                    .unwrap_or(true);
                if deactivated {
                    continue;
                }
                verified.push(vc);
                break;
            }
        }
        Ok(verified)
    }
}
