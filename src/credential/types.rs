//! Data-DID payload shapes: credential schemas, bound/attested credentials,
//! challenges, presentations, and ciphertext envelopes.

use serde::{Deserialize, Serialize};

/// A detached signature over a canonicalized object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub signer: String,
    pub signed: String,
    pub hash: String,
    pub value: String,
}

/// `credentialSubject` of a verifiable credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSubject {
    pub id: String,
}

/// The default JSON-LD context for a [`VerifiableCredential`].
pub const VC_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

fn default_context() -> String {
    VC_CONTEXT.to_string()
}

fn default_vc_type() -> Vec<String> {
    vec!["VerifiableCredential".to_string()]
}

/// A verifiable credential, bound (unsigned) or attested (signed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiableCredential {
    #[serde(rename = "@context", default = "default_context")]
    pub context: String,
    #[serde(rename = "type", default = "default_vc_type")]
    pub vc_type: Vec<String>,
    pub issuer: String,
    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,
    pub credential: serde_json::Value,
    /// DID of the [`DataPayload::CredentialSchema`] this credential was bound
    /// against; lets `createResponse`/`verifyResponse` match a held VC
    /// against a challenge's `schema` requirement without re-validating the
    /// credential body against the schema on every lookup.
    #[serde(rename = "credentialSchema")]
    pub credential_schema: String,
    #[serde(rename = "validFrom")]
    pub valid_from: String,
    #[serde(rename = "validUntil", skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

/// A single credential requirement in a challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeCredentialRequest {
    pub schema: String,
    pub attestors: Vec<String>,
}

/// An unbound challenge: the set of credential requirements a verifier asks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub credentials: Vec<ChallengeCredentialRequest>,
}

/// A challenge bound to a specific subject, signed by the verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundChallenge {
    pub challenge: Challenge,
    pub from: String,
    pub to: String,
    #[serde(rename = "validFrom")]
    pub valid_from: String,
    #[serde(rename = "validUntil")]
    pub valid_until: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

/// One credential entry in a presentation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationCredential {
    pub vc: String,
    pub vp: String,
}

/// A subject's response to a bound challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
    pub challenge: String,
    pub credentials: Vec<PresentationCredential>,
}

/// An asymmetric message envelope: the same plaintext encrypted twice, once
/// for the sender and once for the receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: String,
    pub cipher_hash: String,
    pub cipher_sender: String,
    pub cipher_receiver: String,
}

/// The tagged union of everything that can be anchored as a data-DID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DataPayload {
    CredentialSchema { schema: serde_json::Value },
    BoundCredential { vc: VerifiableCredential },
    Credential { vc: VerifiableCredential },
    Challenge { challenge: Challenge },
    BoundChallenge { bound: BoundChallenge },
    Presentation { presentation: Presentation },
    Envelope { envelope: Envelope },
}
