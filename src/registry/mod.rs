//! # Registry client (gatekeeper)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         GATEKEEPER                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                    │
//! │   identity/credential engine                                      │
//! │            │                                                      │
//! │            ▼                                                      │
//! │     dyn Gatekeeper  (async_trait)                                 │
//! │      ├── createDid(op)  -> Did                                    │
//! │      ├── resolveDid(did) -> DidDocument                           │
//! │      ├── updateDid(op)                                            │
//! │      └── deleteDid(op)                                            │
//! │            │                              │                       │
//! │            ▼                              ▼                       │
//! │    HttpGatekeeper (reqwest)     InMemoryGatekeeper (tests)         │
//! │                                                                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engines never depend on a transport directly; they hold a
//! `Arc<dyn Gatekeeper>` and are driven against [`InMemoryGatekeeper`] in
//! tests and [`HttpGatekeeper`] in production.

mod http;
mod memory;

pub use http::HttpGatekeeper;
pub use memory::InMemoryGatekeeper;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::keys::PublicJwk;
use crate::identity::did::Did;
use crate::error::Result;

/// The kind of operation submitted to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpType {
    Create,
    Update,
    Delete,
}

/// `mdip` envelope metadata attached to every operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mdip {
    pub version: u32,
    #[serde(rename = "type")]
    pub op_type: String,
    pub registry: String,
}

impl Mdip {
    pub fn new(op_type: &str, registry: &str) -> Self {
        Self {
            version: 1,
            op_type: op_type.to_string(),
            registry: registry.to_string(),
        }
    }
}

/// A signature attached to a canonicalized, detached-signature object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSignature {
    pub signer: String,
    pub signed: String,
    pub hash: String,
    pub value: String,
}

/// A create/update/delete operation submitted to the gatekeeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub op: OpType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
    pub mdip: Mdip,
    #[serde(rename = "publicJwk", skip_serializing_if = "Option::is_none")]
    pub public_jwk: Option<PublicJwk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<OperationSignature>,
}

/// The verification method embedded in a resolved DID document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    pub public_key_jwk: PublicJwk,
}

/// The core (non-metadata) portion of a resolved DID document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocumentCore {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,
}

/// Metadata alongside a resolved DID document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DidDocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub deactivated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault: Option<String>,
    /// Hash of the most recently applied operation; the value the next
    /// update/delete op must set as its `prev` to avoid a conflict rejection.
    #[serde(rename = "versionId", skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

/// A DID document as resolved from the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(default)]
    pub did_document: DidDocumentCore,
    #[serde(default)]
    pub did_document_metadata: DidDocumentMetadata,
}

impl DidDocument {
    /// The most recently rotated-in key. `verification_method` is append-only
    /// (oldest first), so the current key is always the last entry.
    pub fn current_public_jwk(&self) -> Option<&PublicJwk> {
        self.did_document
            .verification_method
            .last()
            .map(|vm| &vm.public_key_jwk)
    }

    /// Every public key this DID has ever rotated through, newest first —
    /// what `decrypt`/`verifySignature` walk to recover historical shared
    /// secrets and stale-signer signatures.
    pub fn key_history(&self) -> impl Iterator<Item = &PublicJwk> {
        self.did_document
            .verification_method
            .iter()
            .rev()
            .map(|vm| &vm.public_key_jwk)
    }
}

/// The pluggable registry abstraction the identity/credential engines
/// depend on.
#[async_trait]
pub trait Gatekeeper: Send + Sync {
    async fn create_did(&self, operation: Operation) -> Result<Did>;
    async fn resolve_did(&self, did: &Did) -> Result<DidDocument>;
    async fn update_did(&self, operation: Operation) -> Result<()>;
    async fn delete_did(&self, operation: Operation) -> Result<()>;
}
