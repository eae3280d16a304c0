//! # Decentralized Identifiers (DIDs)
//!
//! Implementation of the `did:mdip` method.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       did:mdip FORMAT                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                    │
//! │  did : mdip : <base58(sha256(canonicalize(createOperation)))>     │
//! │   │      │                         │                               │
//! │   │      │                         └─ content hash of the op that │
//! │   │      │                            first anchored this DID     │
//! │   │      └─ method name, mdip.version = 1                         │
//! │   └─ scheme                                                       │
//! │                                                                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A DID is never constructed from key material directly: its content is
//! the hash of the operation that created it, so rotating the controlling
//! key (via an update operation) never changes the identifier.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::crypto::canonical::canonicalize;
use crate::error::{Error, Result};

pub const METHOD: &str = "mdip";

/// A parsed `did:mdip:...` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Compute the DID for a create operation: `did:mdip:<base58(sha256(jcs(op)))>`.
    pub fn from_create_operation<T: Serialize>(op: &T) -> Result<Self> {
        let canonical = canonicalize(op)?;
        let digest = Sha256::digest(canonical.as_bytes());
        let encoded = bs58::encode(digest).into_string();
        Ok(Self(format!("did:{METHOD}:{encoded}")))
    }

    /// Parse and validate an existing DID string.
    pub fn parse(s: &str) -> Result<Self> {
        let prefix = format!("did:{METHOD}:");
        let Some(rest) = s.strip_prefix(&prefix) else {
            return Err(Error::InvalidDid(format!(
                "expected did:{METHOD}:... got {s}"
            )));
        };
        if rest.is_empty() || bs58::decode(rest).into_vec().is_err() {
            return Err(Error::InvalidDid(format!("malformed mdip DID: {s}")));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Did {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Did::parse(s)
    }
}

impl TryFrom<String> for Did {
    type Error = Error;
    fn try_from(s: String) -> Result<Self> {
        Did::parse(&s)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}
