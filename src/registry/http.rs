//! HTTP-backed gatekeeper, speaking the surface in the external-interfaces
//! section: `GET /version`, `GET /did/{did}`, `POST /did`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{DidDocument, Gatekeeper, Operation};
use crate::identity::did::Did;
use crate::error::{Error, Result};

pub struct HttpGatekeeper {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CreateDidResponse {
    did: String,
}

impl HttpGatekeeper {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::RegistryUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Gatekeeper for HttpGatekeeper {
    #[tracing::instrument(skip(self, operation))]
    async fn create_did(&self, operation: Operation) -> Result<Did> {
        let resp = self
            .client
            .post(self.url("/did"))
            .json(&operation)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::RegistryRejected(resp.status().to_string()));
        }
        let body: CreateDidResponse = resp.json().await?;
        Did::parse(&body.did)
    }

    #[tracing::instrument(skip(self))]
    async fn resolve_did(&self, did: &Did) -> Result<DidDocument> {
        let resp = self
            .client
            .get(self.url(&format!("/did/{did}")))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::RegistryUnavailable(resp.status().to_string()));
        }
        Ok(resp.json().await?)
    }

    #[tracing::instrument(skip(self, operation))]
    async fn update_did(&self, operation: Operation) -> Result<()> {
        let did = operation
            .did
            .clone()
            .ok_or(Error::InvalidInput)?;
        let resp = self
            .client
            .post(self.url(&format!("/did/{did}")))
            .json(&operation)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::RegistryRejected(resp.status().to_string()));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, operation))]
    async fn delete_did(&self, operation: Operation) -> Result<()> {
        let did = operation
            .did
            .clone()
            .ok_or(Error::InvalidInput)?;
        let resp = self
            .client
            .post(self.url(&format!("/did/{did}")))
            .json(&operation)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::RegistryRejected(resp.status().to_string()));
        }
        Ok(())
    }
}
