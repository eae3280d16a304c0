//! In-memory [`WalletStore`] used by tests and the credential-engine
//! integration suite.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Wallet, WalletStore};
use crate::error::Result;

#[derive(Default)]
pub struct MemoryWalletStore {
    inner: RwLock<Option<Wallet>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for MemoryWalletStore {
    async fn load(&self) -> Result<Option<Wallet>> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, wallet: &Wallet) -> Result<()> {
        *self.inner.write().await = Some(wallet.clone());
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.inner.read().await.is_some())
    }
}
