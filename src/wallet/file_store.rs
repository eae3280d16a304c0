//! Filesystem-backed [`WalletStore`]: atomic temp-file-then-rename writes.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{Wallet, WalletStore};
use crate::error::{Error, Result};

pub struct FileWalletStore {
    path: PathBuf,
}

impl FileWalletStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        let file_name = tmp
            .file_name()
            .map(|n| format!("{}.tmp", n.to_string_lossy()))
            .unwrap_or_else(|| "wallet.json.tmp".to_string());
        tmp.set_file_name(file_name);
        tmp
    }
}

#[async_trait]
impl WalletStore for FileWalletStore {
    async fn load(&self) -> Result<Option<Wallet>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::StorageReadError(e.to_string()))?;
        let wallet = serde_json::from_slice(&bytes)
            .map_err(|e| Error::StorageCorrupted(e.to_string()))?;
        Ok(Some(wallet))
    }

    async fn save(&self, wallet: &Wallet) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(wallet)?;
        let tmp = self.tmp_path();

        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| Error::StorageWriteError(e.to_string()))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| Error::StorageWriteError(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| Error::StorageWriteError(e.to_string()))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::StorageWriteError(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{SeedSection, SerializedHdKey};

    fn sample_wallet() -> Wallet {
        Wallet::new(SeedSection {
            mnemonic: "encrypted-blob".to_string(),
            hdkey: SerializedHdKey {
                xpriv: "xprv...".to_string(),
                xpub: "xpub...".to_string(),
            },
        })
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWalletStore::new(dir.path().join("wallet.json"));

        assert!(!store.exists().await.unwrap());
        let wallet = sample_wallet();
        store.save(&wallet).await.unwrap();

        assert!(store.exists().await.unwrap());
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.counter, wallet.counter);
        assert_eq!(loaded.seed.mnemonic, wallet.seed.mnemonic);
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileWalletStore::new(dir.path().join("missing.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let store = FileWalletStore::new(&path);
        store.save(&sample_wallet()).await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["wallet.json".to_string()]);
    }
}
