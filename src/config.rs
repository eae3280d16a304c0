//! # Configuration
//!
//! Layered configuration for the wallet core: compiled-in defaults, then
//! environment variables, then explicit caller overrides.

use std::time::Duration;

/// Runtime configuration for a [`crate::WalletEngine`].
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Base URL of the gatekeeper registry's HTTP API.
    pub registry_url: String,

    /// Per-call timeout for registry requests.
    pub registry_timeout: Duration,

    /// Path to the wallet file on disk.
    pub wallet_path: std::path::PathBuf,
}

impl WalletConfig {
    /// Compiled-in defaults, overridden by environment variables.
    ///
    /// Recognizes `MDIP_REGISTRY_URL`, `MDIP_REGISTRY_TIMEOUT_SECS`, and
    /// `MDIP_WALLET_PATH`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MDIP_REGISTRY_URL") {
            config.registry_url = url;
        }
        if let Ok(secs) = std::env::var("MDIP_REGISTRY_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                config.registry_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(path) = std::env::var("MDIP_WALLET_PATH") {
            config.wallet_path = path.into();
        }

        config
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            registry_url: "http://localhost:4224".to_string(),
            registry_timeout: Duration::from_secs(30),
            wallet_path: "wallet.json".into(),
        }
    }
}
