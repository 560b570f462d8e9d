use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
    /// Directory holding the per-key JSON store (history, favorites, ...).
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Wallet capability to wire in: "simulated", or "none" to run without
    /// one (connect then fails ProviderUnavailable).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Account the simulated provider exposes.
    #[serde(default = "default_account_address")]
    pub account_address: String,
    /// Opening ledger balance for the simulated account, decimal coin string.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: String,
    /// Simulated settlement round-trip, milliseconds.
    #[serde(default = "default_settlement_latency_ms")]
    pub settlement_latency_ms: u64,
    /// Fraction of settlements the simulated provider fails, 0.0..=1.0.
    #[serde(default)]
    pub settlement_failure_rate: f32,
    /// When false the simulated provider declines account access.
    #[serde(default = "default_grant_access")]
    pub grant_access: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Plain-text confirmation secret. A spending speed bump for manual
    /// confirmation mode, not an authentication credential.
    #[serde(default = "default_confirmation_secret")]
    pub confirmation_secret: String,
    /// Auto-pay default for a fresh install; the persisted flag wins after
    /// that.
    #[serde(default = "default_auto_pay")]
    pub auto_pay_default: bool,
}

/// Catalog source — a local TOML file (highest priority), then a remote
/// TOML URL, then the built-in demo catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to a local TOML catalog file.
    /// Defaults to `$XDG_CONFIG_HOME/cassette/catalog.toml`.
    #[serde(default = "default_catalog_toml")]
    pub catalog_toml: PathBuf,
    /// URL for a remote TOML catalog (fallback when the file is not found).
    /// Empty disables the remote fetch.
    #[serde(default)]
    pub catalog_url: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            pid_file: default_pid_file(),
            store_dir: default_store_dir(),
            bind_address: default_bind_address(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            port: default_http_port(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            account_address: default_account_address(),
            initial_balance: default_initial_balance(),
            settlement_latency_ms: default_settlement_latency_ms(),
            settlement_failure_rate: 0.0,
            grant_access: default_grant_access(),
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            confirmation_secret: default_confirmation_secret(),
            auto_pay_default: default_auto_pay(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            catalog_toml: default_catalog_toml(),
            catalog_url: String::new(),
        }
    }
}

fn default_pid_file() -> PathBuf {
    platform::data_dir().join("daemon.pid")
}

fn default_store_dir() -> PathBuf {
    platform::data_dir().join("store")
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_http_enabled() -> bool {
    true
}

fn default_http_port() -> u16 {
    8991
}

fn default_provider() -> String {
    "simulated".to_string()
}

fn default_account_address() -> String {
    "0x51A6cB0f0d2f2E3a8cC2b1C6e9bD4E5a7F381c29".to_string()
}

fn default_initial_balance() -> String {
    "10".to_string()
}

fn default_settlement_latency_ms() -> u64 {
    2000
}

fn default_grant_access() -> bool {
    true
}

fn default_confirmation_secret() -> String {
    "1234".to_string()
}

fn default_auto_pay() -> bool {
    true
}

fn default_catalog_toml() -> PathBuf {
    platform::config_dir().join("catalog.toml")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
