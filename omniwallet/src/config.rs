//! Configuration types.
//!
//! Everything here deserializes from JSON with defaults for missing fields,
//! so a config file only needs the values it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};

/// Default Bitcoin explorer API.
pub const DEFAULT_EXPLORER_URL: &str = "https://mempool.space/api";

/// Default number of fraction digits for UTXO balances.
pub const DEFAULT_UTXO_FRACTION_DIGITS: u8 = 8;

/// Settings of the reactive wallet facade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WalletProviderConfig {
    /// Reconnect to the last used wallet on start.
    pub auto_connect: bool,
    /// Balance polling period in milliseconds. Reserved; nothing polls yet.
    pub poll_balance_interval: Option<u64>,
    /// Block number polling period in milliseconds. Reserved; nothing polls yet.
    pub poll_block_number_interval: Option<u64>,
    /// UTXO explorer settings.
    pub explorer: ExplorerConfig,
}

impl WalletProviderConfig {
    /// Enable or disable auto-connect.
    #[must_use]
    pub const fn auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    /// Set the balance polling period.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn poll_balance_interval(mut self, interval: Duration) -> Self {
        self.poll_balance_interval = Some(interval.as_millis() as u64);
        self
    }

    /// Set the block number polling period.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn poll_block_number_interval(mut self, interval: Duration) -> Self {
        self.poll_block_number_interval = Some(interval.as_millis() as u64);
        self
    }

    /// Replace the explorer settings.
    #[must_use]
    pub fn explorer(mut self, explorer: ExplorerConfig) -> Self {
        self.explorer = explorer;
        self
    }

    /// Parse from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`] for malformed JSON or mistyped fields.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| WalletError::Config(format!("invalid config: {e}")))
    }

    /// Load from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Config`] when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| WalletError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }
}

/// Block explorer used by wallets whose provider has no chain queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExplorerConfig {
    /// API base URL without a trailing slash.
    pub base_url: String,
    /// Fraction digits of formatted balances.
    pub fraction_digits: u8,
    /// HTTP client settings.
    pub http: HttpClientConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EXPLORER_URL.to_string(),
            fraction_digits: DEFAULT_UTXO_FRACTION_DIGITS,
            http: HttpClientConfig::default(),
        }
    }
}

impl ExplorerConfig {
    /// Set the API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the number of fraction digits.
    #[must_use]
    pub const fn fraction_digits(mut self, digits: u8) -> Self {
        self.fraction_digits = digits;
        self
    }

    /// Join a path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Shared HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpClientConfig {
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// User agent string.
    pub user_agent: Option<String>,
    /// Ignore proxy settings from the environment.
    pub no_proxy: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Some(10),
            user_agent: None,
            no_proxy: false,
        }
    }
}

impl HttpClientConfig {
    /// Build a reqwest client with this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Http`] when reqwest rejects the settings, for
    /// example a TLS backend that fails to initialize.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        if let Some(ref user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        if self.no_proxy {
            builder = builder.no_proxy();
        }

        Ok(builder.build()?)
    }
}
