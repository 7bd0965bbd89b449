//! Reactive facade for UI layers.
//!
//! A UI holds one [`WalletProvider`], watches its version and re-reads
//! [`WalletProvider::snapshot`] whenever it moves.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::brands::Brand;
use crate::config::WalletProviderConfig;
use crate::context::WalletContext;
use crate::error::{Result, WalletError};
use crate::host::Host;
use crate::plugin::{AssetInfo, Status, WalletPlugin};

/// Name tried when neither a name nor a last-used platform is known.
pub const INJECTED_PLUGIN_NAME: &str = "injected";

/// Everything a UI renders about the active wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    /// Name of the active plugin.
    pub provider: Option<String>,
    /// Canonical network id.
    pub network: String,
    /// Active account.
    pub account: String,
    /// Cached balance.
    pub balance: String,
    /// Whether the active plugin is connected.
    pub is_connected: bool,
    /// Status of the active plugin.
    pub status: Status,
    /// Known assets.
    pub assets: Vec<AssetInfo>,
    /// Persisted last-used platform.
    pub platform: String,
}

impl Default for WalletSnapshot {
    fn default() -> Self {
        Self {
            provider: None,
            network: String::new(),
            account: String::new(),
            balance: "0".to_string(),
            is_connected: false,
            status: Status::Initial,
            assets: Vec::new(),
            platform: String::new(),
        }
    }
}

impl WalletSnapshot {
    fn of(plugin: &WalletPlugin) -> Self {
        Self {
            provider: Some(plugin.name().to_string()),
            network: plugin.network(),
            account: plugin.account(),
            balance: plugin.balance(),
            is_connected: plugin.is_connected(),
            status: plugin.status(),
            assets: plugin.assets(),
            platform: plugin.platform(),
        }
    }
}

/// One handle over the active wallet plugin.
pub struct WalletProvider {
    cx: WalletContext,
    config: WalletProviderConfig,
    active: RwLock<Option<WalletPlugin>>,
    last_used: RwLock<String>,
}

impl std::fmt::Debug for WalletProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletProvider")
            .field("active", &self.active().map(|p| p.name().to_string()))
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

impl WalletProvider {
    /// Create a facade over a context.
    #[must_use]
    pub fn new(cx: WalletContext, config: WalletProviderConfig) -> Self {
        let last_used = cx.last_platform().unwrap_or_default();
        Self {
            cx,
            config,
            active: RwLock::new(None),
            last_used: RwLock::new(last_used),
        }
    }

    /// Facade over a fresh context with every built-in brand registered,
    /// using the explorer from `config`.
    ///
    /// # Errors
    ///
    /// Fails when the explorer HTTP client cannot be built.
    pub fn with_default_plugins(host: Arc<dyn Host>, config: WalletProviderConfig) -> Result<Self> {
        let cx = WalletContext::builder(host)
            .explorer(config.explorer.clone())
            .build();
        cx.register_brands(&Brand::ALL)?;
        Ok(Self::new(cx, config))
    }

    /// The wallet context.
    #[must_use]
    pub const fn context(&self) -> &WalletContext {
        &self.cx
    }

    /// Facade settings.
    #[must_use]
    pub const fn config(&self) -> &WalletProviderConfig {
        &self.config
    }

    /// The active plugin, if any.
    #[must_use]
    pub fn active(&self) -> Option<WalletPlugin> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Name of the plugin connected most recently through this facade, or
    /// the persisted platform at construction.
    #[must_use]
    pub fn last_used(&self) -> String {
        self.last_used
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current view of the active wallet.
    #[must_use]
    pub fn snapshot(&self) -> WalletSnapshot {
        self.active()
            .map_or_else(WalletSnapshot::default, |p| WalletSnapshot::of(&p))
    }

    /// Connect a plugin and make it the active one.
    ///
    /// Without a name, the last used plugin is tried, then the first plugin
    /// whose provider is injected.
    ///
    /// # Errors
    ///
    /// [`WalletError::NoMatchingPlugin`] when nothing matches, otherwise the
    /// plugin's connect error.
    pub async fn connect(&self, name: Option<&str>) -> Result<String> {
        let last_used = self.last_used();
        let name = name
            .filter(|n| !n.is_empty())
            .or_else(|| Some(last_used.as_str()).filter(|n| !n.is_empty()))
            .unwrap_or(INJECTED_PLUGIN_NAME);

        let plugin = self
            .cx
            .get(name)
            .or_else(|| self.cx.match_injected())
            .ok_or(WalletError::NoMatchingPlugin)?;
        info!(wallet = %plugin.name(), requested = %name, "facade connect");

        let account = plugin.connect().await?;

        *self
            .last_used
            .write()
            .unwrap_or_else(PoisonError::into_inner) = plugin.name().to_string();
        let previous = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(plugin.clone());
        if let Some(previous) = previous.filter(|p| !p.ptr_eq(&plugin) && p.is_connected()) {
            previous.disconnect();
            plugin.persist();
        }
        plugin.incr_version(1);
        Ok(account)
    }

    /// Disconnect and forget the active plugin.
    pub fn disconnect(&self) {
        let active = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(plugin) = active {
            info!(wallet = %plugin.name(), "facade disconnect");
            plugin.disconnect();
        }
    }

    /// Gas price of the active plugin, `0` without one.
    ///
    /// # Errors
    ///
    /// Propagates the plugin's error.
    pub async fn gas_price(&self) -> Result<u128> {
        match self.active() {
            Some(plugin) => plugin.gas_price().await,
            None => Ok(0),
        }
    }

    /// Block number of the active plugin, `0` without one.
    ///
    /// # Errors
    ///
    /// Propagates the plugin's error.
    pub async fn block_number(&self) -> Result<u64> {
        match self.active() {
            Some(plugin) => plugin.block_number().await,
            None => Ok(0),
        }
    }

    /// Current state version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.cx.version()
    }

    /// Watch the state version.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.cx.subscribe_version()
    }

    /// Wait until the version moves past `since`; returns the new version.
    pub async fn changed(&self, since: u64) -> u64 {
        let mut rx = self.subscribe();
        match rx.wait_for(|v| *v > since).await {
            Ok(version) => *version,
            Err(_) => self.version(),
        }
    }

    /// Run start-up behaviour: reconnect when `auto_connect` is set.
    ///
    /// Failures are logged, never returned.
    pub async fn start(&self) -> Option<String> {
        if !self.config.auto_connect {
            return None;
        }
        match self.connect(None).await {
            Ok(account) => Some(account),
            Err(e) => {
                warn!(error = %e, "auto-connect failed");
                None
            }
        }
    }
}
