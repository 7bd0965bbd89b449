//! Process-scoped wallet context.
//!
//! Owns what every plugin shares: the host, persisted storage, the event bus,
//! the version counter and the plugin registry.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;
use tracing::info;

use crate::brands::Brand;
use crate::bus::EventBus;
use crate::config::ExplorerConfig;
use crate::error::Result;
use crate::host::Host;
use crate::plugin::{ChainFamily, PluginInfo, WalletPlugin};
use crate::registry::PluginRegistry;
use crate::storage::{MemoryStorage, Storage, StorageKeys};
use crate::version::VersionCounter;

/// What plugins share with their context.
pub(crate) struct Shared {
    pub(crate) host: Arc<dyn Host>,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) keys: StorageKeys,
    pub(crate) bus: EventBus,
    pub(crate) version: Arc<VersionCounter>,
}

/// Builder for [`WalletContext`].
pub struct WalletContextBuilder {
    host: Arc<dyn Host>,
    storage: Option<Arc<dyn Storage>>,
    bus: Option<EventBus>,
    explorer: ExplorerConfig,
}

impl std::fmt::Debug for WalletContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletContextBuilder")
            .field("explorer", &self.explorer)
            .finish_non_exhaustive()
    }
}

impl WalletContextBuilder {
    /// Use a storage backend. Defaults to [`MemoryStorage`].
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Use an existing event bus.
    #[must_use]
    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Explorer used by the built-in UTXO plugin.
    #[must_use]
    pub fn explorer(mut self, explorer: ExplorerConfig) -> Self {
        self.explorer = explorer;
        self
    }

    /// Build an empty context.
    #[must_use]
    pub fn build(self) -> WalletContext {
        let keys = StorageKeys::for_origin(&self.host.origin());
        WalletContext {
            inner: Arc::new(ContextInner {
                shared: Arc::new(Shared {
                    host: self.host,
                    storage: self
                        .storage
                        .unwrap_or_else(|| Arc::new(MemoryStorage::new())),
                    keys,
                    bus: self.bus.unwrap_or_default(),
                    version: Arc::new(VersionCounter::new()),
                }),
                registry: RwLock::new(PluginRegistry::new()),
                explorer: self.explorer,
            }),
        }
    }
}

struct ContextInner {
    shared: Arc<Shared>,
    registry: RwLock<PluginRegistry>,
    explorer: ExplorerConfig,
}

/// Shared state of all wallet plugins in one process.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct WalletContext {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for WalletContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletContext")
            .field("plugins", &self.names())
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

impl WalletContext {
    /// Start building a context over a host.
    #[must_use]
    pub fn builder(host: Arc<dyn Host>) -> WalletContextBuilder {
        WalletContextBuilder {
            host,
            storage: None,
            bus: None,
            explorer: ExplorerConfig::default(),
        }
    }

    /// Context with every built-in brand registered.
    ///
    /// # Errors
    ///
    /// Fails when the UTXO explorer's HTTP client cannot be built.
    pub fn with_default_plugins(host: Arc<dyn Host>) -> Result<Self> {
        let cx = Self::builder(host).build();
        cx.register_brands(&Brand::ALL)?;
        Ok(cx)
    }

    /// Register built-in brands.
    ///
    /// # Errors
    ///
    /// Fails when a brand's strategy cannot be created. Brands before it
    /// stay registered.
    pub fn register_brands(&self, brands: &[Brand]) -> Result<()> {
        for brand in brands {
            let family = brand.family(&self.inner.explorer)?;
            self.add_plugin(brand.info(), family);
        }
        info!(plugins = ?self.names(), "wallet plugins registered");
        Ok(())
    }

    /// Create a plugin bound to this context without registering it.
    #[must_use]
    pub fn new_plugin(&self, info: PluginInfo, family: Arc<dyn ChainFamily>) -> WalletPlugin {
        WalletPlugin::new(Arc::clone(&self.inner.shared), info, family)
    }

    /// Create and register a plugin.
    pub fn add_plugin(&self, info: PluginInfo, family: Arc<dyn ChainFamily>) -> WalletPlugin {
        let plugin = self.new_plugin(info, family);
        self.register(plugin.clone());
        plugin
    }

    /// Register a plugin, replacing any plugin with the same name.
    pub fn register(&self, plugin: WalletPlugin) -> Option<WalletPlugin> {
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(plugin)
    }

    /// Plugin by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<WalletPlugin> {
        self.registry().get(name).cloned()
    }

    /// First registered plugin whose provider is injected.
    #[must_use]
    pub fn match_injected(&self) -> Option<WalletPlugin> {
        self.registry()
            .match_injected(self.inner.shared.host.as_ref())
            .cloned()
    }

    /// Registered plugin names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.registry().names()
    }

    /// All plugins in registration order.
    #[must_use]
    pub fn plugins(&self) -> Vec<WalletPlugin> {
        self.registry().iter().cloned().collect()
    }

    fn registry(&self) -> std::sync::RwLockReadGuard<'_, PluginRegistry> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Explorer settings used for UTXO brands.
    #[must_use]
    pub fn explorer(&self) -> &ExplorerConfig {
        &self.inner.explorer
    }

    /// Host environment.
    #[must_use]
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.inner.shared.host
    }

    /// Persisted storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.shared.storage
    }

    /// Keys of the persisted values.
    #[must_use]
    pub fn storage_keys(&self) -> &StorageKeys {
        &self.inner.shared.keys
    }

    /// Persisted name of the last connected plugin.
    #[must_use]
    pub fn last_platform(&self) -> Option<String> {
        self.storage()
            .get(&self.inner.shared.keys.platform)
            .filter(|p| !p.is_empty())
    }

    /// Domain event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.shared.bus
    }

    /// Current state version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.shared.version.get()
    }

    /// Watch the state version.
    #[must_use]
    pub fn subscribe_version(&self) -> watch::Receiver<u64> {
        self.inner.shared.version.subscribe()
    }
}
