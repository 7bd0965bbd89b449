//! Name-keyed plugin registry.
//!
//! Iteration follows registration order. Registering a name twice replaces
//! the earlier plugin in place, so the lookup order never changes.

use tracing::{debug, warn};

use crate::host::Host;
use crate::plugin::WalletPlugin;

/// Ordered set of plugins keyed by name.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<WalletPlugin>,
}

impl PluginRegistry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Insert a plugin. Returns the plugin it replaced, if any.
    pub fn register(&mut self, plugin: WalletPlugin) -> Option<WalletPlugin> {
        if let Some(slot) = self.plugins.iter_mut().find(|p| p.name() == plugin.name()) {
            warn!(wallet = %plugin.name(), "plugin registered twice, replacing");
            return Some(std::mem::replace(slot, plugin));
        }
        debug!(wallet = %plugin.name(), "plugin registered");
        self.plugins.push(plugin);
        None
    }

    /// Plugin by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&WalletPlugin> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// First plugin, in registration order, whose provider is injected.
    #[must_use]
    pub fn match_injected(&self, host: &dyn Host) -> Option<&WalletPlugin> {
        self.plugins
            .iter()
            .find(|p| host.is_injected(p.injected_key()))
    }

    /// Registered names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    /// Number of plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &WalletPlugin> {
        self.plugins.iter()
    }
}
