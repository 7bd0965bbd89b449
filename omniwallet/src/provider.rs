//! Native provider contracts.
//!
//! These traits describe the objects wallet extensions inject into the host.
//! They are consumed, never implemented, by the core: a browser binding wraps
//! the real JavaScript objects, tests use in-memory fakes.
//!
//! Three native shapes exist:
//!
//! ```text
//! Eip1193Provider   request({method, params}) + on/removeListener   (MetaMask, OKX, Coinbase)
//! UnisatProvider    requestAccounts/getBalance/... + on/removeListener (UniSat)
//! TronLinkProvider  request + tronWeb.trx.* ; events via postMessage  (TronLink)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;

/// Result type for native provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Callback registered on a native event emitter.
pub type NativeListener = Arc<dyn Fn(Value) + Send + Sync>;

/// Handle returned by a native `on` call, used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeListenerId(pub u64);

/// Arguments of an EIP-1193 style `request` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestArguments {
    /// JSON-RPC method name.
    pub method: String,
    /// Positional parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RequestArguments {
    /// A request without parameters.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
        }
    }

    /// Attach parameters, wrapping anything that is not already an array
    /// in a one-element array.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(match params {
            Value::Array(_) => params,
            other => Value::Array(vec![other]),
        });
        self
    }
}

impl From<&str> for RequestArguments {
    fn from(method: &str) -> Self {
        Self::new(method)
    }
}

impl From<String> for RequestArguments {
    fn from(method: String) -> Self {
        Self::new(method)
    }
}

/// Native `on`/`removeListener` pair.
pub trait EventEmitter: Send + Sync {
    /// Register a listener for a native event.
    fn on(&self, event: &str, listener: NativeListener) -> NativeListenerId;

    /// Remove a listener previously returned by [`on`](Self::on).
    fn remove_listener(&self, event: &str, id: NativeListenerId);
}

/// EIP-1193 provider.
#[async_trait]
pub trait Eip1193Provider: EventEmitter {
    /// Generic JSON-RPC style request.
    async fn request(&self, args: RequestArguments) -> ProviderResult<Value>;

    /// Resolve a named provider when several EVM wallets share one injected
    /// namespace (a `providerMap`). `None` when there is no such map or no
    /// entry for the name.
    fn sub_provider(&self, _name: &str) -> Option<Arc<dyn Eip1193Provider>> {
        None
    }
}

/// Balance reported by a UTXO wallet, in satoshis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoBalance {
    /// Confirmed satoshis.
    pub confirmed: u64,
    /// Unconfirmed satoshis.
    pub unconfirmed: u64,
    /// Total satoshis.
    pub total: u64,
}

/// UniSat-style Bitcoin provider.
#[async_trait]
pub trait UnisatProvider: EventEmitter {
    /// Ask the user for account access.
    async fn request_accounts(&self) -> ProviderResult<Vec<String>>;

    /// Current network name (`livenet`, `testnet`, ...).
    async fn get_network(&self) -> ProviderResult<String>;

    /// Balance of the active account.
    async fn get_balance(&self) -> ProviderResult<UtxoBalance>;

    /// Send satoshis; returns the transaction id.
    async fn send_bitcoin(
        &self,
        to: &str,
        satoshis: u64,
        fee_rate: Option<u64>,
    ) -> ProviderResult<String>;

    /// Sign a message with the active key.
    async fn sign_message(&self, message: &str) -> ProviderResult<String>;

    /// Switch the wallet network.
    async fn switch_network(&self, network: &str) -> ProviderResult<()>;
}

/// TronLink provider (`window.tronLink` plus its `tronWeb`).
#[async_trait]
pub trait TronLinkProvider: Send + Sync {
    /// Whether `tronWeb` has been initialized.
    fn ready(&self) -> bool;

    /// `tronLink.request`, returning the raw response body.
    async fn request(&self, args: RequestArguments) -> ProviderResult<Value>;

    /// `tronWeb.defaultAddress.base58`.
    fn default_address(&self) -> Option<String>;

    /// Balance in sun.
    async fn get_balance(&self, address: &str) -> ProviderResult<u64>;

    /// Raw current block object.
    async fn get_current_block(&self) -> ProviderResult<Value>;

    /// `tronWeb.feeLimit`.
    fn fee_limit(&self) -> u64;

    /// Send sun to an address; returns the raw broadcast result.
    async fn send_trx(&self, to: &str, amount: u64) -> ProviderResult<Value>;

    /// Sign a message.
    async fn sign_message(&self, message: &str) -> ProviderResult<String>;
}

/// Simple fan-out emitter usable by provider bindings and fakes.
#[derive(Default)]
pub struct ListenerSet {
    inner: std::sync::Mutex<ListenerSetInner>,
}

#[derive(Default)]
struct ListenerSetInner {
    next_id: u64,
    listeners: HashMap<String, Vec<(NativeListenerId, NativeListener)>>,
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        let counts: HashMap<&str, usize> = inner
            .listeners
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("ListenerSet")
            .field("listeners", &counts)
            .finish()
    }
}

impl ListenerSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ListenerSetInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register a listener.
    pub fn add(&self, event: &str, listener: NativeListener) -> NativeListenerId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = NativeListenerId(inner.next_id);
        inner
            .listeners
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove a listener.
    pub fn remove(&self, event: &str, id: NativeListenerId) {
        if let Some(entries) = self.lock().listeners.get_mut(event) {
            entries.retain(|(existing, _)| *existing != id);
        }
    }

    /// Invoke every listener of an event with a payload.
    pub fn emit(&self, event: &str, payload: &Value) {
        let targets: Vec<NativeListener> = self
            .lock()
            .listeners
            .get(event)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();
        for listener in targets {
            listener(payload.clone());
        }
    }

    /// Number of listeners for an event.
    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.lock().listeners.get(event).map_or(0, Vec::len)
    }
}
