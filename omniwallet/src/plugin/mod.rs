//! Wallet plugins: one connection state machine per wallet brand.
//!
//! # Architecture
//!
//! ```text
//! WalletPlugin (PluginInfo + Arc<dyn ChainFamily>)
//!   ├── connect()        → Connecting → Connected, or back to the prior status
//!   ├── disconnect()     → Disconnected, persisted fields cleared
//!   ├── Session          → native listeners + pump, alive while Connected
//!   │     └── NativeEvent → on_accounts_changed / on_chain_changed / ...
//!   └── every mutation   → VersionCounter::incr + DomainEvent on the EventBus
//! ```
//!
//! `is_connected` is derived from the single [`Status`] value, never stored.

mod family;
mod session;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

pub use family::{
    AddChainParameter, BalanceQuery, ChainFamily, FamilyKind, NativeCurrency, NativeEvent,
    NativeSink, ProviderContext, TransferRequest,
};
pub use session::Subscription;

use self::session::Session;
use crate::bus::ListenerId;
use crate::chains::SignatureParts;
use crate::context::Shared;
use crate::error::{Result, WalletError};
use crate::events::{DomainEvent, EventName, TransactionEvent, WalletEvent};
use crate::provider::RequestArguments;
use crate::units::{canonical_network, parse_u64_quantity};

/// Identity and capability descriptor of one wallet brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    /// Unique name; registry key and persisted platform value.
    pub name: String,
    /// Global key the brand injects its provider under.
    pub injected_key: String,
    /// Where to install the extension.
    pub install_url: String,
    /// Developer documentation.
    #[serde(default)]
    pub docs_url: Option<String>,
}

impl PluginInfo {
    /// Describe a plugin.
    pub fn new(
        name: impl Into<String>,
        injected_key: impl Into<String>,
        install_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            injected_key: injected_key.into(),
            install_url: install_url.into(),
            docs_url: None,
        }
    }

    /// Set the documentation URL.
    #[must_use]
    pub fn docs_url(mut self, url: impl Into<String>) -> Self {
        self.docs_url = Some(url.into());
        self
    }
}

/// Connection status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Never connected in this process.
    #[default]
    Initial,
    /// Account access granted; native events are flowing.
    Connected,
    /// Explicitly or implicitly disconnected.
    Disconnected,
    /// A connect request is in flight.
    Connecting,
    /// Wallet-level failure. A failed connect does not enter it; the
    /// status from before the attempt is restored.
    Error,
}

/// A token or asset held by the active account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    /// Asset name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Balance as a decimal string.
    pub balance: String,
    /// Contract address.
    pub address: String,
    /// Logo URL.
    pub logo_url: String,
}

#[derive(Debug)]
struct PluginState {
    status: Status,
    account: String,
    network: String,
    balance: String,
    assets: Vec<AssetInfo>,
}

impl Default for PluginState {
    fn default() -> Self {
        Self {
            status: Status::Initial,
            account: String::new(),
            network: String::new(),
            balance: "0".to_string(),
            assets: Vec::new(),
        }
    }
}

pub(crate) struct PluginInner {
    info: PluginInfo,
    family: Arc<dyn ChainFamily>,
    shared: Arc<Shared>,
    state: RwLock<PluginState>,
    session: Mutex<Option<Session>>,
    /// Bumped by every disconnect; in-flight work started under an older
    /// epoch discards its result.
    epoch: AtomicU64,
}

/// A wallet plugin.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct WalletPlugin {
    pub(crate) inner: Arc<PluginInner>,
}

impl std::fmt::Debug for WalletPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletPlugin")
            .field("name", &self.inner.info.name)
            .field("family", &self.inner.family.kind())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl WalletPlugin {
    /// Account and network are read back from storage when the persisted
    /// platform is this plugin.
    pub(crate) fn new(shared: Arc<Shared>, info: PluginInfo, family: Arc<dyn ChainFamily>) -> Self {
        let mut state = PluginState::default();
        if shared.storage.get(&shared.keys.platform).as_deref() == Some(info.name.as_str()) {
            state.account = shared.storage.get(&shared.keys.account).unwrap_or_default();
            state.network = shared.storage.get(&shared.keys.network).unwrap_or_default();
            debug!(wallet = %info.name, account = %state.account, network = %state.network, "hydrated");
        }
        Self {
            inner: Arc::new(PluginInner {
                info,
                family,
                shared,
                state: RwLock::new(state),
                session: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Plugin identity.
    #[must_use]
    pub fn info(&self) -> &PluginInfo {
        &self.inner.info
    }

    /// Unique plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.info.name
    }

    /// Key the provider is injected under.
    #[must_use]
    pub fn injected_key(&self) -> &str {
        &self.inner.info.injected_key
    }

    /// Extension install URL.
    #[must_use]
    pub fn install_url(&self) -> &str {
        &self.inner.info.install_url
    }

    /// Documentation URL, empty when unknown.
    #[must_use]
    pub fn docs_url(&self) -> &str {
        self.inner.info.docs_url.as_deref().unwrap_or_default()
    }

    /// Chain family.
    #[must_use]
    pub fn family(&self) -> FamilyKind {
        self.inner.family.kind()
    }

    /// Whether both handles refer to the same plugin instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PluginState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, PluginState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.read().status
    }

    /// Whether the plugin is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status() == Status::Connected
    }

    /// Active account, empty when none.
    #[must_use]
    pub fn account(&self) -> String {
        self.read().account.clone()
    }

    /// Canonical network id, empty when unknown.
    #[must_use]
    pub fn network(&self) -> String {
        self.read().network.clone()
    }

    /// Last fetched balance.
    #[must_use]
    pub fn balance(&self) -> String {
        self.read().balance.clone()
    }

    /// Known assets.
    #[must_use]
    pub fn assets(&self) -> Vec<AssetInfo> {
        self.read().assets.clone()
    }

    /// Name of the last connected plugin, as persisted.
    #[must_use]
    pub fn platform(&self) -> String {
        let shared = &self.inner.shared;
        shared
            .storage
            .get(&shared.keys.platform)
            .unwrap_or_default()
    }

    /// Whether this plugin is the persisted last-used one.
    #[must_use]
    pub fn is_current_platform(&self) -> bool {
        self.platform() == self.name()
    }

    /// Replace the asset list.
    pub fn set_assets(&self, assets: Vec<AssetInfo>) {
        self.write().assets = assets;
        self.incr_version(1);
    }

    /// Bump the shared version counter.
    pub fn incr_version(&self, delta: u64) -> u64 {
        let version = self.inner.shared.version.incr_by(delta);
        debug!(wallet = %self.name(), version, "version");
        version
    }

    /// Subscribe to this plugin's domain events.
    pub fn on<F>(&self, name: EventName, listener: F) -> ListenerId
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        let wallet = self.name().to_string();
        self.inner.shared.bus.on(name, move |event| {
            if event.wallet == wallet {
                listener(&event.event);
            }
        })
    }

    /// Remove a listener added with [`on`](Self::on).
    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.shared.bus.off(id)
    }

    /// Whether the provider is injected. When it is not and `can_install`
    /// is set, offer to open the install page.
    pub fn installed(&self, can_install: bool) -> bool {
        let host = &self.inner.shared.host;
        if host.is_injected(self.injected_key()) {
            return true;
        }

        if can_install && host.confirm(&format!("Do you want to install `{}` now?", self.name())) {
            host.open_url(self.install_url());
        }
        false
    }

    /// Request account access and become connected.
    ///
    /// Safe to call while connected: the wallet is asked again and the
    /// session is kept.
    ///
    /// # Errors
    ///
    /// Returns the strategy's error unchanged and leaves the status as it
    /// was before the call, or [`WalletError::Superseded`] when a disconnect
    /// happened while the request was in flight.
    pub async fn connect(&self) -> Result<String> {
        let epoch = self.epoch();
        let previous = self.status();
        let was_connected = previous == Status::Connected;
        if !was_connected {
            self.set_status(Status::Connecting);
        }
        info!(wallet = %self.name(), "connecting");

        let result = {
            let account = self.account();
            let cx = self.provider_context(&account);
            self.inner.family.connect(&cx).await
        };

        let account = match result {
            Ok(account) => account,
            Err(e) => {
                warn!(wallet = %self.name(), error = %e, "connect failed");
                if !was_connected && self.epoch() == epoch {
                    self.set_status(previous);
                }
                return Err(e);
            }
        };

        if self.epoch() != epoch {
            warn!(wallet = %self.name(), "connect superseded by disconnect");
            return Err(WalletError::Superseded(self.name().to_string()));
        }

        self.set_account(&account)?;
        self.set_status(Status::Connected);
        info!(wallet = %self.name(), account = %account, "connected");
        if !was_connected {
            self.emit(DomainEvent::Connected(account.clone()));
        }

        self.sync_network(epoch).await;
        self.sync_balance(epoch).await;
        Ok(account)
    }

    /// Adopt the account the wallet already authorized, without prompting.
    ///
    /// On success the account, network and platform are persisted. The
    /// status is left alone; only [`connect`](Self::connect) opens a
    /// session.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the query fails.
    pub async fn restore(&self) -> Result<Option<String>> {
        let epoch = self.epoch();
        let restored = {
            let account = self.account();
            let cx = self.provider_context(&account);
            self.inner.family.restore(&cx).await?
        };
        let Some(account) = restored.filter(|a| !a.is_empty()) else {
            debug!(wallet = %self.name(), "nothing to restore");
            return Ok(None);
        };
        if self.epoch() != epoch {
            return Ok(None);
        }

        self.set_account(&account)?;
        let shared = &self.inner.shared;
        shared.storage.set(&shared.keys.platform, self.name())?;
        info!(wallet = %self.name(), account = %account, "restored");
        self.sync_network(epoch).await;
        Ok(Some(account))
    }

    /// Clear persisted state, drop native listeners and announce the
    /// disconnect.
    pub fn disconnect(&self) {
        info!(wallet = %self.name(), "disconnecting");
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);

        let last_account = {
            let mut state = self.write();
            state.network.clear();
            std::mem::take(&mut state.account)
        };

        let shared = &self.inner.shared;
        for key in [&shared.keys.account, &shared.keys.network, &shared.keys.platform] {
            if let Err(e) = shared.storage.remove(key) {
                warn!(wallet = %self.name(), key = %key, error = %e, "failed to clear persisted value");
            }
        }

        self.set_status(Status::Disconnected);

        if !last_account.is_empty() {
            self.emit(DomainEvent::Disconnected(last_account));
        }
    }

    /// Balance of an address or token.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the query fails.
    pub async fn balance_of(&self, query: BalanceQuery<'_>) -> Result<String> {
        let account = self.account();
        let cx = self.provider_context(&account);
        self.inner.family.balance_of(&cx, query).await
    }

    /// Latest block height; `0` where the family cannot tell.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the query fails.
    pub async fn block_number(&self) -> Result<u64> {
        let account = self.account();
        let cx = self.provider_context(&account);
        self.inner.family.block_number(&cx).await
    }

    /// Current gas price or fee rate; `0` where the family cannot tell.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the query fails.
    pub async fn gas_price(&self) -> Result<u128> {
        let account = self.account();
        let cx = self.provider_context(&account);
        self.inner.family.gas_price(&cx).await
    }

    /// Submit a transfer from the active account and announce it.
    ///
    /// # Errors
    ///
    /// Fails when not connected or when the provider rejects the transfer.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<String> {
        let account = self.require_account()?;
        let hash = {
            let cx = self.provider_context(&account);
            self.inner.family.transfer(&cx, request).await?
        };
        info!(wallet = %self.name(), hash = %hash, to = %request.to, "transfer submitted");
        self.emit(DomainEvent::Transaction(TransactionEvent {
            wallet: self.name().to_string(),
            hash: hash.clone(),
            from: account,
            to: request.to.clone(),
            token: request.token.clone(),
        }));
        Ok(hash)
    }

    /// Sign a message with the active account.
    ///
    /// # Errors
    ///
    /// Fails when not connected, unsupported, or rejected by the provider.
    pub async fn sign(&self, message: &str) -> Result<String> {
        let account = self.require_account()?;
        let cx = self.provider_context(&account);
        self.inner.family.sign(&cx, message).await
    }

    /// Sign EIP-712 typed data (`eth_signTypedData_v4`).
    ///
    /// # Errors
    ///
    /// Fails when not connected, unsupported, or rejected by the provider.
    pub async fn sign_typed_data(&self, typed_data: &Value) -> Result<String> {
        let account = self.require_account()?;
        let cx = self.provider_context(&account);
        self.inner.family.sign_typed_data(&cx, typed_data).await
    }

    /// [`sign`](Self::sign), split into `r`, `s` and `v`.
    ///
    /// # Errors
    ///
    /// Fails like [`sign`](Self::sign), or when the wallet's signature is
    /// not 65 hex bytes.
    pub async fn sign_parts(&self, message: &str) -> Result<SignatureParts> {
        SignatureParts::parse(&self.sign(message).await?)
    }

    /// [`sign_typed_data`](Self::sign_typed_data), split into `r`, `s` and
    /// `v`.
    ///
    /// # Errors
    ///
    /// Fails like [`sign_typed_data`](Self::sign_typed_data), or when the
    /// wallet's signature is not 65 hex bytes.
    pub async fn sign_typed_data_parts(&self, typed_data: &Value) -> Result<SignatureParts> {
        SignatureParts::parse(&self.sign_typed_data(typed_data).await?)
    }

    /// Ask the wallet to switch networks.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::UnknownChain`] when the wallet does not know
    /// the chain and no add parameters were given, or the provider error.
    pub async fn switch_chain(&self, chain: &str, add_chain: Option<&AddChainParameter>) -> Result<()> {
        let account = self.account();
        let cx = self.provider_context(&account);
        self.inner.family.switch_chain(&cx, chain, add_chain).await
    }

    /// Raw provider request.
    ///
    /// # Errors
    ///
    /// Returns the provider error, or unsupported for families without a
    /// generic request API.
    pub async fn request(&self, args: impl Into<RequestArguments> + Send) -> Result<Value> {
        let args = args.into();
        let account = self.account();
        let cx = self.provider_context(&account);
        self.inner.family.request(&cx, args).await
    }

    /// `eth_call` against the latest block.
    ///
    /// # Errors
    ///
    /// Returns the provider error, or unsupported outside EVM.
    pub async fn call(&self, tx: Value) -> Result<Value> {
        self.request(RequestArguments::new("eth_call").with_params(json!([tx, "latest"])))
            .await
    }

    /// `eth_estimateGas` for a transaction.
    ///
    /// # Errors
    ///
    /// Returns the provider error, or unsupported outside EVM.
    pub async fn estimate_gas(&self, tx: Value) -> Result<u64> {
        let gas = self
            .request(RequestArguments::new("eth_estimateGas").with_params(json!([tx])))
            .await?;
        parse_u64_quantity(&gas)
    }

    /// `eth_sendTransaction`, filling `from` with the active account.
    ///
    /// # Errors
    ///
    /// Fails when not connected or when the provider rejects the transaction.
    pub async fn send_transaction(&self, mut tx: Value) -> Result<String> {
        let account = self.require_account()?;
        if let Some(fields) = tx.as_object_mut() {
            fields.entry("from").or_insert_with(|| Value::String(account));
        }
        let hash = self
            .request(RequestArguments::new("eth_sendTransaction").with_params(json!([tx])))
            .await?;
        hash.as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::invalid_response(format!("expected transaction hash, got {hash}")))
    }

    /// Fetch the balance in the family's display unit and cache it.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the query fails.
    pub async fn refresh_balance(&self) -> Result<String> {
        let epoch = self.epoch();
        let mut query = BalanceQuery::native();
        if let Some(unit) = self.inner.family.display_unit() {
            query = query.unit(unit);
        }
        let balance = self.balance_of(query).await?;
        if self.epoch() == epoch {
            self.set_balance(&balance);
        }
        Ok(balance)
    }

    /// Native accounts-changed handler.
    ///
    /// # Errors
    ///
    /// Fails when the new account cannot be persisted.
    pub async fn on_accounts_changed(&self, accounts: Vec<String>) -> Result<()> {
        debug!(wallet = %self.name(), ?accounts, "accounts changed");
        let Some(first) = accounts.first() else {
            self.disconnect();
            return Ok(());
        };

        let epoch = self.epoch();
        self.set_account(first)?;
        if !self.is_connected() {
            self.set_status(Status::Connected);
        }
        self.emit(DomainEvent::AccountsChanged(accounts));
        self.sync_balance(epoch).await;
        Ok(())
    }

    /// Native chain-changed handler.
    ///
    /// # Errors
    ///
    /// Fails when the chain id is not a string or number, or cannot be
    /// persisted.
    pub async fn on_chain_changed(&self, chain: &Value) -> Result<()> {
        let id = canonical_network(chain)
            .ok_or_else(|| WalletError::invalid_response(format!("bad chain id {chain}")))?;
        debug!(wallet = %self.name(), chain = %id, "chain changed");

        let epoch = self.epoch();
        self.set_network(&id)?;
        self.emit(DomainEvent::ChainChanged(id));
        self.sync_balance(epoch).await;
        Ok(())
    }

    /// Dispatch a translated native event.
    ///
    /// # Errors
    ///
    /// Propagates handler failures.
    pub async fn handle_native_event(&self, event: NativeEvent) -> Result<()> {
        match event {
            NativeEvent::AccountsChanged(accounts) => self.on_accounts_changed(accounts).await,
            NativeEvent::ChainChanged(chain) => self.on_chain_changed(&chain).await,
            NativeEvent::Disconnect { address: None } => {
                self.disconnect();
                Ok(())
            }
            NativeEvent::Disconnect {
                address: Some(address),
            } => {
                let current = self.account();
                if address.eq_ignore_ascii_case(&current) {
                    self.disconnect();
                } else {
                    debug!(wallet = %self.name(), %address, %current, "disconnect for another account ignored");
                }
                Ok(())
            }
            NativeEvent::Connect => {
                self.mark_connected();
                Ok(())
            }
            NativeEvent::Authorization {
                authorized,
                network,
            } => {
                match authorized {
                    Some(false) if self.is_connected() => self.disconnect(),
                    Some(true) => self.mark_connected(),
                    _ => {}
                }
                if let Some(network) = network {
                    self.set_network(&network)?;
                }
                Ok(())
            }
        }
    }

    /// Write account, network and platform back to storage. Used after
    /// another plugin sharing the same keys disconnected.
    pub(crate) fn persist(&self) {
        let (account, network) = {
            let state = self.read();
            (state.account.clone(), state.network.clone())
        };
        let shared = &self.inner.shared;
        let mut values = vec![(&shared.keys.platform, self.name())];
        if !account.is_empty() {
            values.push((&shared.keys.account, account.as_str()));
        }
        if !network.is_empty() {
            values.push((&shared.keys.network, network.as_str()));
        }
        for (key, value) in values {
            if let Err(e) = shared.storage.set(key, value) {
                warn!(wallet = %self.name(), key = %key, error = %e, "failed to persist value");
            }
        }
    }

    pub(crate) fn provider_context<'a>(&'a self, account: &'a str) -> ProviderContext<'a> {
        ProviderContext {
            info: &self.inner.info,
            host: &self.inner.shared.host,
            account,
        }
    }

    fn require_account(&self) -> Result<String> {
        let account = self.account();
        if account.is_empty() {
            return Err(WalletError::NotConnected(self.name().to_string()));
        }
        Ok(account)
    }

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn emit(&self, event: DomainEvent) {
        self.inner
            .shared
            .bus
            .emit_all(&WalletEvent::new(self.name(), event));
    }

    fn mark_connected(&self) {
        if !self.is_connected() && !self.account().is_empty() {
            self.set_status(Status::Connected);
        }
    }

    fn set_account(&self, account: &str) -> Result<()> {
        let changed = {
            let mut state = self.write();
            let changed = state.account != account;
            state.account = account.to_string();
            changed
        };
        let shared = &self.inner.shared;
        shared.storage.set(&shared.keys.account, account)?;
        if changed {
            self.incr_version(1);
        }
        Ok(())
    }

    fn set_network(&self, network: &str) -> Result<()> {
        self.write().network = network.to_string();
        let shared = &self.inner.shared;
        shared.storage.set(&shared.keys.network, network)?;
        self.incr_version(1);
        Ok(())
    }

    fn set_balance(&self, balance: &str) {
        self.write().balance = balance.to_string();
        self.incr_version(1);
    }

    /// Single place where the status changes; opens and closes the session
    /// on the way in and out of `Connected`.
    fn set_status(&self, status: Status) {
        let previous = std::mem::replace(&mut self.write().status, status);

        if status == Status::Connected {
            let shared = &self.inner.shared;
            if let Err(e) = shared.storage.set(&shared.keys.platform, self.name()) {
                warn!(wallet = %self.name(), error = %e, "failed to persist platform");
            }
            if previous != Status::Connected {
                self.open_session();
            }
        } else if previous == Status::Connected {
            self.close_session();
        }

        debug!(wallet = %self.name(), ?previous, ?status, "status");
        self.incr_version(1);
    }

    fn open_session(&self) {
        let session = match Session::open(self) {
            Ok(session) => session,
            Err(e) => {
                warn!(wallet = %self.name(), error = %e, "native events unavailable");
                return;
            }
        };
        let stale = self
            .inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(session);
        if let Some(stale) = stale {
            stale.close();
        }
    }

    fn close_session(&self) {
        let session = self
            .inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = session {
            session.close();
        }
    }

    /// Id of the open session, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<u64> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Session::id)
    }

    async fn sync_network(&self, epoch: u64) {
        let account = self.account();
        let result = {
            let cx = self.provider_context(&account);
            self.inner.family.current_network(&cx).await
        };
        match result {
            Ok(Some(network)) if self.epoch() == epoch => {
                if let Err(e) = self.set_network(&network) {
                    warn!(wallet = %self.name(), error = %e, "failed to store network");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(wallet = %self.name(), error = %e, "network query failed"),
        }
    }

    async fn sync_balance(&self, epoch: u64) {
        if self.epoch() != epoch {
            return;
        }
        if let Err(e) = self.refresh_balance().await {
            warn!(wallet = %self.name(), error = %e, "balance refresh failed");
        }
    }
}

#[cfg(test)]
mod tests;
