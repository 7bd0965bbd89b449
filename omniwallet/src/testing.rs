//! In-memory host and providers for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use crate::error::ProviderError;
use crate::host::{Host, Injected};
use crate::provider::{
    Eip1193Provider, EventEmitter, ListenerSet, NativeListener, NativeListenerId, ProviderResult,
    RequestArguments, TronLinkProvider, UnisatProvider, UtxoBalance,
};

pub const ORIGIN: &str = "app.example.com";
pub const ACCOUNT: &str = "0xabc";

/// Install a test subscriber once; `RUST_LOG` controls the output.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

pub struct MockHost {
    injected: Mutex<HashMap<String, Injected>>,
    messages: ListenerSet,
    alerts: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
    confirm: AtomicBool,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            injected: Mutex::new(HashMap::new()),
            messages: ListenerSet::new(),
            alerts: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            confirm: AtomicBool::new(true),
        })
    }

    pub fn inject(&self, key: &str, injected: Injected) {
        lock(&self.injected).insert(key.to_string(), injected);
    }

    pub fn inject_evm(&self, key: &str, provider: Arc<dyn Eip1193Provider>) {
        self.inject(key, Injected::Eip1193(provider));
    }

    pub fn inject_unisat(&self, key: &str, provider: Arc<dyn UnisatProvider>) {
        self.inject(key, Injected::Unisat(provider));
    }

    pub fn inject_tronlink(&self, key: &str, provider: Arc<dyn TronLinkProvider>) {
        self.inject(key, Injected::TronLink(provider));
    }

    pub fn set_confirm(&self, answer: bool) {
        self.confirm.store(answer, Ordering::SeqCst);
    }

    /// Deliver `data` to every `message` listener, like `window.postMessage`.
    pub fn post_message(&self, data: Value) {
        self.messages.emit("message", &data);
    }

    pub fn message_listeners(&self) -> usize {
        self.messages.count("message")
    }

    pub fn alerts(&self) -> Vec<String> {
        lock(&self.alerts).clone()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }
}

impl Host for MockHost {
    fn origin(&self) -> String {
        ORIGIN.to_string()
    }

    fn injected(&self, key: &str) -> Option<Injected> {
        lock(&self.injected).get(key).cloned()
    }

    fn confirm(&self, _message: &str) -> bool {
        self.confirm.load(Ordering::SeqCst)
    }

    fn alert(&self, message: &str) {
        lock(&self.alerts).push(message.to_string());
    }

    fn open_url(&self, url: &str) {
        lock(&self.opened).push(url.to_string());
    }

    fn add_message_listener(&self, listener: NativeListener) -> NativeListenerId {
        self.messages.add("message", listener)
    }

    fn remove_message_listener(&self, id: NativeListenerId) {
        self.messages.remove("message", id);
    }
}

/// Scripted EIP-1193 provider.
pub struct MockEip1193 {
    events: ListenerSet,
    responses: Mutex<HashMap<String, ProviderResult<Value>>>,
    calls: Mutex<Vec<RequestArguments>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    sub_providers: Mutex<HashMap<String, Arc<dyn Eip1193Provider>>>,
}

impl MockEip1193 {
    pub fn new() -> Arc<Self> {
        let responses = HashMap::from([
            ("eth_requestAccounts".to_string(), Ok(json!([ACCOUNT]))),
            ("eth_chainId".to_string(), Ok(json!("0x1"))),
            ("eth_getBalance".to_string(), Ok(json!("0x2386f26fc10000"))),
            ("eth_blockNumber".to_string(), Ok(json!("0x10"))),
            ("eth_gasPrice".to_string(), Ok(json!("0x3b9aca00"))),
        ]);
        Arc::new(Self {
            events: ListenerSet::new(),
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
            sub_providers: Mutex::new(HashMap::new()),
        })
    }

    pub fn respond(&self, method: &str, value: Value) {
        lock(&self.responses).insert(method.to_string(), Ok(value));
    }

    pub fn fail(&self, method: &str, error: ProviderError) {
        lock(&self.responses).insert(method.to_string(), Err(error));
    }

    /// Block `method` until permits are added to the returned semaphore.
    pub fn gate(&self, method: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        lock(&self.gates).insert(method.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn add_sub_provider(&self, name: &str, provider: Arc<dyn Eip1193Provider>) {
        lock(&self.sub_providers).insert(name.to_string(), provider);
    }

    pub fn emit(&self, event: &str, payload: Value) {
        self.events.emit(event, &payload);
    }

    pub fn listeners(&self, event: &str) -> usize {
        self.events.count(event)
    }

    pub fn calls(&self) -> Vec<RequestArguments> {
        lock(&self.calls).clone()
    }

    pub fn called(&self, method: &str) -> bool {
        lock(&self.calls).iter().any(|c| c.method == method)
    }

    pub fn last_call(&self, method: &str) -> Option<RequestArguments> {
        lock(&self.calls)
            .iter()
            .rev()
            .find(|c| c.method == method)
            .cloned()
    }
}

impl EventEmitter for MockEip1193 {
    fn on(&self, event: &str, listener: NativeListener) -> NativeListenerId {
        self.events.add(event, listener)
    }

    fn remove_listener(&self, event: &str, id: NativeListenerId) {
        self.events.remove(event, id);
    }
}

#[async_trait]
impl Eip1193Provider for MockEip1193 {
    async fn request(&self, args: RequestArguments) -> ProviderResult<Value> {
        lock(&self.calls).push(args.clone());
        let gate = lock(&self.gates).get(&args.method).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        lock(&self.responses)
            .get(&args.method)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::new(-32601, format!("{} not mocked", args.method))))
    }

    fn sub_provider(&self, name: &str) -> Option<Arc<dyn Eip1193Provider>> {
        lock(&self.sub_providers).get(name).cloned()
    }
}

/// Scripted UniSat provider.
pub struct MockUnisat {
    events: ListenerSet,
    accounts: Mutex<Vec<String>>,
    network: Mutex<String>,
    balance: Mutex<UtxoBalance>,
    sent: Mutex<Vec<(String, u64)>>,
}

impl MockUnisat {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: ListenerSet::new(),
            accounts: Mutex::new(vec!["bc1qtest".to_string()]),
            network: Mutex::new("livenet".to_string()),
            balance: Mutex::new(UtxoBalance {
                confirmed: 123_456_789,
                unconfirmed: 0,
                total: 123_456_789,
            }),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn emit(&self, event: &str, payload: Value) {
        self.events.emit(event, &payload);
    }

    pub fn listeners(&self, event: &str) -> usize {
        self.events.count(event)
    }

    pub fn sent(&self) -> Vec<(String, u64)> {
        lock(&self.sent).clone()
    }

    pub fn set_network(&self, network: &str) {
        *lock(&self.network) = network.to_string();
    }
}

impl EventEmitter for MockUnisat {
    fn on(&self, event: &str, listener: NativeListener) -> NativeListenerId {
        self.events.add(event, listener)
    }

    fn remove_listener(&self, event: &str, id: NativeListenerId) {
        self.events.remove(event, id);
    }
}

#[async_trait]
impl UnisatProvider for MockUnisat {
    async fn request_accounts(&self) -> ProviderResult<Vec<String>> {
        Ok(lock(&self.accounts).clone())
    }

    async fn get_network(&self) -> ProviderResult<String> {
        Ok(lock(&self.network).clone())
    }

    async fn get_balance(&self) -> ProviderResult<UtxoBalance> {
        Ok(*lock(&self.balance))
    }

    async fn send_bitcoin(
        &self,
        to: &str,
        satoshis: u64,
        _fee_rate: Option<u64>,
    ) -> ProviderResult<String> {
        lock(&self.sent).push((to.to_string(), satoshis));
        Ok("txid-btc".to_string())
    }

    async fn sign_message(&self, message: &str) -> ProviderResult<String> {
        Ok(format!("sig:{message}"))
    }

    async fn switch_network(&self, network: &str) -> ProviderResult<()> {
        self.set_network(network);
        Ok(())
    }
}

/// Scripted TronLink provider.
pub struct MockTronLink {
    ready: AtomicBool,
    reply: Mutex<Value>,
    address: Mutex<Option<String>>,
    balance: Mutex<u64>,
}

impl MockTronLink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(true),
            reply: Mutex::new(json!({"code": 200, "message": "ok"})),
            address: Mutex::new(Some(ACCOUNT.to_string())),
            balance: Mutex::new(1_500_000),
        })
    }

    pub fn set_reply(&self, reply: Value) {
        *lock(&self.reply) = reply;
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

#[async_trait]
impl TronLinkProvider for MockTronLink {
    fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn request(&self, args: RequestArguments) -> ProviderResult<Value> {
        match args.method.as_str() {
            "tron_requestAccounts" => Ok(lock(&self.reply).clone()),
            other => Err(ProviderError::new(-32601, format!("{other} not mocked"))),
        }
    }

    fn default_address(&self) -> Option<String> {
        lock(&self.address).clone()
    }

    async fn get_balance(&self, _address: &str) -> ProviderResult<u64> {
        Ok(*lock(&self.balance))
    }

    async fn get_current_block(&self) -> ProviderResult<Value> {
        Ok(json!({"block_header": {"raw_data": {"number": 61_000_000}}}))
    }

    fn fee_limit(&self) -> u64 {
        150_000_000
    }

    async fn send_trx(&self, _to: &str, _amount: u64) -> ProviderResult<Value> {
        Ok(json!({"result": true, "txid": "txid-trx"}))
    }

    async fn sign_message(&self, message: &str) -> ProviderResult<String> {
        Ok(format!("sig:{message}"))
    }
}
