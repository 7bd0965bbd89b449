use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::brands::Brand;
use crate::chains::{EvmFamily, TronFamily, UtxoFamily};
use crate::config::ExplorerConfig;
use crate::context::WalletContext;
use crate::error::{ProviderError, UNKNOWN_CHAIN_CODE, USER_REJECTED_CODE};
use crate::testing::{
    ACCOUNT, MockEip1193, MockHost, MockTronLink, MockUnisat, init_tracing, wait_until,
};

struct Evm {
    host: Arc<MockHost>,
    provider: Arc<MockEip1193>,
    cx: WalletContext,
    plugin: WalletPlugin,
}

fn evm(brand: Brand) -> Evm {
    init_tracing();
    let host = MockHost::new();
    let provider = MockEip1193::new();
    let info = brand.info();
    host.inject_evm(&info.injected_key, provider.clone());
    let cx = WalletContext::builder(host.clone()).build();
    let plugin = cx.add_plugin(info, assert_ok!(brand.family(&ExplorerConfig::default())));
    Evm {
        host,
        provider,
        cx,
        plugin,
    }
}

fn record(plugin: &WalletPlugin, name: EventName) -> Arc<Mutex<Vec<DomainEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    plugin.on(name, move |event| sink.lock().unwrap().push(event.clone()));
    seen
}

#[derive(Debug, PartialEq)]
struct Shape {
    status: Status,
    account: String,
    network: String,
    balance: String,
    platform: String,
    listeners: (usize, usize),
}

fn shape(evm: &Evm) -> Shape {
    Shape {
        status: evm.plugin.status(),
        account: evm.plugin.account(),
        network: evm.plugin.network(),
        balance: evm.plugin.balance(),
        platform: evm.plugin.platform(),
        listeners: (
            evm.provider.listeners("accountsChanged"),
            evm.provider.listeners("chainChanged"),
        ),
    }
}

#[tokio::test]
async fn test_connect_success() {
    let evm = evm(Brand::MetaMask);
    let connected = record(&evm.plugin, EventName::Connected);
    let before = evm.cx.version();

    let account = evm.plugin.connect().await.unwrap();

    assert_eq!(account, ACCOUNT);
    assert_eq!(evm.plugin.status(), Status::Connected);
    assert!(evm.plugin.is_connected());
    assert_eq!(
        shape(&evm),
        Shape {
            status: Status::Connected,
            account: ACCOUNT.into(),
            network: "0x1".into(),
            balance: "0.01".into(),
            platform: "MetaMask".into(),
            listeners: (1, 1),
        }
    );
    assert!(evm.plugin.is_current_platform());
    assert_eq!(*connected.lock().unwrap(), vec![DomainEvent::Connected(ACCOUNT.into())]);
    assert!(evm.cx.version() > before);

    let keys = evm.cx.storage_keys();
    assert_eq!(evm.cx.storage().get(&keys.account).as_deref(), Some(ACCOUNT));
    assert_eq!(evm.cx.storage().get(&keys.network).as_deref(), Some("0x1"));
}

#[tokio::test]
async fn test_reconnect_matches_fresh_connect() {
    let evm = evm(Brand::MetaMask);
    evm.plugin.connect().await.unwrap();
    let fresh = shape(&evm);
    let session = evm.plugin.session_id();

    evm.plugin.disconnect();
    evm.plugin.connect().await.unwrap();

    assert_eq!(shape(&evm), fresh);
    assert_ne!(evm.plugin.session_id(), session);
}

#[tokio::test]
async fn test_connect_twice_keeps_session() {
    let evm = evm(Brand::MetaMask);
    let connected = record(&evm.plugin, EventName::Connected);
    evm.plugin.connect().await.unwrap();
    let session = evm.plugin.session_id();

    evm.plugin.connect().await.unwrap();

    assert_eq!(evm.plugin.session_id(), session);
    assert_eq!(evm.provider.listeners("accountsChanged"), 1);
    assert_eq!(connected.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_disconnect_clears_persisted_state() {
    let evm = evm(Brand::MetaMask);
    let disconnected = record(&evm.plugin, EventName::Disconnected);
    evm.plugin.connect().await.unwrap();

    evm.plugin.disconnect();

    assert_eq!(evm.plugin.status(), Status::Disconnected);
    assert!(evm.plugin.account().is_empty());
    assert!(evm.plugin.network().is_empty());
    assert!(evm.plugin.platform().is_empty());
    assert_eq!(evm.plugin.balance(), "0.01");
    assert_eq!(evm.plugin.session_id(), None);
    assert_eq!(evm.provider.listeners("accountsChanged"), 0);
    assert_eq!(evm.provider.listeners("chainChanged"), 0);
    assert_eq!(*disconnected.lock().unwrap(), vec![DomainEvent::Disconnected(ACCOUNT.into())]);

    // Nothing left to announce.
    evm.plugin.disconnect();
    assert_eq!(disconnected.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_new_plugin_hydrates_persisted_state() {
    let evm = evm(Brand::MetaMask);
    evm.plugin.connect().await.unwrap();

    // A later process over the same storage.
    let cx = WalletContext::builder(evm.host.clone())
        .storage(Arc::clone(evm.cx.storage()))
        .build();
    let family = || assert_ok!(Brand::MetaMask.family(&ExplorerConfig::default()));
    let metamask = cx.add_plugin(Brand::MetaMask.info(), family());
    let okx = cx.add_plugin(Brand::OkxWallet.info(), family());

    assert_eq!(metamask.account(), ACCOUNT);
    assert_eq!(metamask.network(), "0x1");
    assert_eq!(metamask.status(), Status::Initial);
    assert_eq!(metamask.session_id(), None);
    assert!(okx.account().is_empty());
    assert!(okx.network().is_empty());

    evm.plugin.disconnect();
    let after = cx.new_plugin(Brand::MetaMask.info(), family());
    assert!(after.account().is_empty());
}

#[tokio::test]
async fn test_restore_authorized_account() {
    let evm = evm(Brand::MetaMask);
    evm.provider.respond("eth_accounts", json!([ACCOUNT]));

    assert_eq!(assert_ok!(evm.plugin.restore().await).as_deref(), Some(ACCOUNT));

    assert_eq!(evm.plugin.account(), ACCOUNT);
    assert_eq!(evm.plugin.network(), "0x1");
    assert_eq!(evm.plugin.platform(), "MetaMask");
    assert_eq!(evm.plugin.status(), Status::Initial);
    assert_eq!(evm.plugin.session_id(), None);
    assert!(!evm.provider.called("eth_requestAccounts"));
}

#[tokio::test]
async fn test_restore_without_authorization() {
    let evm = evm(Brand::MetaMask);
    evm.provider.respond("eth_accounts", json!([]));
    assert_eq!(assert_ok!(evm.plugin.restore().await), None);
    assert!(evm.plugin.account().is_empty());
    assert!(evm.plugin.platform().is_empty());

    evm.provider
        .fail("eth_accounts", ProviderError::new(-32603, "internal"));
    assert_err!(evm.plugin.restore().await);

    let (_host, _tronlink, tron) = tron();
    assert_eq!(assert_ok!(tron.restore().await), None);
}

#[tokio::test]
async fn test_connect_user_rejected() {
    let evm = evm(Brand::MetaMask);
    evm.provider
        .fail("eth_requestAccounts", ProviderError::user_rejected());

    let err = evm.plugin.connect().await.unwrap_err();

    assert!(matches!(err, WalletError::UserRejected { ref wallet } if wallet == "MetaMask"));
    assert_eq!(err.code(), Some(USER_REJECTED_CODE));
    assert_eq!(evm.plugin.status(), Status::Initial);
    assert!(!evm.plugin.is_connected());
    assert_eq!(evm.host.alerts(), vec!["Please connect to MetaMask."]);
}

#[tokio::test]
async fn test_failed_reconnect_keeps_disconnected() {
    let evm = evm(Brand::MetaMask);
    evm.plugin.connect().await.unwrap();
    evm.plugin.disconnect();
    let before = evm.cx.version();
    evm.provider
        .fail("eth_requestAccounts", ProviderError::user_rejected());

    assert_err!(evm.plugin.connect().await);

    assert_eq!(evm.plugin.status(), Status::Disconnected);
    assert!(evm.plugin.account().is_empty());
    assert_eq!(evm.plugin.session_id(), None);
    assert!(evm.cx.version() > before);
}

#[tokio::test]
async fn test_connect_failure_while_connected_keeps_status() {
    let evm = evm(Brand::MetaMask);
    evm.plugin.connect().await.unwrap();
    evm.provider
        .fail("eth_requestAccounts", ProviderError::new(-32002, "Request already pending"));

    let err = evm.plugin.connect().await.unwrap_err();

    assert!(matches!(err, WalletError::Provider(ref e) if e.code == -32002));
    assert_eq!(evm.plugin.status(), Status::Connected);
    assert_eq!(evm.host.alerts(), vec!["Request already pending"]);
}

#[tokio::test]
async fn test_connect_not_installed() {
    init_tracing();
    let host = MockHost::new();
    let cx = WalletContext::builder(host).build();
    let plugin = cx.add_plugin(Brand::OkxWallet.info(), Arc::new(EvmFamily::new()));

    let err = plugin.connect().await.unwrap_err();

    assert!(matches!(err, WalletError::NotInstalled(ref name) if name == "OkxWallet"));
    assert_eq!(plugin.status(), Status::Initial);
}

#[tokio::test]
async fn test_disconnect_supersedes_pending_connect() {
    let evm = evm(Brand::MetaMask);
    let gate = evm.provider.gate("eth_requestAccounts");

    let task = tokio::spawn({
        let plugin = evm.plugin.clone();
        async move { plugin.connect().await }
    });
    wait_until(|| evm.provider.called("eth_requestAccounts")).await;
    assert_eq!(evm.plugin.status(), Status::Connecting);

    evm.plugin.disconnect();
    gate.add_permits(1);
    let err = task.await.unwrap().unwrap_err();

    assert!(matches!(err, WalletError::Superseded(_)));
    assert_eq!(evm.plugin.status(), Status::Disconnected);
    assert!(evm.plugin.account().is_empty());
    assert_eq!(evm.provider.listeners("accountsChanged"), 0);
}

#[tokio::test]
async fn test_native_empty_accounts_disconnects() {
    let evm = evm(Brand::MetaMask);
    evm.plugin.connect().await.unwrap();

    evm.provider.emit("accountsChanged", json!([]));
    wait_until(|| evm.plugin.status() == Status::Disconnected).await;

    assert!(evm.plugin.account().is_empty());
    assert_eq!(evm.provider.listeners("accountsChanged"), 0);
}

#[tokio::test]
async fn test_native_account_switch() {
    let evm = evm(Brand::MetaMask);
    let changed = record(&evm.plugin, EventName::AccountsChanged);
    evm.plugin.connect().await.unwrap();

    evm.provider.emit("accountsChanged", json!(["0xdef", "0xabc"]));
    wait_until(|| evm.plugin.account() == "0xdef").await;

    assert!(evm.plugin.is_connected());
    assert_eq!(
        *changed.lock().unwrap(),
        vec![DomainEvent::AccountsChanged(vec!["0xdef".into(), "0xabc".into()])]
    );
}

#[tokio::test]
async fn test_native_chain_changed_canonicalizes() {
    let evm = evm(Brand::MetaMask);
    let changed = record(&evm.plugin, EventName::ChainChanged);
    evm.plugin.connect().await.unwrap();
    evm.provider.respond("eth_getBalance", json!("0xde0b6b3a7640000"));

    evm.provider.emit("chainChanged", json!(56));
    wait_until(|| evm.plugin.network() == "0x38").await;
    wait_until(|| evm.plugin.balance() == "1").await;

    evm.provider.emit("chainChanged", json!("0x89"));
    wait_until(|| evm.plugin.network() == "0x89").await;

    assert_eq!(
        *changed.lock().unwrap(),
        vec![
            DomainEvent::ChainChanged("0x38".into()),
            DomainEvent::ChainChanged("0x89".into())
        ]
    );
}

#[tokio::test]
async fn test_events_after_disconnect_are_ignored() {
    let evm = evm(Brand::MetaMask);
    evm.plugin.connect().await.unwrap();
    evm.plugin.disconnect();

    evm.provider.emit("chainChanged", json!("0x89"));
    tokio::task::yield_now().await;

    assert!(evm.plugin.network().is_empty());
}

#[tokio::test]
async fn test_version_strictly_increasing() {
    let evm = evm(Brand::MetaMask);
    let mut last = evm.cx.version();
    for i in 0..5 {
        evm.plugin.set_assets(vec![AssetInfo {
            symbol: format!("T{i}"),
            ..AssetInfo::default()
        }]);
        let now = evm.cx.version();
        assert!(now > last);
        last = now;
    }
    assert!(last >= 6);
    assert_eq!(evm.plugin.incr_version(3), last + 3);
    assert_eq!(evm.plugin.assets()[0].symbol, "T4");
}

#[tokio::test]
async fn test_evm_token_balance_calldata() {
    let evm = evm(Brand::MetaMask);
    evm.provider.respond("eth_call", json!("0x2386f26fc10000"));

    let balance = evm
        .plugin
        .balance_of(
            BalanceQuery::native()
                .address("0x1111111111111111111111111111111111111111")
                .token("0xtoken")
                .unit("ether"),
        )
        .await
        .unwrap();

    assert_eq!(balance, "0.01");
    let call = evm.provider.last_call("eth_call").unwrap();
    let params = call.params.unwrap();
    assert_eq!(params[0]["to"], "0xtoken");
    assert_eq!(
        params[0]["data"],
        "0x70a08231000000000000000000000000\
         1111111111111111111111111111111111111111"
    );
}

#[tokio::test]
async fn test_evm_queries() {
    let evm = evm(Brand::MetaMask);

    assert_eq!(evm.plugin.balance_of(BalanceQuery::native()).await.unwrap(), "10000000000000000");
    assert_eq!(evm.plugin.block_number().await.unwrap(), 16);
    assert_eq!(evm.plugin.gas_price().await.unwrap(), 1_000_000_000);

    evm.provider.respond("eth_estimateGas", json!("0x5208"));
    assert_eq!(evm.plugin.estimate_gas(json!({"to": "0x1"})).await.unwrap(), 21_000);
    assert_eq!(
        evm.provider.last_call("eth_estimateGas").unwrap().params,
        Some(json!([{"to": "0x1"}]))
    );
}

#[tokio::test]
async fn test_evm_switch_chain() {
    let evm = evm(Brand::MetaMask);
    evm.provider.fail(
        "wallet_switchEthereumChain",
        ProviderError::new(UNKNOWN_CHAIN_CODE, "Unrecognized chain ID"),
    );

    let err = evm.plugin.switch_chain("56", None).await.unwrap_err();
    assert!(matches!(err, WalletError::UnknownChain { ref chain } if chain == "0x38"));
    assert!(!evm.provider.called("wallet_addEthereumChain"));

    evm.provider.respond("wallet_addEthereumChain", Value::Null);
    let add = AddChainParameter {
        chain_id: "0x38".into(),
        chain_name: "BNB Smart Chain".into(),
        native_currency: NativeCurrency {
            name: "BNB".into(),
            symbol: "BNB".into(),
            decimals: 18,
        },
        rpc_urls: vec!["https://bsc-dataseed.binance.org".into()],
        block_explorer_urls: None,
        icon_urls: None,
    };
    assert_ok!(evm.plugin.switch_chain("56", Some(&add)).await);
    let call = evm.provider.last_call("wallet_addEthereumChain").unwrap();
    assert_eq!(call.params.unwrap()[0]["chainId"], "0x38");

    evm.provider.respond("wallet_switchEthereumChain", Value::Null);
    assert_ok!(evm.plugin.switch_chain("0x1", None).await);
    assert_eq!(
        evm.provider.last_call("wallet_switchEthereumChain").unwrap().params,
        Some(json!([{"chainId": "0x1"}]))
    );
}

#[tokio::test]
async fn test_evm_transfer_emits_transaction() {
    let evm = evm(Brand::MetaMask);
    let txs = record(&evm.plugin, EventName::OnTransaction);
    evm.provider.respond("eth_sendTransaction", json!("0xhash"));

    let request = TransferRequest::new("0.01", "0x2222222222222222222222222222222222222222").unit("ether");
    assert!(matches!(
        evm.plugin.transfer(&request).await,
        Err(WalletError::NotConnected(_))
    ));

    evm.plugin.connect().await.unwrap();
    let hash = evm.plugin.transfer(&request).await.unwrap();

    assert_eq!(hash, "0xhash");
    let call = evm.provider.last_call("eth_sendTransaction").unwrap();
    assert_eq!(
        call.params,
        Some(json!([{
            "from": ACCOUNT,
            "to": "0x2222222222222222222222222222222222222222",
            "value": "0x2386f26fc10000"
        }]))
    );
    let txs = txs.lock().unwrap();
    assert!(matches!(&txs[..], [DomainEvent::Transaction(tx)] if tx.hash == "0xhash" && tx.from == ACCOUNT));
}

#[tokio::test]
async fn test_evm_token_transfer() {
    let evm = evm(Brand::OkxWallet);
    evm.provider.respond("eth_sendTransaction", json!("0xhash"));
    evm.plugin.connect().await.unwrap();

    let request = TransferRequest::new("5", "0x2222222222222222222222222222222222222222").token("0xtoken");
    evm.plugin.transfer(&request).await.unwrap();

    let call = evm.provider.last_call("eth_sendTransaction").unwrap();
    let tx = &call.params.unwrap()[0];
    assert_eq!(tx["to"], "0xtoken");
    let data = tx["data"].as_str().unwrap();
    assert!(data.starts_with("0xa9059cbb"));
    assert!(data.ends_with("05"));

    let bad = TransferRequest::new("5", "not-an-address").token("0xtoken");
    assert!(matches!(
        evm.plugin.transfer(&bad).await,
        Err(WalletError::InvalidAddress(_))
    ));
}

#[tokio::test]
async fn test_evm_signing() {
    let evm = evm(Brand::MetaMask);
    evm.provider.respond("personal_sign", json!("0xsig"));
    evm.provider.respond("eth_signTypedData_v4", json!("0xtyped"));
    evm.plugin.connect().await.unwrap();

    assert_eq!(evm.plugin.sign("hi").await.unwrap(), "0xsig");
    assert_eq!(
        evm.provider.last_call("personal_sign").unwrap().params,
        Some(json!(["0x6869", ACCOUNT]))
    );

    let typed = json!({"primaryType": "Mail"});
    assert_eq!(evm.plugin.sign_typed_data(&typed).await.unwrap(), "0xtyped");
    assert_eq!(
        evm.provider.last_call("eth_signTypedData_v4").unwrap().params,
        Some(json!([ACCOUNT, typed]))
    );
}

#[tokio::test]
async fn test_evm_signature_parts() {
    let evm = evm(Brand::MetaMask);
    let r = "11".repeat(32);
    let s = "22".repeat(32);
    evm.provider.respond("personal_sign", json!(format!("0x{r}{s}01")));
    evm.provider.respond("eth_signTypedData_v4", json!(format!("0x{r}{s}1c")));
    evm.plugin.connect().await.unwrap();

    let parts = assert_ok!(evm.plugin.sign_parts("hi").await);
    assert_eq!(parts.r.to_string(), format!("0x{r}"));
    assert_eq!(parts.s.to_string(), format!("0x{s}"));
    assert_eq!(parts.v, 28);

    let typed = json!({"primaryType": "Mail"});
    let parts = assert_ok!(evm.plugin.sign_typed_data_parts(&typed).await);
    assert_eq!(parts.v, 28);
    assert_eq!(parts.signature, format!("0x{r}{s}1c"));

    evm.provider.respond("personal_sign", json!("0xsig"));
    assert!(matches!(
        evm.plugin.sign_parts("hi").await,
        Err(WalletError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_evm_sub_provider() {
    init_tracing();
    let host = MockHost::new();
    let root = MockEip1193::new();
    let sub = MockEip1193::new();
    root.add_sub_provider("MetaMask", sub.clone());
    host.inject_evm("ethereum", root.clone());
    let cx = WalletContext::builder(host).build();
    let plugin = cx.add_plugin(Brand::MetaMask.info(), Arc::new(EvmFamily::new()));

    plugin.connect().await.unwrap();

    assert!(sub.called("eth_requestAccounts"));
    assert!(!root.called("eth_requestAccounts"));
    assert_eq!(sub.listeners("accountsChanged"), 1);
}

#[tokio::test]
async fn test_coinbase_bridge_disconnect() {
    let evm = evm(Brand::CoinbaseWallet);
    evm.plugin.connect().await.unwrap();
    assert_eq!(evm.host.message_listeners(), 1);

    evm.host
        .post_message(json!({"type": "extensionUIResponse", "data": {"action": "other"}}));
    evm.host
        .post_message(json!({"type": "extensionUIResponse", "data": {"action": "parentDisconnect"}}));
    wait_until(|| evm.plugin.status() == Status::Disconnected).await;

    assert_eq!(evm.host.message_listeners(), 0);
    assert_eq!(evm.provider.listeners("chainChanged"), 0);
}

#[tokio::test]
async fn test_installed_prompts_install() {
    init_tracing();
    let host = MockHost::new();
    let cx = WalletContext::builder(host.clone()).build();
    let plugin = cx.add_plugin(Brand::UniSatWallet.info(), Arc::new(EvmFamily::new()));

    assert!(!plugin.installed(false));
    assert!(host.opened_urls().is_empty());

    host.set_confirm(false);
    assert!(!plugin.installed(true));
    assert!(host.opened_urls().is_empty());

    host.set_confirm(true);
    assert!(!plugin.installed(true));
    assert_eq!(host.opened_urls(), vec![plugin.install_url().to_string()]);

    host.inject_unisat("unisat", MockUnisat::new());
    assert!(plugin.installed(true));
}

fn tron() -> (Arc<MockHost>, Arc<MockTronLink>, WalletPlugin) {
    init_tracing();
    let host = MockHost::new();
    let provider = MockTronLink::new();
    host.inject_tronlink("tronLink", provider.clone());
    let cx = WalletContext::builder(host.clone()).build();
    let plugin = cx.add_plugin(Brand::TronLink.info(), Arc::new(TronFamily::new()));
    (host, provider, plugin)
}

fn tron_message(action: &str, data: Value) -> Value {
    json!({"isTronLink": true, "message": {"action": action, "data": data}})
}

#[tokio::test]
async fn test_tron_connect() {
    let (host, _provider, plugin) = tron();

    assert_eq!(plugin.connect().await.unwrap(), ACCOUNT);
    assert_eq!(plugin.balance(), "1.5");
    assert_eq!(host.message_listeners(), 1);
    assert_eq!(plugin.block_number().await.unwrap(), 61_000_000);
    assert_eq!(plugin.gas_price().await.unwrap(), 150_000_000);
}

#[tokio::test]
async fn test_tron_connect_errors() {
    let (_host, provider, plugin) = tron();

    provider.set_reply(json!(""));
    let err = plugin.connect().await.unwrap_err();
    assert!(matches!(err, WalletError::Wallet { code: 0, ref message } if message == "Please unlock the wallet"));
    assert_eq!(plugin.status(), Status::Initial);

    provider.set_reply(json!({"code": 4001, "message": "User rejected"}));
    let err = plugin.connect().await.unwrap_err();
    assert_eq!(err.code(), Some(4001));

    provider.set_reply(json!({"code": 200, "message": "ok"}));
    provider.set_ready(false);
    assert_ok!(plugin.connect().await);
    assert_err!(plugin.block_number().await);
}

#[tokio::test]
async fn test_tron_disconnect_matches_case_insensitively() {
    let (host, _provider, plugin) = tron();
    plugin.connect().await.unwrap();

    host.post_message(tron_message("disconnect", json!({"disconnectAddress": "0xdef"})));
    host.post_message(tron_message("setNode", json!({"node": {"chainId": "0x2b6653dc"}})));
    wait_until(|| plugin.network() == "0x2b6653dc").await;
    assert!(plugin.is_connected());

    host.post_message(tron_message("disconnectWeb", json!({"disconnectAddress": "0xABC"})));
    wait_until(|| plugin.status() == Status::Disconnected).await;
    assert_eq!(host.message_listeners(), 0);
}

#[tokio::test]
async fn test_tron_tab_reply() {
    let (host, _provider, plugin) = tron();
    plugin.connect().await.unwrap();

    host.post_message(tron_message(
        "tabReply",
        json!({"data": {"isAuth": "true", "node": {"chainId": "0xcd8690dc"}}}),
    ));
    wait_until(|| plugin.network() == "0xcd8690dc").await;
    assert!(plugin.is_connected());

    host.post_message(json!({"message": {"action": "disconnect", "data": {}}}));
    host.post_message(tron_message("tabReply", json!({"data": {"isAuth": "false"}})));
    wait_until(|| plugin.status() == Status::Disconnected).await;
}

#[tokio::test]
async fn test_tron_accounts_changed() {
    let (host, _provider, plugin) = tron();
    plugin.connect().await.unwrap();

    host.post_message(tron_message("accountsChanged", json!({"address": "TNew"})));
    wait_until(|| plugin.account() == "TNew").await;

    host.post_message(tron_message("accountsChanged", json!({"address": false})));
    wait_until(|| plugin.status() == Status::Disconnected).await;
}

#[tokio::test]
async fn test_tron_unsupported_operations() {
    let (_host, _provider, plugin) = tron();
    plugin.connect().await.unwrap();

    let err = plugin.sign_typed_data(&json!({})).await.unwrap_err();
    assert!(matches!(err, WalletError::Unsupported { operation: "sign_typed_data", .. }));
    assert_ok!(plugin.switch_chain("0x2b6653dc", None).await);
    assert_eq!(plugin.sign("hello").await.unwrap(), "sig:hello");
}

fn unisat(base_url: &str) -> (Arc<MockHost>, Arc<MockUnisat>, WalletPlugin) {
    init_tracing();
    let host = MockHost::new();
    let provider = MockUnisat::new();
    host.inject_unisat("unisat", provider.clone());
    let cx = WalletContext::builder(host.clone()).build();
    let mut explorer = ExplorerConfig::default().base_url(base_url);
    explorer.http.no_proxy = true;
    explorer.http.timeout_secs = Some(2);
    let family = UtxoFamily::new(explorer).unwrap();
    let plugin = cx.add_plugin(Brand::UniSatWallet.info(), Arc::new(family));
    (host, provider, plugin)
}

#[tokio::test]
async fn test_utxo_connect_and_events() {
    let (_host, provider, plugin) = unisat("http://127.0.0.1:9");

    assert_eq!(plugin.connect().await.unwrap(), "bc1qtest");
    assert_eq!(plugin.network(), "livenet");
    assert_eq!(plugin.balance(), "1.23456789");

    provider.emit("networkChanged", json!("testnet"));
    wait_until(|| plugin.network() == "testnet").await;

    provider.emit("accountsChanged", json!([]));
    wait_until(|| plugin.status() == Status::Disconnected).await;
    assert_eq!(provider.listeners("networkChanged"), 0);
}

async fn explorer(route: &str, response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_utxo_explorer_errors_read_as_zero() {
    let server = explorer("/blocks/tip/height", ResponseTemplate::new(500).set_body_string("boom")).await;
    let (_host, _provider, plugin) = unisat(&server.uri());
    assert_eq!(plugin.block_number().await.unwrap(), 0);

    let server = explorer("/v1/fees/recommended", ResponseTemplate::new(503)).await;
    let (_host, _provider, plugin) = unisat(&server.uri());
    assert_eq!(plugin.gas_price().await.unwrap(), 0);

    let server = explorer("/blocks/tip/height", ResponseTemplate::new(200).set_body_string("not a height")).await;
    let (_host, _provider, plugin) = unisat(&server.uri());
    assert_eq!(plugin.block_number().await.unwrap(), 0);

    let (_host, _provider, plugin) = unisat("http://127.0.0.1:9");
    assert_eq!(plugin.block_number().await.unwrap(), 0);
}

#[tokio::test]
async fn test_utxo_explorer_success() {
    let server = explorer("/blocks/tip/height", ResponseTemplate::new(200).set_body_string("840000")).await;
    let (_host, _provider, plugin) = unisat(&server.uri());
    assert_eq!(plugin.block_number().await.unwrap(), 840_000);
    // Only the tip height route is mounted.
    assert_eq!(plugin.gas_price().await.unwrap(), 0);

    let server = explorer(
        "/v1/fees/recommended",
        ResponseTemplate::new(200).set_body_json(json!({"fastestFee": 21, "halfHourFee": 12})),
    )
    .await;
    let (_host, _provider, plugin) = unisat(&server.uri());
    assert_eq!(plugin.gas_price().await.unwrap(), 21);
    assert_eq!(plugin.block_number().await.unwrap(), 0);
}

#[tokio::test]
async fn test_utxo_transfer() {
    let (_host, provider, plugin) = unisat("http://127.0.0.1:9");
    plugin.connect().await.unwrap();

    let hash = plugin
        .transfer(&TransferRequest::new("0.0001", "bc1qdest").unit("btc"))
        .await
        .unwrap();

    assert_eq!(hash, "txid-btc");
    assert_eq!(provider.sent(), vec![("bc1qdest".to_string(), 10_000)]);
    assert!(matches!(
        plugin.request("getInscriptions").await,
        Err(WalletError::Unsupported { .. })
    ));
}
