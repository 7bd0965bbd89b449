//! EIP-1193 wallets (MetaMask, OKX, Coinbase).
//!
//! Everything goes through the provider's `request` call. Amounts are
//! converted with `alloy` unit helpers and ERC-20 calldata is encoded from a
//! `sol!` fragment.

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256, hex};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{Result, USER_REJECTED_CODE, WalletError};
use crate::host::Injected;
use crate::plugin::{
    AddChainParameter, BalanceQuery, ChainFamily, FamilyKind, NativeEvent, NativeSink,
    ProviderContext, Subscription, TransferRequest,
};
use crate::provider::{Eip1193Provider, NativeListener, RequestArguments};
use crate::units::{
    canonical_network, format_trimmed, parse_quantity, parse_u64_quantity, to_smallest_unit,
    unit_decimals,
};

alloy::sol! {
    /// The part of ERC-20 needed to move tokens.
    interface IErc20Transfer {
        event Transfer(address indexed from, address indexed to, uint256 value);
        function transferFrom(address sender, address recipient, uint256 amount) external returns (bool);
        function transfer(address to, uint256 value) external returns (bool success);
    }
}

/// `balanceOf(address)` selector.
const BALANCE_OF_SELECTOR: &str = "0x70a08231";

/// Message posted by the Coinbase extension UI when the user disconnects
/// the site from inside the wallet.
#[derive(Debug, Deserialize)]
struct BridgeMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<BridgeAction>,
}

#[derive(Debug, Deserialize)]
struct BridgeAction {
    #[serde(default)]
    action: Option<String>,
}

impl BridgeMessage {
    fn is_parent_disconnect(&self) -> bool {
        self.kind == "extensionUIResponse"
            && self
                .data
                .as_ref()
                .and_then(|d| d.action.as_deref())
                .is_some_and(|a| a == "parentDisconnect")
    }
}

/// A 65-byte `r || s || v` signature split into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParts {
    /// The signature as the wallet returned it.
    pub signature: String,
    /// First 32 bytes.
    pub r: B256,
    /// Second 32 bytes.
    pub s: B256,
    /// Recovery byte, moved into the `27`/`28` range when the wallet
    /// returned `0`/`1`.
    pub v: u8,
}

impl SignatureParts {
    /// Split a hex signature, with or without the `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::InvalidResponse`] when the input is not hex or
    /// not exactly 65 bytes long.
    pub fn parse(signature: &str) -> Result<Self> {
        let bytes = hex::decode(signature.trim())
            .map_err(|e| WalletError::invalid_response(format!("bad signature {signature}: {e}")))?;
        let bytes: [u8; 65] = bytes.try_into().map_err(|b: Vec<u8>| {
            WalletError::invalid_response(format!("signature is {} bytes, expected 65", b.len()))
        })?;
        let v = bytes[64];
        Ok(Self {
            signature: signature.to_string(),
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v: if v < 27 { v + 27 } else { v },
        })
    }
}

/// Strategy for EIP-1193 providers.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvmFamily {
    message_bridge: bool,
}

impl EvmFamily {
    /// Plain EIP-1193 strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            message_bridge: false,
        }
    }

    /// Also disconnect when the extension UI posts a `parentDisconnect`
    /// message to the host.
    #[must_use]
    pub const fn with_message_bridge(mut self) -> Self {
        self.message_bridge = true;
        self
    }

    /// Whether the message bridge is enabled.
    #[must_use]
    pub const fn has_message_bridge(&self) -> bool {
        self.message_bridge
    }

    /// Resolve the provider, preferring the plugin's entry in a shared
    /// provider map.
    fn provider(cx: &ProviderContext<'_>) -> Result<Arc<dyn Eip1193Provider>> {
        match cx.host.injected(&cx.info.injected_key) {
            Some(Injected::Eip1193(root)) => Ok(root.sub_provider(&cx.info.name).unwrap_or(root)),
            _ => Err(cx.not_installed()),
        }
    }

    async fn call(cx: &ProviderContext<'_>, args: RequestArguments) -> Result<Value> {
        let provider = Self::provider(cx)?;
        debug!(wallet = %cx.info.name, method = %args.method, "request");
        Ok(provider.request(args).await?)
    }

    fn require_account<'a>(cx: &ProviderContext<'a>) -> Result<&'a str> {
        if cx.account.is_empty() {
            return Err(WalletError::NotConnected(cx.info.name.clone()));
        }
        Ok(cx.account)
    }
}

/// `0x`-prefixed hex chain id from a decimal or hex string.
fn chain_id_hex(chain: &str) -> Result<String> {
    let chain = chain.trim();
    let value = if chain.starts_with("0x") || chain.starts_with("0X") {
        Value::String(chain.to_string())
    } else {
        let id: u64 = chain
            .parse()
            .map_err(|_| WalletError::UnknownChain { chain: chain.to_string() })?;
        Value::from(id)
    };
    let id = parse_u64_quantity(&value)?;
    Ok(format!("{id:#x}"))
}

fn parse_address(address: &str) -> Result<Address> {
    address
        .parse()
        .map_err(|_| WalletError::InvalidAddress(address.to_string()))
}

fn amount_in_smallest_unit(request: &TransferRequest) -> Result<U256> {
    match request.unit.as_deref() {
        Some(unit) => to_smallest_unit(&request.amount, unit),
        None => parse_quantity(&Value::String(request.amount.clone())),
    }
}

fn transaction_hash(value: Value) -> Result<String> {
    match value {
        Value::String(hash) if !hash.is_empty() => Ok(hash),
        other => Err(WalletError::invalid_response(format!(
            "expected transaction hash, got {other}"
        ))),
    }
}

#[async_trait]
impl ChainFamily for EvmFamily {
    fn kind(&self) -> FamilyKind {
        FamilyKind::Evm
    }

    fn display_unit(&self) -> Option<&'static str> {
        Some("ether")
    }

    async fn connect(&self, cx: &ProviderContext<'_>) -> Result<String> {
        let accounts = match Self::call(cx, RequestArguments::new("eth_requestAccounts")).await {
            Ok(accounts) => accounts,
            Err(WalletError::Provider(e)) => {
                if e.code == USER_REJECTED_CODE {
                    cx.host.alert(&format!("Please connect to {}.", cx.info.name));
                    return Err(WalletError::UserRejected {
                        wallet: cx.info.name.clone(),
                    });
                }
                cx.host.alert(&e.message);
                return Err(WalletError::Provider(e));
            }
            Err(e) => return Err(e),
        };

        let accounts: Vec<String> = serde_json::from_value(accounts)?;
        accounts
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::invalid_response("eth_requestAccounts returned no account"))
    }

    async fn restore(&self, cx: &ProviderContext<'_>) -> Result<Option<String>> {
        let accounts = Self::call(cx, RequestArguments::new("eth_accounts")).await?;
        let accounts: Vec<String> = serde_json::from_value(accounts)?;
        Ok(accounts.into_iter().next())
    }

    fn subscribe(&self, cx: &ProviderContext<'_>, sink: &NativeSink) -> Result<Vec<Subscription>> {
        let provider = Self::provider(cx)?;
        let mut subscriptions = Vec::with_capacity(3);

        let accounts_sink = sink.clone();
        let on_accounts: NativeListener = Arc::new(move |payload: Value| {
            match serde_json::from_value::<Vec<String>>(payload) {
                Ok(accounts) => accounts_sink.send(NativeEvent::AccountsChanged(accounts)),
                Err(e) => debug!(error = %e, "malformed accountsChanged payload"),
            }
        });
        let id = provider.on("accountsChanged", on_accounts);
        subscriptions.push(Subscription::native(Arc::clone(&provider), "accountsChanged", id));

        let chain_sink = sink.clone();
        let on_chain: NativeListener =
            Arc::new(move |payload: Value| chain_sink.send(NativeEvent::ChainChanged(payload)));
        let id = provider.on("chainChanged", on_chain);
        subscriptions.push(Subscription::native(provider, "chainChanged", id));

        if self.message_bridge {
            let bridge_sink = sink.clone();
            let on_message: NativeListener = Arc::new(move |data: Value| {
                let Ok(message) = serde_json::from_value::<BridgeMessage>(data) else {
                    return;
                };
                if message.is_parent_disconnect() {
                    bridge_sink.send(NativeEvent::Disconnect { address: None });
                }
            });
            let id = cx.host.add_message_listener(on_message);
            subscriptions.push(Subscription::message(Arc::clone(cx.host), id));
        }

        Ok(subscriptions)
    }

    async fn current_network(&self, cx: &ProviderContext<'_>) -> Result<Option<String>> {
        let chain = Self::call(cx, RequestArguments::new("eth_chainId")).await?;
        Ok(canonical_network(&chain))
    }

    async fn balance_of(&self, cx: &ProviderContext<'_>, query: BalanceQuery<'_>) -> Result<String> {
        let address = cx.address_or_account(query.address);
        let raw = match query.token {
            None => {
                Self::call(
                    cx,
                    RequestArguments::new("eth_getBalance").with_params(json!([address, "latest"])),
                )
                .await?
            }
            Some(token) => {
                let holder = address.strip_prefix("0x").unwrap_or(address);
                let data = format!("{BALANCE_OF_SELECTOR}{:0>24}{holder}", "");
                Self::call(
                    cx,
                    RequestArguments::new("eth_call").with_params(json!([
                        {"from": address, "to": token, "data": data},
                        "latest"
                    ])),
                )
                .await?
            }
        };

        let amount = parse_quantity(&raw)?;
        match query.unit {
            Some(unit) => Ok(format_trimmed(amount, unit_decimals(unit)?)),
            None => Ok(amount.to_string()),
        }
    }

    async fn block_number(&self, cx: &ProviderContext<'_>) -> Result<u64> {
        let value = Self::call(cx, RequestArguments::new("eth_blockNumber")).await?;
        parse_u64_quantity(&value)
    }

    async fn gas_price(&self, cx: &ProviderContext<'_>) -> Result<u128> {
        let value = Self::call(cx, RequestArguments::new("eth_gasPrice")).await?;
        let price = parse_quantity(&value)?;
        u128::try_from(price)
            .map_err(|_| WalletError::invalid_response(format!("gas price {price} overflows")))
    }

    async fn transfer(&self, cx: &ProviderContext<'_>, request: &TransferRequest) -> Result<String> {
        let from = Self::require_account(cx)?;
        let value = amount_in_smallest_unit(request)?;

        let tx = match request.token.as_deref() {
            None => json!({
                "from": from,
                "to": request.to,
                "value": format!("0x{value:x}"),
            }),
            Some(token) => {
                let call = IErc20Transfer::transferCall {
                    to: parse_address(&request.to)?,
                    value,
                };
                json!({
                    "from": from,
                    "to": token,
                    "data": hex::encode_prefixed(call.abi_encode()),
                })
            }
        };

        let hash =
            Self::call(cx, RequestArguments::new("eth_sendTransaction").with_params(json!([tx])))
                .await?;
        transaction_hash(hash)
    }

    async fn sign(&self, cx: &ProviderContext<'_>, message: &str) -> Result<String> {
        let account = Self::require_account(cx)?;
        let data = if message.starts_with("0x") {
            message.to_string()
        } else {
            hex::encode_prefixed(message.as_bytes())
        };
        let signature = Self::call(
            cx,
            RequestArguments::new("personal_sign").with_params(json!([data, account])),
        )
        .await?;
        signature
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::invalid_response(format!("bad signature {signature}")))
    }

    async fn sign_typed_data(&self, cx: &ProviderContext<'_>, typed_data: &Value) -> Result<String> {
        let account = Self::require_account(cx)?;
        let signature = Self::call(
            cx,
            RequestArguments::new("eth_signTypedData_v4").with_params(json!([account, typed_data])),
        )
        .await?;
        signature
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::invalid_response(format!("bad signature {signature}")))
    }

    async fn switch_chain(
        &self,
        cx: &ProviderContext<'_>,
        chain: &str,
        add_chain: Option<&AddChainParameter>,
    ) -> Result<()> {
        let chain_id = chain_id_hex(chain)?;
        let switch = RequestArguments::new("wallet_switchEthereumChain")
            .with_params(json!([{ "chainId": chain_id }]));

        match Self::call(cx, switch).await {
            Ok(_) => Ok(()),
            Err(WalletError::Provider(e)) if e.is_unknown_chain() => {
                warn!(wallet = %cx.info.name, chain = %chain_id, error = %e, "switch chain failed");
                let Some(add_chain) = add_chain else {
                    return Err(WalletError::UnknownChain { chain: chain_id });
                };
                let add = RequestArguments::new("wallet_addEthereumChain")
                    .with_params(json!([add_chain]));
                Self::call(cx, add).await.map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    async fn request(&self, cx: &ProviderContext<'_>, args: RequestArguments) -> Result<Value> {
        Self::call(cx, args).await
    }
}
