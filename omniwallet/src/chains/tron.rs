//! TronLink.
//!
//! Queries go through the injected `tronWeb`; native events arrive as
//! `postMessage` envelopes on the host:
//!
//! ```text
//! { isTronLink: true, message: { action: "setNode",         data: { node: { chainId } } } }
//! { isTronLink: true, message: { action: "accountsChanged", data: { address } } }
//! { isTronLink: true, message: { action: "disconnect",      data: { disconnectAddress } } }
//! { isTronLink: true, message: { action: "connect",         data: .. } }
//! { isTronLink: true, message: { action: "tabReply",        data: { data: { isAuth, node } } } }
//! ```

use std::sync::Arc;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Result, WalletError};
use crate::host::Injected;
use crate::plugin::{
    BalanceQuery, ChainFamily, FamilyKind, NativeEvent, NativeSink, ProviderContext, Subscription,
    TransferRequest,
};
use crate::provider::{NativeListener, RequestArguments, TronLinkProvider};
use crate::units::{TRX_DECIMALS, canonical_network, format_trimmed, to_smallest_unit};

/// Status code of a successful `tron_requestAccounts`.
const TRON_OK: i64 = 200;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "isTronLink", default)]
    is_tron_link: bool,
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    action: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    #[serde(rename = "chainId", default)]
    chain_id: Value,
}

#[derive(Debug, Deserialize)]
struct SetNode {
    node: NodeInfo,
}

#[derive(Debug, Deserialize)]
struct AccountChange {
    #[serde(default)]
    address: Value,
}

#[derive(Debug, Default, Deserialize)]
struct DisconnectRequest {
    #[serde(rename = "disconnectAddress", default)]
    disconnect_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TabReply {
    data: TabReplyState,
}

#[derive(Debug, Deserialize)]
struct TabReplyState {
    #[serde(rename = "isAuth", default)]
    is_auth: Option<Value>,
    #[serde(default)]
    node: Option<NodeInfo>,
}

/// Reply of `tron_requestAccounts`.
#[derive(Debug, Deserialize)]
struct AccountsReply {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Decode a host message into a native event.
///
/// Messages without the `isTronLink` marker, with unknown actions or with
/// malformed payloads yield `None`.
#[must_use]
pub fn decode_message(data: &Value) -> Option<NativeEvent> {
    let envelope = Envelope::deserialize(data).ok()?;
    if !envelope.is_tron_link {
        return None;
    }
    let RawMessage { action, data } = envelope.message?;

    match action.as_str() {
        "setNode" => {
            let SetNode { node } = serde_json::from_value(data).ok()?;
            canonical_network(&node.chain_id)?;
            Some(NativeEvent::ChainChanged(node.chain_id))
        }
        "accountsChanged" => {
            let AccountChange { address } = serde_json::from_value(data).ok()?;
            let accounts = match address {
                Value::String(address) if !address.is_empty() => vec![address],
                _ => Vec::new(),
            };
            Some(NativeEvent::AccountsChanged(accounts))
        }
        "disconnect" | "disconnectWeb" => {
            let request: Option<DisconnectRequest> = serde_json::from_value(data).ok()?;
            Some(NativeEvent::Disconnect {
                address: Some(
                    request
                        .and_then(|r| r.disconnect_address)
                        .unwrap_or_default(),
                ),
            })
        }
        "connect" => Some(NativeEvent::Connect),
        "tabReply" => {
            let TabReply { data: state } = serde_json::from_value(data).ok()?;
            let authorized = state.is_auth.and_then(|auth| match auth {
                Value::Bool(b) => Some(b),
                Value::String(s) => Some(s == "true"),
                _ => None,
            });
            let network = state.node.and_then(|node| canonical_network(&node.chain_id));
            Some(NativeEvent::Authorization {
                authorized,
                network,
            })
        }
        other => {
            trace!(action = %other, "ignored TronLink message");
            None
        }
    }
}

/// Strategy for TronLink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TronFamily;

impl TronFamily {
    /// Create the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn provider(cx: &ProviderContext<'_>) -> Result<Arc<dyn TronLinkProvider>> {
        match cx.host.injected(&cx.info.injected_key) {
            Some(Injected::TronLink(provider)) => Ok(provider),
            _ => Err(cx.not_installed()),
        }
    }

    /// The provider once `tronWeb` is initialized.
    fn tron_web(cx: &ProviderContext<'_>) -> Result<Arc<dyn TronLinkProvider>> {
        let provider = Self::provider(cx)?;
        if !provider.ready() {
            return Err(WalletError::wallet(0, format!("{} is not ready", cx.info.name)));
        }
        Ok(provider)
    }
}

fn sun(request: &TransferRequest) -> Result<u64> {
    let amount = match request.unit.as_deref() {
        None | Some("sun") => request
            .amount
            .trim()
            .parse::<u64>()
            .map(U256::from)
            .map_err(|e| WalletError::Units(format!("bad sun amount '{}': {e}", request.amount)))?,
        Some(unit) if unit.eq_ignore_ascii_case("trx") => {
            to_smallest_unit(&request.amount, &TRX_DECIMALS.to_string())?
        }
        Some(unit) => to_smallest_unit(&request.amount, unit)?,
    };
    u64::try_from(amount).map_err(|_| WalletError::Units(format!("{amount} sun overflows")))
}

fn broadcast_txid(result: &Value) -> Option<String> {
    result
        .get("txid")
        .or_else(|| result.get("transaction").and_then(|tx| tx.get("txID")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl ChainFamily for TronFamily {
    fn kind(&self) -> FamilyKind {
        FamilyKind::Tron
    }

    async fn connect(&self, cx: &ProviderContext<'_>) -> Result<String> {
        let provider = Self::provider(cx)?;
        let reply = provider
            .request(RequestArguments::new("tron_requestAccounts"))
            .await?;

        if reply.as_str().is_some_and(str::is_empty) {
            return Err(WalletError::wallet(0, "Please unlock the wallet"));
        }
        let reply = AccountsReply::deserialize(&reply)
            .map_err(|e| WalletError::invalid_response(format!("tron_requestAccounts: {e}")))?;
        if reply.code != TRON_OK {
            return Err(WalletError::wallet(reply.code, reply.message));
        }

        provider
            .default_address()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| WalletError::invalid_response("tronWeb has no default address"))
    }

    fn subscribe(&self, cx: &ProviderContext<'_>, sink: &NativeSink) -> Result<Vec<Subscription>> {
        let sink = sink.clone();
        let listener: NativeListener = Arc::new(move |data: Value| {
            if let Some(event) = decode_message(&data) {
                debug!(?event, "TronLink message");
                sink.send(event);
            }
        });
        let id = cx.host.add_message_listener(listener);
        Ok(vec![Subscription::message(Arc::clone(cx.host), id)])
    }

    async fn balance_of(&self, cx: &ProviderContext<'_>, query: BalanceQuery<'_>) -> Result<String> {
        if query.token.is_some() {
            return Err(cx.unsupported("token balance"));
        }
        let address = cx.address_or_account(query.address);
        let sun = Self::tron_web(cx)?.get_balance(address).await?;
        Ok(format_trimmed(U256::from(sun), TRX_DECIMALS))
    }

    async fn block_number(&self, cx: &ProviderContext<'_>) -> Result<u64> {
        let block = Self::tron_web(cx)?.get_current_block().await?;
        block
            .pointer("/block_header/raw_data/number")
            .and_then(Value::as_u64)
            .ok_or_else(|| WalletError::invalid_response("block without block_header.raw_data.number"))
    }

    async fn gas_price(&self, cx: &ProviderContext<'_>) -> Result<u128> {
        Ok(u128::from(Self::tron_web(cx)?.fee_limit()))
    }

    async fn transfer(&self, cx: &ProviderContext<'_>, request: &TransferRequest) -> Result<String> {
        if request.token.is_some() {
            return Err(cx.unsupported("token transfer"));
        }
        let amount = sun(request)?;
        let result = Self::tron_web(cx)?.send_trx(&request.to, amount).await?;
        broadcast_txid(&result)
            .ok_or_else(|| WalletError::invalid_response(format!("broadcast without txid: {result}")))
    }

    async fn sign(&self, cx: &ProviderContext<'_>, message: &str) -> Result<String> {
        Ok(Self::tron_web(cx)?.sign_message(message).await?)
    }

    async fn request(&self, cx: &ProviderContext<'_>, args: RequestArguments) -> Result<Value> {
        Ok(Self::provider(cx)?.request(args).await?)
    }
}
