//! The capability set every chain family implements.
//!
//! A brand plugin is a [`PluginInfo`](super::PluginInfo) plus one of these
//! strategies. Strategies are stateless with respect to the connection: all
//! connection state lives in the plugin, and strategies receive what they need
//! through a [`ProviderContext`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use super::PluginInfo;
use super::session::Subscription;
use crate::error::{Result, WalletError};
use crate::host::Host;
use crate::provider::RequestArguments;

/// Chain family of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyKind {
    /// EIP-1193 account-based wallets.
    Evm,
    /// Bitcoin-style wallets.
    Utxo,
    /// Tron wallets.
    Tron,
}

/// What a strategy sees of its plugin for one call.
#[derive(Clone, Copy)]
pub struct ProviderContext<'a> {
    /// Identity of the plugin.
    pub info: &'a PluginInfo,
    /// Host environment.
    pub host: &'a Arc<dyn Host>,
    /// Active account, empty when none.
    pub account: &'a str,
}

impl std::fmt::Debug for ProviderContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContext")
            .field("wallet", &self.info.name)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl ProviderContext<'_> {
    /// Error for a missing injected provider.
    #[must_use]
    pub fn not_installed(&self) -> WalletError {
        WalletError::NotInstalled(self.info.name.clone())
    }

    /// Error for a capability this family lacks.
    #[must_use]
    pub fn unsupported(&self, operation: &'static str) -> WalletError {
        WalletError::unsupported(&self.info.name, operation)
    }

    /// The given address, or the active account when `None` or empty.
    #[must_use]
    pub fn address_or_account<'b>(&'b self, address: Option<&'b str>) -> &'b str {
        match address {
            Some(a) if !a.is_empty() => a,
            _ => self.account,
        }
    }
}

/// Balance query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceQuery<'a> {
    /// Address to query, the active account when `None`.
    pub address: Option<&'a str>,
    /// Token contract, the native currency when `None`.
    pub token: Option<&'a str>,
    /// Display unit (`ether`, `gwei`, ...); smallest units when `None`.
    pub unit: Option<&'a str>,
}

impl<'a> BalanceQuery<'a> {
    /// Native balance of the active account in smallest units.
    #[must_use]
    pub const fn native() -> Self {
        Self {
            address: None,
            token: None,
            unit: None,
        }
    }

    /// Query a specific address.
    #[must_use]
    pub const fn address(mut self, address: &'a str) -> Self {
        self.address = Some(address);
        self
    }

    /// Query a token balance.
    #[must_use]
    pub const fn token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    /// Convert to a display unit.
    #[must_use]
    pub const fn unit(mut self, unit: &'a str) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// A value transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Amount, in `unit` when given, otherwise in smallest units.
    pub amount: String,
    /// Recipient address.
    pub to: String,
    /// Token contract, `None` for the native currency.
    #[serde(default)]
    pub token: Option<String>,
    /// Unit of `amount`.
    #[serde(default)]
    pub unit: Option<String>,
}

impl TransferRequest {
    /// Transfer `amount` smallest units of the native currency.
    pub fn new(amount: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            to: to.into(),
            token: None,
            unit: None,
        }
    }

    /// Transfer a token instead of the native currency.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Interpret `amount` in a display unit.
    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Native currency description for `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Currency name.
    pub name: String,
    /// Ticker, 2-6 characters.
    pub symbol: String,
    /// Always 18 for EVM chains.
    pub decimals: u8,
}

/// Parameters of `wallet_addEthereumChain` (EIP-3085).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParameter {
    /// `0x`-prefixed hex chain id.
    pub chain_id: String,
    /// Display name.
    pub chain_name: String,
    /// Native currency.
    pub native_currency: NativeCurrency,
    /// RPC endpoints.
    pub rpc_urls: Vec<String>,
    /// Explorer URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_explorer_urls: Option<Vec<String>>,
    /// Icon URLs (currently ignored by wallets).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_urls: Option<Vec<String>>,
}

/// A native event, already translated out of its wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    /// New account list; empty means the wallet revoked access.
    AccountsChanged(Vec<String>),
    /// New chain or network id in its native representation.
    ChainChanged(Value),
    /// The wallet asked the site to disconnect. With an address, only when
    /// it matches the active account.
    Disconnect {
        /// Account the request is for.
        address: Option<String>,
    },
    /// The wallet reports the site as connected.
    Connect,
    /// The wallet reports authorization state and/or its current network.
    Authorization {
        /// Whether the site is authorized, when reported.
        authorized: Option<bool>,
        /// Current network id, when reported.
        network: Option<String>,
    },
}

/// Where native listeners forward translated events.
#[derive(Debug, Clone)]
pub struct NativeSink {
    wallet: String,
    tx: mpsc::UnboundedSender<NativeEvent>,
}

impl NativeSink {
    pub(crate) fn new(wallet: impl Into<String>, tx: mpsc::UnboundedSender<NativeEvent>) -> Self {
        Self {
            wallet: wallet.into(),
            tx,
        }
    }

    /// Forward an event to the plugin.
    pub fn send(&self, event: NativeEvent) {
        if self.tx.send(event).is_err() {
            debug!(wallet = %self.wallet, "native event after session closed");
        }
    }
}

/// Chain-family strategy.
///
/// Only [`connect`](Self::connect) and [`subscribe`](Self::subscribe) are
/// mandatory; queries default to zero and mutations to "not supported".
#[async_trait]
pub trait ChainFamily: Send + Sync {
    /// Family of this strategy.
    fn kind(&self) -> FamilyKind;

    /// Unit used when the plugin refreshes its cached balance.
    fn display_unit(&self) -> Option<&'static str> {
        None
    }

    /// Request account access; returns the active account.
    async fn connect(&self, cx: &ProviderContext<'_>) -> Result<String>;

    /// Attach native listeners that translate into `sink`.
    fn subscribe(&self, cx: &ProviderContext<'_>, sink: &NativeSink) -> Result<Vec<Subscription>>;

    /// Account the wallet already authorized for this site, asked for
    /// without prompting. `None` when the family cannot tell or nothing is
    /// authorized.
    async fn restore(&self, _cx: &ProviderContext<'_>) -> Result<Option<String>> {
        Ok(None)
    }

    /// Query the current network after connecting.
    async fn current_network(&self, _cx: &ProviderContext<'_>) -> Result<Option<String>> {
        Ok(None)
    }

    /// Balance as a decimal string.
    async fn balance_of(&self, _cx: &ProviderContext<'_>, _query: BalanceQuery<'_>) -> Result<String> {
        Ok("0".to_string())
    }

    /// Latest block height.
    async fn block_number(&self, _cx: &ProviderContext<'_>) -> Result<u64> {
        Ok(0)
    }

    /// Current gas price or fee rate in the family's native fee unit.
    async fn gas_price(&self, _cx: &ProviderContext<'_>) -> Result<u128> {
        Ok(0)
    }

    /// Submit a transfer; returns the transaction hash.
    async fn transfer(&self, cx: &ProviderContext<'_>, _request: &TransferRequest) -> Result<String> {
        Err(cx.unsupported("transfer"))
    }

    /// Sign a message with the active account.
    async fn sign(&self, cx: &ProviderContext<'_>, _message: &str) -> Result<String> {
        Err(cx.unsupported("sign"))
    }

    /// Sign EIP-712 typed data.
    async fn sign_typed_data(&self, cx: &ProviderContext<'_>, _typed_data: &Value) -> Result<String> {
        Err(cx.unsupported("sign_typed_data"))
    }

    /// Switch network, optionally registering it first.
    async fn switch_chain(
        &self,
        _cx: &ProviderContext<'_>,
        _chain: &str,
        _add_chain: Option<&AddChainParameter>,
    ) -> Result<()> {
        Ok(())
    }

    /// Raw pass-through to the provider's request API.
    async fn request(&self, cx: &ProviderContext<'_>, _args: RequestArguments) -> Result<Value> {
        Err(cx.unsupported("request"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_query_builder() {
        let query = BalanceQuery::native().address("0xabc").unit("ether");
        assert_eq!(query.address, Some("0xabc"));
        assert_eq!(query.token, None);
        assert_eq!(query.unit, Some("ether"));
    }

    #[test]
    fn test_add_chain_parameter_json() {
        let params = AddChainParameter {
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
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["chainId"], "0x38");
        assert_eq!(json["nativeCurrency"]["decimals"], 18);
        assert!(json.get("blockExplorerUrls").is_none());
    }
}
