//! UniSat-style Bitcoin wallets.
//!
//! The provider has no chain queries, so block height and fee rate come from
//! a mempool.space compatible explorer. Explorer failures read as zero.

use std::sync::Arc;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ExplorerConfig;
use crate::error::{Result, WalletError};
use crate::host::Injected;
use crate::plugin::{
    AddChainParameter, BalanceQuery, ChainFamily, FamilyKind, NativeEvent, NativeSink,
    ProviderContext, Subscription, TransferRequest,
};
use crate::provider::{NativeListener, UnisatProvider};
use crate::units::{BTC_DECIMALS, format_fixed, to_smallest_unit};

/// Fee estimates from `/v1/fees/recommended`, in sat/vB.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendedFees {
    fastest_fee: u64,
}

/// Strategy for UniSat-compatible providers.
#[derive(Debug, Clone)]
pub struct UtxoFamily {
    explorer: ExplorerConfig,
    client: reqwest::Client,
}

impl UtxoFamily {
    /// Create a strategy using the given explorer.
    ///
    /// # Errors
    ///
    /// Fails when the explorer's HTTP client cannot be built.
    pub fn new(explorer: ExplorerConfig) -> Result<Self> {
        let client = explorer.http.build_client()?;
        Ok(Self { explorer, client })
    }

    /// Explorer settings.
    #[must_use]
    pub const fn explorer(&self) -> &ExplorerConfig {
        &self.explorer
    }

    fn provider(cx: &ProviderContext<'_>) -> Result<Arc<dyn UnisatProvider>> {
        match cx.host.injected(&cx.info.injected_key) {
            Some(Injected::Unisat(provider)) => Ok(provider),
            _ => Err(cx.not_installed()),
        }
    }

    /// Satoshis formatted as BTC with the configured fraction digits.
    #[must_use]
    pub fn format_sats(&self, sats: u64) -> String {
        format_fixed(U256::from(sats), BTC_DECIMALS, self.explorer.fraction_digits)
    }

    async fn fetch_text(&self, path: &str) -> Option<String> {
        let url = self.explorer.url(path);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "explorer request failed");
                return None;
            }
        };
        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "explorer returned an error");
            return None;
        }
        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url = %url, error = %e, "explorer body unreadable");
                None
            }
        }
    }
}

fn satoshis(request: &TransferRequest) -> Result<u64> {
    let amount = match request.unit.as_deref() {
        None | Some("sat" | "sats") => request
            .amount
            .trim()
            .parse::<u64>()
            .map(U256::from)
            .map_err(|e| WalletError::Units(format!("bad satoshi amount '{}': {e}", request.amount)))?,
        Some(unit) if unit.eq_ignore_ascii_case("btc") => {
            to_smallest_unit(&request.amount, &BTC_DECIMALS.to_string())?
        }
        Some(unit) => to_smallest_unit(&request.amount, unit)?,
    };
    u64::try_from(amount).map_err(|_| WalletError::Units(format!("{amount} satoshis overflows")))
}

#[async_trait]
impl ChainFamily for UtxoFamily {
    fn kind(&self) -> FamilyKind {
        FamilyKind::Utxo
    }

    async fn connect(&self, cx: &ProviderContext<'_>) -> Result<String> {
        let accounts = Self::provider(cx)?.request_accounts().await?;
        accounts
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::invalid_response("requestAccounts returned no account"))
    }

    fn subscribe(&self, cx: &ProviderContext<'_>, sink: &NativeSink) -> Result<Vec<Subscription>> {
        let provider = Self::provider(cx)?;

        let accounts_sink = sink.clone();
        let on_accounts: NativeListener = Arc::new(move |payload: Value| {
            match serde_json::from_value::<Vec<String>>(payload) {
                Ok(accounts) => accounts_sink.send(NativeEvent::AccountsChanged(accounts)),
                Err(e) => debug!(error = %e, "malformed accountsChanged payload"),
            }
        });
        let accounts_id = provider.on("accountsChanged", on_accounts);

        let network_sink = sink.clone();
        let on_network: NativeListener =
            Arc::new(move |payload: Value| network_sink.send(NativeEvent::ChainChanged(payload)));
        let network_id = provider.on("networkChanged", on_network);

        Ok(vec![
            Subscription::native(Arc::clone(&provider), "accountsChanged", accounts_id),
            Subscription::native(provider, "networkChanged", network_id),
        ])
    }

    async fn current_network(&self, cx: &ProviderContext<'_>) -> Result<Option<String>> {
        let network = Self::provider(cx)?.get_network().await?;
        Ok(Some(network).filter(|n| !n.is_empty()))
    }

    /// The provider only reports the active account, so `address` and
    /// `token` are ignored.
    async fn balance_of(&self, cx: &ProviderContext<'_>, _query: BalanceQuery<'_>) -> Result<String> {
        let balance = Self::provider(cx)?.get_balance().await?;
        Ok(self.format_sats(balance.total))
    }

    async fn block_number(&self, _cx: &ProviderContext<'_>) -> Result<u64> {
        let Some(body) = self.fetch_text("blocks/tip/height").await else {
            return Ok(0);
        };
        Ok(body.trim().parse().unwrap_or_else(|e| {
            warn!(body = %body, error = %e, "unexpected tip height");
            0
        }))
    }

    async fn gas_price(&self, _cx: &ProviderContext<'_>) -> Result<u128> {
        let Some(body) = self.fetch_text("v1/fees/recommended").await else {
            return Ok(0);
        };
        match serde_json::from_str::<RecommendedFees>(&body) {
            Ok(fees) => Ok(u128::from(fees.fastest_fee)),
            Err(e) => {
                warn!(error = %e, "unexpected fee estimate");
                Ok(0)
            }
        }
    }

    async fn transfer(&self, cx: &ProviderContext<'_>, request: &TransferRequest) -> Result<String> {
        if request.token.is_some() {
            return Err(cx.unsupported("token transfer"));
        }
        let sats = satoshis(request)?;
        Ok(Self::provider(cx)?.send_bitcoin(&request.to, sats, None).await?)
    }

    async fn sign(&self, cx: &ProviderContext<'_>, message: &str) -> Result<String> {
        Ok(Self::provider(cx)?.sign_message(message).await?)
    }

    async fn switch_chain(
        &self,
        cx: &ProviderContext<'_>,
        chain: &str,
        _add_chain: Option<&AddChainParameter>,
    ) -> Result<()> {
        Ok(Self::provider(cx)?.switch_network(chain).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExplorerConfig;

    #[test]
    fn test_format_sats() {
        let family = UtxoFamily::new(ExplorerConfig::default()).unwrap();
        assert_eq!(family.format_sats(123_456_789), "1.23456789");
        assert_eq!(family.format_sats(0), "0.00000000");

        let family = UtxoFamily::new(ExplorerConfig::default().fraction_digits(2)).unwrap();
        assert_eq!(family.format_sats(123_456_789), "1.23");
        assert_eq!(family.format_sats(99_500_000), "1.00");
    }

    #[test]
    fn test_satoshis() {
        assert_eq!(satoshis(&TransferRequest::new("1500", "bc1q")).unwrap(), 1500);
        assert_eq!(
            satoshis(&TransferRequest::new("0.001", "bc1q").unit("BTC")).unwrap(),
            100_000
        );
        assert!(satoshis(&TransferRequest::new("1.5", "bc1q")).is_err());
    }
}
