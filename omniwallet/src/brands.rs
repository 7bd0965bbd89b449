//! The built-in wallet brands.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chains::{EvmFamily, TronFamily, UtxoFamily};
use crate::config::ExplorerConfig;
use crate::error::Result;
use crate::plugin::{ChainFamily, PluginInfo};

/// A supported wallet brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Brand {
    /// MetaMask, injected as `ethereum`.
    MetaMask,
    /// OKX Wallet, injected as `okxwallet`.
    OkxWallet,
    /// Coinbase Wallet extension.
    CoinbaseWallet,
    /// UniSat Bitcoin wallet.
    UniSatWallet,
    /// TronLink.
    TronLink,
}

impl Brand {
    /// Every brand, in default registration order.
    pub const ALL: [Self; 5] = [
        Self::MetaMask,
        Self::OkxWallet,
        Self::CoinbaseWallet,
        Self::UniSatWallet,
        Self::TronLink,
    ];

    /// Plugin name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MetaMask => "MetaMask",
            Self::OkxWallet => "OkxWallet",
            Self::CoinbaseWallet => "CoinbaseWallet",
            Self::UniSatWallet => "UniSatWallet",
            Self::TronLink => "TronLink",
        }
    }

    /// Plugin identity with install and documentation links.
    #[must_use]
    pub fn info(self) -> PluginInfo {
        let (key, install, docs) = match self {
            Self::MetaMask => (
                "ethereum",
                "https://chrome.google.com/webstore/detail/metamask/nkbihfbeogaeaoehlefnkodbefgpgknn",
                "https://docs.metamask.io/guide/rpc-api.html#table-of-contents",
            ),
            Self::OkxWallet => (
                "okxwallet",
                "https://chrome.google.com/webstore/detail/okx-wallet/mcohilncbfahbmgdjkbpemcciiolgcge",
                "https://www.okx.com/cn/web3/build/docs/sdks/chains/evm/introduce",
            ),
            Self::CoinbaseWallet => (
                "coinbaseWalletExtension",
                "https://chromewebstore.google.com/detail/coinbase-wallet-extension/hnfanknocfeofbddgcijnmhnfnkdnaad?hl=en",
                "https://docs.cloud.coinbase.com/wallet-sdk/docs/injected-provider",
            ),
            Self::UniSatWallet => (
                "unisat",
                "https://chromewebstore.google.com/detail/unisat-wallet/ppbibelpcjmhbdihakflkdcoccbgbkpo",
                "https://docs.unisat.io/dev/unisat-developer-service/unisat-wallet",
            ),
            Self::TronLink => (
                "tronLink",
                "https://chromewebstore.google.com/detail/tronlink/ibnejdfjmmkpcnlpebklmnkoeoihofec",
                "https://docs.tronlink.org/dapp/start-developing",
            ),
        };
        PluginInfo::new(self.name(), key, install).docs_url(docs)
    }

    /// Strategy for this brand.
    ///
    /// # Errors
    ///
    /// Only UniSat can fail, when its explorer HTTP client cannot be built.
    pub fn family(self, explorer: &ExplorerConfig) -> Result<Arc<dyn ChainFamily>> {
        Ok(match self {
            Self::MetaMask | Self::OkxWallet => Arc::new(EvmFamily::new()),
            Self::CoinbaseWallet => Arc::new(EvmFamily::new().with_message_bridge()),
            Self::UniSatWallet => Arc::new(UtxoFamily::new(explorer.clone())?),
            Self::TronLink => Arc::new(TronFamily::new()),
        })
    }
}

impl std::fmt::Display for Brand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::FamilyKind;

    #[test]
    fn test_brand_info() {
        let info = Brand::MetaMask.info();
        assert_eq!(info.name, "MetaMask");
        assert_eq!(info.injected_key, "ethereum");
        assert!(info.docs_url.is_some());

        assert_eq!(Brand::CoinbaseWallet.info().injected_key, "coinbaseWalletExtension");
        assert_eq!(Brand::TronLink.to_string(), "TronLink");
    }

    #[test]
    fn test_brand_families() {
        let explorer = ExplorerConfig::default();
        let kinds: Vec<FamilyKind> = Brand::ALL
            .iter()
            .map(|b| b.family(&explorer).unwrap().kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                FamilyKind::Evm,
                FamilyKind::Evm,
                FamilyKind::Evm,
                FamilyKind::Utxo,
                FamilyKind::Tron
            ]
        );
    }
}
