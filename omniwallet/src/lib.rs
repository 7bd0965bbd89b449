//! Omniwallet - one connection, account and event contract over the wallet
//! extensions a host page may have injected.
//!
//! EVM wallets speak EIP-1193, UniSat has its own method set and TronLink
//! reports changes through `postMessage`. Each brand becomes a
//! [`WalletPlugin`](plugin::WalletPlugin) with the same state machine and the
//! same domain events, and a [`WalletProvider`](facade::WalletProvider) gives a
//! UI one handle plus a version counter to re-render on.
//!
//! # Architecture
//!
//! - **Context** ([`context`]) - host, storage, event bus, version counter and
//!   plugin registry for one process
//! - **Plugins** ([`plugin`]) - per-brand connection state machine and native
//!   event normalization
//! - **Chains** ([`chains`]) - EVM, UTXO and Tron strategies behind
//!   [`ChainFamily`](plugin::ChainFamily)
//! - **Bus** ([`bus`]) - domain event publish/subscribe
//! - **Facade** ([`facade`]) - snapshot, connect/disconnect and version watch
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use omniwallet::prelude::*;
//!
//! let cx = WalletContext::with_default_plugins(host)?;
//! let wallet = WalletProvider::new(cx, WalletProviderConfig::default());
//! let account = wallet.connect(Some("MetaMask")).await?;
//! let snapshot = wallet.snapshot();
//! ```

pub mod brands;
pub mod bus;
pub mod chains;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod facade;
pub mod host;
pub mod plugin;
pub mod provider;
pub mod registry;
pub mod storage;
pub mod units;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, WalletError};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::brands::Brand;
    pub use crate::bus::{EventBus, ListenerId};
    pub use crate::chains::{EvmFamily, TronFamily, UtxoFamily};
    pub use crate::config::{ExplorerConfig, HttpClientConfig, WalletProviderConfig};
    pub use crate::context::WalletContext;
    pub use crate::error::{ProviderError, Result, WalletError};
    pub use crate::events::{DomainEvent, EventName, TransactionEvent, WalletEvent};
    pub use crate::facade::{WalletProvider, WalletSnapshot};
    pub use crate::host::{Host, Injected};
    pub use crate::plugin::{
        AddChainParameter, AssetInfo, BalanceQuery, ChainFamily, FamilyKind, PluginInfo, Status,
        TransferRequest, WalletPlugin,
    };
    pub use crate::provider::{
        Eip1193Provider, EventEmitter, RequestArguments, TronLinkProvider, UnisatProvider,
    };
    pub use crate::storage::{FileStorage, MemoryStorage, Storage};
}
