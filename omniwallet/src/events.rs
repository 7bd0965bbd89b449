//! Domain events published by wallet plugins.
//!
//! Every chain family maps its native events (EIP-1193 listeners, custom
//! `on`/`off` emitters, `postMessage` bridges) into this small set so that
//! subscribers never deal with brand-specific payloads.

use serde::{Deserialize, Serialize};

/// Names under which domain events are subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventName {
    /// The active account list changed.
    AccountsChanged,
    /// The active network changed.
    ChainChanged,
    /// A plugin finished connecting.
    Connected,
    /// A plugin disconnected.
    Disconnected,
    /// A transaction was submitted through a plugin.
    OnTransaction,
}

impl EventName {
    /// Wire name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::OnTransaction => "onTransaction",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Plugin that submitted the transaction.
    pub wallet: String,
    /// Transaction hash or id as returned by the provider.
    pub hash: String,
    /// Sender account.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Token contract, `None` for the native currency.
    pub token: Option<String>,
}

/// A normalized wallet event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum DomainEvent {
    /// New account addresses, first is active.
    AccountsChanged(Vec<String>),
    /// Canonical network id.
    ChainChanged(String),
    /// Account that was connected.
    Connected(String),
    /// Last known account before disconnecting.
    Disconnected(String),
    /// Transaction lifecycle notification.
    #[serde(rename = "onTransaction")]
    Transaction(TransactionEvent),
}

impl DomainEvent {
    /// The name subscribers use for this event.
    #[must_use]
    pub const fn name(&self) -> EventName {
        match self {
            Self::AccountsChanged(_) => EventName::AccountsChanged,
            Self::ChainChanged(_) => EventName::ChainChanged,
            Self::Connected(_) => EventName::Connected,
            Self::Disconnected(_) => EventName::Disconnected,
            Self::Transaction(_) => EventName::OnTransaction,
        }
    }
}

/// A domain event tagged with the plugin that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEvent {
    /// Plugin name.
    pub wallet: String,
    /// The event itself.
    #[serde(flatten)]
    pub event: DomainEvent,
}

impl WalletEvent {
    /// Tag an event with its source plugin.
    pub fn new(wallet: impl Into<String>, event: DomainEvent) -> Self {
        Self {
            wallet: wallet.into(),
            event,
        }
    }

    /// Shortcut for the event name.
    #[must_use]
    pub const fn name(&self) -> EventName {
        self.event.name()
    }
}
