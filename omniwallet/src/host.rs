//! The host environment wallet extensions inject themselves into.
//!
//! In a browser this is `window`: a global namespace holding the injected
//! provider objects, a `postMessage` channel, and the user prompts used by
//! the install and connect flows.

use std::sync::Arc;

use crate::provider::{
    Eip1193Provider, NativeListener, NativeListenerId, TronLinkProvider, UnisatProvider,
};

/// A provider object found under an injected key.
#[derive(Clone)]
pub enum Injected {
    /// EIP-1193 compatible object.
    Eip1193(Arc<dyn Eip1193Provider>),
    /// UniSat-style Bitcoin object.
    Unisat(Arc<dyn UnisatProvider>),
    /// TronLink object.
    TronLink(Arc<dyn TronLinkProvider>),
}

impl Injected {
    /// Short label of the native API shape.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Eip1193(_) => "eip1193",
            Self::Unisat(_) => "unisat",
            Self::TronLink(_) => "tronlink",
        }
    }
}

impl std::fmt::Debug for Injected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Injected").field(&self.kind()).finish()
    }
}

/// Host environment.
pub trait Host: Send + Sync {
    /// Origin used to namespace persisted keys (e.g. `location.host`).
    fn origin(&self) -> String;

    /// Look up the object injected under `key`.
    fn injected(&self, key: &str) -> Option<Injected>;

    /// Whether anything is injected under `key`.
    fn is_injected(&self, key: &str) -> bool {
        self.injected(key).is_some()
    }

    /// Ask the user a yes/no question.
    fn confirm(&self, message: &str) -> bool;

    /// Show a message to the user.
    fn alert(&self, message: &str);

    /// Open a URL in a new tab.
    fn open_url(&self, url: &str);

    /// Listen to `postMessage` traffic; the listener receives `event.data`.
    fn add_message_listener(&self, listener: NativeListener) -> NativeListenerId;

    /// Stop listening.
    fn remove_message_listener(&self, id: NativeListenerId);
}
