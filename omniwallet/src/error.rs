//! Unified error types for omniwallet.
//!
//! Errors fall into three groups:
//! - domain wallet errors (a numeric code plus message reported by the wallet itself)
//! - native provider errors, passed through unchanged apart from the few codes
//!   that need special handling (user rejection, unknown chain)
//! - local failures (storage, configuration, malformed responses)
//!
//! Explorer transport errors never reach this type: they are downgraded to a
//! zero value where they occur.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type alias for omniwallet operations.
pub type Result<T> = std::result::Result<T, WalletError>;

/// EIP-1193 code for a request the user rejected.
pub const USER_REJECTED_CODE: i64 = 4001;

/// EIP-1193 / EIP-3326 code for a chain the wallet does not know.
pub const UNKNOWN_CHAIN_CODE: i64 = 4902;

/// The main error type for wallet operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WalletError {
    /// Application-level failure reported by the wallet.
    #[error("wallet error {code}: {message}")]
    Wallet {
        /// Wallet-specific error code.
        code: i64,
        /// Human readable message.
        message: String,
    },

    /// Raw error from an injected provider.
    #[error("provider: {0}")]
    Provider(#[from] ProviderError),

    /// The user declined the connection or request.
    #[error("user rejected the request to {wallet}")]
    UserRejected {
        /// Name of the wallet plugin that was asked.
        wallet: String,
    },

    /// The wallet does not know the requested chain.
    #[error("unknown chain {chain}")]
    UnknownChain {
        /// Chain id that was requested.
        chain: String,
    },

    /// The provider object is not injected into the host.
    #[error("{0} is not installed")]
    NotInstalled(String),

    /// The operation needs a connected account.
    #[error("{0} is not connected")]
    NotConnected(String),

    /// A disconnect happened while a connect request was in flight.
    #[error("connect to {0} was cancelled by a disconnect")]
    Superseded(String),

    /// Neither the requested name nor any injected provider matched a plugin.
    #[error("not matched to injected wallet plugin")]
    NoMatchingPlugin,

    /// The chain family does not implement this capability.
    #[error("{operation} is not supported by {wallet}")]
    Unsupported {
        /// Wallet plugin name.
        wallet: String,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// The provider answered with something we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// An address argument could not be parsed.
    #[error("invalid address {0}")]
    InvalidAddress(String),

    /// Amount or unit conversion failed.
    #[error("units: {0}")]
    Units(String),

    /// Persistence backend failure.
    #[error("storage: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("config: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
}

impl WalletError {
    /// Create a domain wallet error.
    #[must_use]
    pub fn wallet(code: i64, message: impl Into<String>) -> Self {
        Self::Wallet {
            code,
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    #[must_use]
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create an unsupported-operation error.
    #[must_use]
    pub fn unsupported(wallet: impl Into<String>, operation: &'static str) -> Self {
        Self::Unsupported {
            wallet: wallet.into(),
            operation,
        }
    }

    /// Create a storage error.
    #[must_use]
    pub fn storage(msg: impl fmt::Display) -> Self {
        Self::Storage(msg.to_string())
    }

    /// Whether this is a user rejection, either mapped or still raw.
    #[must_use]
    pub fn is_user_rejected(&self) -> bool {
        match self {
            Self::UserRejected { .. } => true,
            Self::Provider(e) => e.code == USER_REJECTED_CODE,
            _ => false,
        }
    }

    /// Whether this reports an unknown chain, either mapped or still raw.
    #[must_use]
    pub fn is_unknown_chain(&self) -> bool {
        match self {
            Self::UnknownChain { .. } => true,
            Self::Provider(e) => e.is_unknown_chain(),
            _ => false,
        }
    }

    /// The numeric code carried by domain or provider errors.
    #[must_use]
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::Wallet { code, .. } => Some(*code),
            Self::Provider(e) => Some(e.code),
            Self::UserRejected { .. } => Some(USER_REJECTED_CODE),
            Self::UnknownChain { .. } => Some(UNKNOWN_CHAIN_CODE),
            _ => None,
        }
    }
}

/// Error object returned by an injected provider.
///
/// Mirrors the EIP-1193 `ProviderRpcError` shape so that mock and real
/// providers can round-trip it as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct ProviderError {
    /// Numeric error code.
    pub code: i64,
    /// Message from the provider.
    pub message: String,
    /// Optional extra payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ProviderError {
    /// Create a provider error.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create the EIP-1193 user rejection error.
    #[must_use]
    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED_CODE, "User rejected the request.")
    }

    /// Whether the provider reports an unrecognized chain.
    ///
    /// Some wallets use the dedicated code, others only mention the add-chain
    /// method in the message.
    #[must_use]
    pub fn is_unknown_chain(&self) -> bool {
        self.code == UNKNOWN_CHAIN_CODE || self.message.contains("wallet_addEthereumChain")
    }
}
