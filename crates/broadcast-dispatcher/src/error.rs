//! Broadcast error types.

use session_storage::{Authority, LoginType};
use std::time::Duration;
use thiserror::Error;

/// Why a broadcast did not complete.
///
/// Each variant names the point of failure so the caller can render an
/// actionable message.
#[derive(Error, Debug)]
pub enum BroadcastError {
    /// User dismissed the authority upgrade prompt
    #[error("Broadcast cancelled")]
    Cancelled,

    /// No browser extension signer detected
    #[error("Keychain extension is not installed")]
    ExtensionMissing,

    /// Extension never called back
    #[error("Keychain did not respond within {}s", .0.as_secs())]
    ExtensionTimeout(Duration),

    /// Extension reported a failure
    #[error("Keychain rejected the request: {0}")]
    Extension(String),

    /// No HiveAuth session is configured
    #[error("HiveAuth session is not available")]
    MobileSessionUnavailable,

    /// HiveAuth reported a failure
    #[error("HiveAuth error: {0}")]
    MobileSession(String),

    /// Key login without the key this authority needs
    #[error("No {authority} key stored for @{username}")]
    MissingKey {
        username: String,
        authority: Authority,
    },

    /// Backend cannot sign with the requested authority
    #[error("{backend} does not support {authority} authority")]
    UnsupportedAuthority {
        backend: LoginType,
        authority: Authority,
    },

    /// No access token for the OAuth relay
    #[error("@{0} is not logged in")]
    NotLoggedIn(String),

    /// Account lookup returned nothing
    #[error("Account @{0} not found")]
    AccountNotFound(String),

    /// OAuth relay rejected the broadcast
    #[error("HiveSigner error: {0}")]
    Relay(String),

    /// JSON-RPC node returned an error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Local key signing or submission failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Malformed request (e.g. no operations)
    #[error("Invalid broadcast request: {0}")]
    InvalidRequest(String),

    /// Invalid state transition in the broadcast FSM
    #[error("Invalid broadcast state transition: {0}")]
    InvalidStateTransition(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl BroadcastError {
    /// Returns true for failures the user can resolve (install the extension,
    /// log in, pick another signer) as opposed to transport failures.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            BroadcastError::Cancelled
                | BroadcastError::ExtensionMissing
                | BroadcastError::ExtensionTimeout(_)
                | BroadcastError::MobileSessionUnavailable
                | BroadcastError::MissingKey { .. }
                | BroadcastError::UnsupportedAuthority { .. }
                | BroadcastError::NotLoggedIn(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BroadcastError::ExtensionTimeout(_))
    }
}

/// Result type alias using BroadcastError.
pub type BroadcastResult<T> = Result<T, BroadcastError>;
