//! Keychain browser extension signer.
//!
//! The extension exposes a callback API. Each request is bridged to a future
//! through a single-settlement channel bounded by the configured timeout.

use crate::settle::{await_settlement, single_settlement, SettlementOutcome};
use crate::{BroadcastError, BroadcastResult, Operation, TxConfirmation};
use serde::{Deserialize, Serialize};
use session_storage::Authority;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

/// Response delivered to an extension callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<TxConfirmation>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExtensionResponse {
    pub fn ok(result: TxConfirmation) -> Self {
        Self {
            success: true,
            result: Some(result),
            message: None,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            message: Some(message.into()),
            error: None,
        }
    }

    fn into_result(self) -> BroadcastResult<TxConfirmation> {
        if !self.success {
            let reason = self
                .message
                .or(self.error)
                .unwrap_or_else(|| "request was not approved".to_string());
            return Err(BroadcastError::Extension(reason));
        }
        self.result.ok_or_else(|| {
            BroadcastError::Extension("extension returned no transaction".to_string())
        })
    }
}

/// Completion callback handed to the extension. Returns `false` when the
/// request had already settled and the response was dropped.
pub type ExtensionCallback = Box<dyn FnOnce(ExtensionResponse) -> bool + Send + 'static>;

/// Transfer request in the extension's dedicated transfer form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    /// Amount with precision and symbol, e.g. `1.000 HIVE`.
    pub amount: String,
    pub memo: String,
    /// Lock the sender to `from` in the extension UI.
    pub enforce: bool,
}

/// Callback-style extension API.
pub trait ExtensionBridge: Send + Sync {
    /// Whether the extension is installed and reachable.
    fn is_available(&self) -> bool;

    fn request_broadcast(
        &self,
        username: &str,
        operations: &[Operation],
        key_type: Authority,
        callback: ExtensionCallback,
    );

    fn request_transfer(&self, request: &TransferRequest, callback: ExtensionCallback);
}

/// Broadcast through the extension, failing with `ExtensionTimeout` if no
/// callback arrives within `timeout`.
pub async fn broadcast_with_keychain(
    bridge: &dyn ExtensionBridge,
    username: &str,
    operations: &[Operation],
    key_type: Authority,
    timeout: Duration,
) -> BroadcastResult<TxConfirmation> {
    if !bridge.is_available() {
        return Err(BroadcastError::ExtensionMissing);
    }

    let request_id = Uuid::new_v4();
    debug!(
        %request_id,
        username = %username,
        key_type = %key_type,
        operations = operations.len(),
        "Requesting Keychain broadcast"
    );

    let (callback, rx) = settle_callback(request_id);
    bridge.request_broadcast(username, operations, key_type, callback);
    wait_for_response(rx, timeout, request_id).await
}

/// Transfer through the extension's transfer API.
pub async fn transfer_with_keychain(
    bridge: &dyn ExtensionBridge,
    request: &TransferRequest,
    timeout: Duration,
) -> BroadcastResult<TxConfirmation> {
    if !bridge.is_available() {
        return Err(BroadcastError::ExtensionMissing);
    }

    let request_id = Uuid::new_v4();
    debug!(%request_id, from = %request.from, to = %request.to, "Requesting Keychain transfer");

    let (callback, rx) = settle_callback(request_id);
    bridge.request_transfer(request, callback);
    wait_for_response(rx, timeout, request_id).await
}

fn settle_callback(request_id: Uuid) -> (ExtensionCallback, oneshot::Receiver<ExtensionResponse>) {
    let (settlement, rx) = single_settlement();
    let callback: ExtensionCallback = Box::new(move |response| {
        let delivered = settlement.settle(response);
        if !delivered {
            debug!(%request_id, "Ignoring late Keychain response");
        }
        delivered
    });
    (callback, rx)
}

async fn wait_for_response(
    rx: oneshot::Receiver<ExtensionResponse>,
    timeout: Duration,
    request_id: Uuid,
) -> BroadcastResult<TxConfirmation> {
    match await_settlement(rx, timeout).await {
        SettlementOutcome::Settled(response) => response.into_result(),
        SettlementOutcome::TimedOut => {
            warn!(%request_id, timeout_secs = timeout.as_secs(), "Keychain request timed out");
            Err(BroadcastError::ExtensionTimeout(timeout))
        }
        SettlementOutcome::Abandoned => Err(BroadcastError::Extension(
            "extension dropped the request without responding".to_string(),
        )),
    }
}
