//! HiveAuth mobile-session signer.

use crate::{BroadcastError, BroadcastResult, Operation, TxConfirmation};
use async_trait::async_trait;
use session_storage::{Authority, LoginType};
use tracing::warn;

/// Signs through a paired mobile wallet session.
#[async_trait]
pub trait MobileSessionSigner: Send + Sync {
    async fn broadcast(
        &self,
        username: &str,
        operations: &[Operation],
        key_type: Authority,
    ) -> BroadcastResult<TxConfirmation>;
}

/// Broadcast through HiveAuth. Only posting and active are signable; other
/// authorities are rejected before the session is looked at, so the
/// authority mismatch wins over a missing session.
pub async fn broadcast_with_hive_auth(
    signer: Option<&dyn MobileSessionSigner>,
    username: &str,
    operations: &[Operation],
    key_type: Authority,
) -> BroadcastResult<TxConfirmation> {
    match key_type {
        Authority::Posting | Authority::Active => {
            let signer = signer.ok_or(BroadcastError::MobileSessionUnavailable)?;
            signer.broadcast(username, operations, key_type).await
        }
        Authority::Owner | Authority::Memo => {
            warn!(username = %username, authority = %key_type, "HiveAuth cannot sign this authority");
            Err(BroadcastError::UnsupportedAuthority {
                backend: LoginType::HiveAuth,
                authority: key_type,
            })
        }
    }
}
