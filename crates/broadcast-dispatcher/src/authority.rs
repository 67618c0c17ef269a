//! Authority inference for operation sets.

use crate::Operation;
use session_storage::Authority;
use tracing::debug;

const POSTING_OPS: &[&str] = &[
    "vote",
    "comment",
    "comment_options",
    "delete_comment",
    "claim_reward_balance",
];

const OWNER_OPS: &[&str] = &[
    "change_recovery_account",
    "request_account_recovery",
    "recover_account",
];

/// Authority a single operation requires.
///
/// Unrecognized kinds fall back to `Active`.
pub fn authority_for(op: &Operation) -> Authority {
    let kind = op.kind();

    if POSTING_OPS.contains(&kind) {
        return Authority::Posting;
    }
    if OWNER_OPS.contains(&kind) {
        return Authority::Owner;
    }

    match kind {
        "custom_json" => {
            let has_active_signers = op
                .body()
                .get("required_auths")
                .and_then(|v| v.as_array())
                .is_some_and(|auths| !auths.is_empty());
            if has_active_signers {
                Authority::Active
            } else {
                Authority::Posting
            }
        }
        "account_update" | "account_update2" => {
            if op.body().get("owner").is_some_and(|v| !v.is_null()) {
                Authority::Owner
            } else {
                Authority::Active
            }
        }
        "transfer"
        | "transfer_to_vesting"
        | "withdraw_vesting"
        | "delegate_vesting_shares"
        | "transfer_to_savings"
        | "transfer_from_savings"
        | "convert"
        | "limit_order_create"
        | "limit_order_cancel"
        | "account_witness_vote"
        | "account_witness_proxy" => Authority::Active,
        other => {
            debug!(kind = %other, "Unrecognized operation kind, requiring active authority");
            Authority::Active
        }
    }
}

/// Strongest authority needed by any operation in `ops`.
pub fn required_authority(ops: &[Operation]) -> Authority {
    ops.iter()
        .map(authority_for)
        .max()
        .unwrap_or(Authority::Posting)
}
