//! Broadcast layer for Hive operations.
//!
//! This crate provides:
//! - Authority inference for operation sets
//! - Signer backends: local key, Keychain extension, HiveAuth mobile session,
//!   HiveSigner OAuth relay
//! - A platform adapter that owns those backends plus the activity recorder
//!   and query-cache gateway
//! - An FSM-driven dispatcher with the delegated-posting upgrade flow

mod activity;
mod authority;
mod broadcast_fsm;
mod cache;
mod chain;
mod dispatcher;
mod error;
mod hiveauth;
mod keychain;
mod mutations;
mod operation;
mod platform;
mod relay;
mod settle;
mod signer;

#[cfg(test)]
mod tests;

pub use activity::{ActivityKind, ActivityRecorder, HttpActivityRecorder, ACTIVITY_PATH};
pub use authority::{authority_for, required_authority};
pub use broadcast_fsm::broadcast_machine;
pub use broadcast_fsm::{BroadcastMachine, BroadcastMachineInput, BroadcastMachineState, BroadcastState};
pub use cache::{
    CacheInvalidationGateway, InvalidationTarget, MemoryQueryCache, QueryCache, QueryKey,
    QueryPredicate,
};
pub use chain::{
    grant_posting_operation, Account, AccountReader, AuthorityDef, HttpAccountReader,
    KeyBroadcaster,
};
pub use dispatcher::{BroadcastDispatcher, BroadcastOutcome};
pub use error::{BroadcastError, BroadcastResult};
pub use hiveauth::{broadcast_with_hive_auth, MobileSessionSigner};
pub use keychain::{
    broadcast_with_keychain, transfer_with_keychain, ExtensionBridge, ExtensionCallback,
    ExtensionResponse, TransferRequest,
};
pub use mutations::{
    comment, reblog, transfer, vote, BroadcastRequest, CommentOptions, CommentPayload,
};
pub use operation::{Operation, TxConfirmation};
pub use platform::{AuthUpgradePrompt, PlatformAdapter, PlatformServices, WebPlatform};
pub use relay::{HttpOAuthRelay, OAuthRelay};
pub use settle::{await_settlement, single_settlement, SettlementOutcome, SingleSettlement};
pub use signer::{KeyLookup, Signer};

pub use session_storage::{Authority, LoginType};
