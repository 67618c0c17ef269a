//! Integration tests for the broadcast dispatcher.
//!
//! - `harness.rs`      - Recording mocks for every collaborator plus `TestHarness`
//! - `key_login.rs`    - Local key logins, ad-hoc keys for active operations
//! - `delegation.rs`   - Delegated posting authority and the upgrade flow
//! - `signers.rs`      - Keychain timeout, HiveAuth limits, HiveSigner tokens
//! - `side_effects.rs` - Activity recording and cache invalidation ordering

pub(crate) mod harness;
mod signers;
