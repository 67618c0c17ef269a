//! Keychain timeout, HiveAuth authority limits, HiveSigner tokens.

use super::harness::{ExtensionMode, TestHarness};
use crate::{reblog, vote, BroadcastError, BroadcastRequest, Operation, PlatformAdapter};
use serde_json::json;
use session_storage::{Authority, CredentialRecord, LoginType};
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn keychain_silence_times_out_after_sixty_seconds() {
    let h = TestHarness::new();
    h.login("alice", LoginType::Keychain);
    h.extension.set_mode(ExtensionMode::Silent);
    let started = tokio::time::Instant::now();

    let err = h
        .dispatcher
        .broadcast("alice", vote("alice", "bob", "hello", 10000))
        .await
        .unwrap_err();

    assert!(matches!(err, BroadcastError::ExtensionTimeout(d) if d == Duration::from_secs(60)));
    assert!(err.is_timeout());
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert!(h.activity.recorded.lock().is_empty());
    assert!(h.cache.invalidated().is_empty());

    // Late approval reaches the chain mock but not the finished call.
    assert_eq!(h.extension.release_held(), 0);
    assert!(h.activity.recorded.lock().is_empty());
    assert!(h.cache.invalidated().is_empty());
}

#[tokio::test]
async fn keychain_rejection_is_not_a_timeout() {
    let h = TestHarness::new();
    h.login("alice", LoginType::Keychain);
    h.extension.set_mode(ExtensionMode::Reject);

    let err = h
        .dispatcher
        .broadcast("alice", vote("alice", "bob", "hello", 10000))
        .await
        .unwrap_err();

    assert!(matches!(err, BroadcastError::Extension(_)));
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn keychain_missing_extension_fails_fast() {
    let h = TestHarness::new();
    h.login("alice", LoginType::Keychain);
    h.extension.available.store(false, Ordering::SeqCst);

    let err = h
        .dispatcher
        .broadcast("alice", reblog("alice", "bob", "hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, BroadcastError::ExtensionMissing));
    assert!(h.extension.requests.lock().is_empty());
}

#[tokio::test]
async fn keychain_signs_with_inferred_key_type() {
    let h = TestHarness::new();
    h.login("alice", LoginType::Keychain);

    let outcome = h
        .dispatcher
        .broadcast("alice", reblog("alice", "bob", "hello"))
        .await
        .unwrap();

    assert_eq!(outcome.signer, LoginType::Keychain);
    assert_eq!(
        *h.extension.requests.lock(),
        vec![("alice".to_string(), Authority::Posting)]
    );
}

#[tokio::test]
async fn hiveauth_rejects_owner_operations_without_contacting_session() {
    let h = TestHarness::new();
    h.login("alice", LoginType::HiveAuth);

    let request = BroadcastRequest::new(
        vec![Operation::new(
            "change_recovery_account",
            json!({ "account_to_recover": "alice", "new_recovery_account": "bob" }),
        )],
        "Change recovery account",
    );
    let err = h.dispatcher.broadcast("alice", request).await.unwrap_err();

    assert!(matches!(
        err,
        BroadcastError::UnsupportedAuthority {
            backend: LoginType::HiveAuth,
            authority: Authority::Owner,
        }
    ));
    assert!(h.mobile.calls.lock().is_empty());
    assert_eq!(h.broadcast_count(), 0);
}

#[tokio::test]
async fn hiveauth_rejects_memo_override() {
    let h = TestHarness::new();
    h.login("alice", LoginType::HiveAuth);

    let request = vote("alice", "bob", "hello", 100).with_authority(Authority::Memo);
    let err = h.dispatcher.broadcast("alice", request).await.unwrap_err();

    assert!(matches!(err, BroadcastError::UnsupportedAuthority { .. }));
    assert!(h.mobile.calls.lock().is_empty());
}

#[tokio::test]
async fn hivesigner_refreshes_expired_token_before_relaying() {
    let h = TestHarness::new();
    let record = CredentialRecord::new("alice", "alice-stale")
        .with_login_type(LoginType::HiveSigner)
        .with_refresh_token("alice-refresh")
        .with_expiry(3600, 0);
    h.store.set(&record).unwrap();

    let outcome = h
        .dispatcher
        .broadcast("alice", vote("alice", "bob", "hello", 10000))
        .await
        .unwrap();

    assert_eq!(outcome.signer, LoginType::HiveSigner);
    assert_eq!(h.relay.tokens_used(), vec!["alice-refreshed".to_string()]);
    assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.activity.recorded.lock()[0].0, "alice-refreshed");
}

#[tokio::test]
async fn relay_without_session_is_not_logged_in() {
    let h = TestHarness::new();
    let ops = vec![Operation::new("vote", json!({ "voter": "ghost" }))];

    let err = h
        .platform
        .broadcast_with_token("ghost", &ops)
        .await
        .unwrap_err();

    assert!(matches!(err, BroadcastError::NotLoggedIn(ref name) if name == "ghost"));
    assert!(h.relay.calls.lock().is_empty());
}
