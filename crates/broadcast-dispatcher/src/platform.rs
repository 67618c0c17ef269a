//! Platform adapter: signer backends, key access, upgrade prompt, activity
//! and cache side effects behind one interface.

use crate::activity::{ActivityKind, ActivityRecorder};
use crate::cache::{CacheInvalidationGateway, InvalidationTarget};
use crate::chain::{grant_posting_operation, AccountReader, KeyBroadcaster};
use crate::hiveauth::{self, MobileSessionSigner};
use crate::keychain::{self, ExtensionBridge};
use crate::relay::OAuthRelay;
use crate::{BroadcastError, BroadcastResult, KeyLookup, Operation, Signer, TxConfirmation};
use async_trait::async_trait;
use session_config_and_utils::Config;
use session_storage::{Authority, CredentialRecord, LoginType};
use std::sync::Arc;
use std::time::Duration;
use token_lifecycle::TokenManager;
use tracing::{debug, info, warn};

/// Asks the user how to sign an operation the current login cannot.
#[async_trait]
pub trait AuthUpgradePrompt: Send + Sync {
    /// `None` means the user dismissed the prompt.
    async fn choose(&self, required: Authority, operation: &str) -> Option<Signer>;
}

/// Everything the dispatcher needs from the host platform.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Login type usable for `authority`, or `None` if the user must upgrade.
    fn get_login_type(&self, username: &str, authority: Option<Authority>) -> Option<LoginType>;

    fn get_posting_key(&self, username: &str) -> KeyLookup;
    fn get_active_key(&self, username: &str) -> KeyLookup;
    fn get_owner_key(&self, username: &str) -> KeyLookup;
    fn get_memo_key(&self, username: &str) -> KeyLookup;

    fn key_for(&self, username: &str, authority: Authority) -> KeyLookup {
        match authority {
            Authority::Posting => self.get_posting_key(username),
            Authority::Active => self.get_active_key(username),
            Authority::Owner => self.get_owner_key(username),
            Authority::Memo => self.get_memo_key(username),
        }
    }

    async fn broadcast_with_key(
        &self,
        username: &str,
        operations: &[Operation],
        private_key: &str,
    ) -> BroadcastResult<TxConfirmation>;

    async fn broadcast_with_keychain(
        &self,
        username: &str,
        operations: &[Operation],
        key_type: Authority,
    ) -> BroadcastResult<TxConfirmation>;

    async fn broadcast_with_hive_auth(
        &self,
        username: &str,
        operations: &[Operation],
        key_type: Authority,
    ) -> BroadcastResult<TxConfirmation>;

    /// Relay through HiveSigner with the user's access token.
    async fn broadcast_with_token(
        &self,
        username: &str,
        operations: &[Operation],
    ) -> BroadcastResult<TxConfirmation>;

    /// Whether the delegate account already holds posting authority.
    async fn has_posting_authorization(&self, username: &str) -> BroadcastResult<bool>;

    async fn show_auth_upgrade_ui(&self, required: Authority, operation: &str) -> Option<Signer>;

    /// Add the delegate to the posting authority, signing with `via`.
    async fn grant_posting_authority(&self, username: &str, via: &Signer) -> BroadcastResult<()>;

    /// Best effort; failures are logged, never returned.
    async fn record_activity(
        &self,
        username: &str,
        activity: ActivityKind,
        block_num: u64,
        tx_id: &str,
    );

    async fn invalidate_queries(&self, entries: Vec<Option<InvalidationTarget>>);
}

/// Collaborators injected into [`WebPlatform`].
pub struct PlatformServices {
    pub tokens: Arc<TokenManager>,
    pub accounts: Arc<dyn AccountReader>,
    pub key_broadcaster: Arc<dyn KeyBroadcaster>,
    pub extension: Option<Arc<dyn ExtensionBridge>>,
    pub mobile_session: Option<Arc<dyn MobileSessionSigner>>,
    pub relay: Arc<dyn OAuthRelay>,
    pub upgrade_prompt: Arc<dyn AuthUpgradePrompt>,
    pub activity: Arc<dyn ActivityRecorder>,
    pub cache: CacheInvalidationGateway,
}

/// Platform adapter backed by the credential store.
pub struct WebPlatform {
    services: PlatformServices,
    delegate_account: String,
    keychain_timeout: Duration,
}

impl WebPlatform {
    pub fn new(services: PlatformServices, config: &Config) -> Self {
        Self {
            services,
            delegate_account: config.delegate_account.clone(),
            keychain_timeout: config.keychain_timeout(),
        }
    }

    pub fn delegate_account(&self) -> &str {
        &self.delegate_account
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.services.tokens
    }

    fn record(&self, username: &str) -> Option<CredentialRecord> {
        match self.services.tokens.store().get(username) {
            Ok(record) => record,
            Err(e) => {
                warn!(username = %username, error = %e, "Failed to read credentials");
                None
            }
        }
    }

    fn lookup_key(&self, username: &str, authority: Authority) -> KeyLookup {
        let Some(record) = self.record(username) else {
            return KeyLookup::Absent;
        };
        match record.login_type {
            Some(LoginType::Key) => record
                .key_for(authority)
                .map(|key| KeyLookup::Found(key.to_string()))
                .unwrap_or(KeyLookup::Absent),
            Some(_) => KeyLookup::Delegated,
            None => KeyLookup::Absent,
        }
    }

    async fn sign_with(
        &self,
        username: &str,
        operations: &[Operation],
        authority: Authority,
        via: &Signer,
    ) -> BroadcastResult<TxConfirmation> {
        match via {
            Signer::LocalKey(key) => self.broadcast_with_key(username, operations, key).await,
            Signer::Extension => {
                self.broadcast_with_keychain(username, operations, authority)
                    .await
            }
            Signer::MobileSession => {
                self.broadcast_with_hive_auth(username, operations, authority)
                    .await
            }
            Signer::OAuthRelay => self.broadcast_with_token(username, operations).await,
        }
    }
}

#[async_trait]
impl PlatformAdapter for WebPlatform {
    fn get_login_type(&self, username: &str, authority: Option<Authority>) -> Option<LoginType> {
        let login_type = self.record(username)?.login_type?;

        // A key login only counts if the key for this authority is on hand.
        if login_type == LoginType::Key {
            let authority = authority.unwrap_or(Authority::Posting);
            if !self.lookup_key(username, authority).is_found() {
                debug!(username = %username, authority = %authority, "Key login lacks required key");
                return None;
            }
        }

        Some(login_type)
    }

    fn get_posting_key(&self, username: &str) -> KeyLookup {
        self.lookup_key(username, Authority::Posting)
    }

    fn get_active_key(&self, username: &str) -> KeyLookup {
        self.lookup_key(username, Authority::Active)
    }

    fn get_owner_key(&self, username: &str) -> KeyLookup {
        self.lookup_key(username, Authority::Owner)
    }

    fn get_memo_key(&self, username: &str) -> KeyLookup {
        self.lookup_key(username, Authority::Memo)
    }

    async fn broadcast_with_key(
        &self,
        username: &str,
        operations: &[Operation],
        private_key: &str,
    ) -> BroadcastResult<TxConfirmation> {
        debug!(username = %username, operations = operations.len(), "Broadcasting with local key");
        self.services
            .key_broadcaster
            .broadcast_with_key(operations, private_key)
            .await
    }

    async fn broadcast_with_keychain(
        &self,
        username: &str,
        operations: &[Operation],
        key_type: Authority,
    ) -> BroadcastResult<TxConfirmation> {
        let bridge = self
            .services
            .extension
            .as_deref()
            .ok_or(BroadcastError::ExtensionMissing)?;
        keychain::broadcast_with_keychain(
            bridge,
            username,
            operations,
            key_type,
            self.keychain_timeout,
        )
        .await
    }

    async fn broadcast_with_hive_auth(
        &self,
        username: &str,
        operations: &[Operation],
        key_type: Authority,
    ) -> BroadcastResult<TxConfirmation> {
        hiveauth::broadcast_with_hive_auth(
            self.services.mobile_session.as_deref(),
            username,
            operations,
            key_type,
        )
        .await
    }

    async fn broadcast_with_token(
        &self,
        username: &str,
        operations: &[Operation],
    ) -> BroadcastResult<TxConfirmation> {
        let token = self
            .services
            .tokens
            .ensure_valid_token(username)
            .await
            .ok_or_else(|| BroadcastError::NotLoggedIn(username.to_string()))?;
        self.services.relay.broadcast(&token, operations).await
    }

    async fn has_posting_authorization(&self, username: &str) -> BroadcastResult<bool> {
        let account = self
            .services
            .accounts
            .get_account(username)
            .await?
            .ok_or_else(|| BroadcastError::AccountNotFound(username.to_string()))?;
        Ok(account.posting.has_account(&self.delegate_account))
    }

    async fn show_auth_upgrade_ui(&self, required: Authority, operation: &str) -> Option<Signer> {
        self.services.upgrade_prompt.choose(required, operation).await
    }

    async fn grant_posting_authority(&self, username: &str, via: &Signer) -> BroadcastResult<()> {
        let account = self
            .services
            .accounts
            .get_account(username)
            .await?
            .ok_or_else(|| BroadcastError::AccountNotFound(username.to_string()))?;

        if account.posting.has_account(&self.delegate_account) {
            debug!(username = %username, delegate = %self.delegate_account, "Posting authority already granted");
            return Ok(());
        }

        let operations = [grant_posting_operation(&account, &self.delegate_account)];
        let tx = self
            .sign_with(username, &operations, Authority::Active, via)
            .await?;

        info!(
            username = %username,
            delegate = %self.delegate_account,
            signer = %via.login_type(),
            tx_id = %tx.id,
            "Granted posting authority"
        );

        self.invalidate_queries(vec![Some(InvalidationTarget::key(["accounts", username]))])
            .await;
        Ok(())
    }

    async fn record_activity(
        &self,
        username: &str,
        activity: ActivityKind,
        block_num: u64,
        tx_id: &str,
    ) {
        let Some(token) = self.services.tokens.get_access_token(username) else {
            debug!(username = %username, "No access token, skipping activity record");
            return;
        };

        if let Err(e) = self
            .services
            .activity
            .record(&token, activity, block_num, tx_id)
            .await
        {
            warn!(username = %username, ty = activity.code(), error = %e, "Failed to record activity");
        }
    }

    async fn invalidate_queries(&self, entries: Vec<Option<InvalidationTarget>>) {
        self.services.cache.invalidate_queries(entries).await;
    }
}
