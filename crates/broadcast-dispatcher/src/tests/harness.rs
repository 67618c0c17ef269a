//! Test harness for dispatcher integration tests.
//!
//! Every mock that submits a transaction routes through `MockChain`, so an
//! `account_update` signed by any backend changes what later account reads
//! return.

use crate::{
    Account, AccountReader, ActivityKind, ActivityRecorder, AuthUpgradePrompt, AuthorityDef,
    BroadcastDispatcher, BroadcastError, BroadcastResult, CacheInvalidationGateway,
    ExtensionBridge, ExtensionCallback, ExtensionResponse, InvalidationTarget, KeyBroadcaster,
    MemoryQueryCache, MobileSessionSigner, OAuthRelay, Operation, PlatformServices, QueryCache,
    Signer, TransferRequest, TxConfirmation, WebPlatform,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use session_config_and_utils::Config;
use session_storage::{Authority, CredentialRecord, CredentialStore, LoginType, MemoryStorage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use token_lifecycle::{RefreshedTokens, TokenManager, TokenRefresher, TokenResult};

pub const DELEGATE: &str = "ecency.app";
pub const POSTING_KEY: &str = "5JpostingKeyForTests";

/// Shared, ordered log of side effects.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// In-memory chain: accounts plus a log of submitted transactions.
#[derive(Default)]
pub struct MockChain {
    accounts: Mutex<HashMap<String, Account>>,
    submitted: Mutex<Vec<Vec<Operation>>>,
    reads: AtomicUsize,
    next_block: AtomicU64,
}

impl MockChain {
    pub fn add_account(&self, name: &str, posting_delegates: &[&str]) {
        let account = Account {
            name: name.to_string(),
            posting: AuthorityDef {
                weight_threshold: 1,
                account_auths: posting_delegates
                    .iter()
                    .map(|d| (d.to_string(), 1))
                    .collect(),
                key_auths: vec![(format!("STM{name}posting"), 1)],
            },
            memo_key: format!("STM{name}memo"),
            json_metadata: String::new(),
        };
        self.accounts.lock().insert(name.to_string(), account);
    }

    pub fn account(&self, name: &str) -> Option<Account> {
        self.accounts.lock().get(name).cloned()
    }

    pub fn submitted(&self) -> Vec<Vec<Operation>> {
        self.submitted.lock().clone()
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().len()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Apply `operations` and return a confirmation.
    pub fn submit(&self, operations: &[Operation]) -> TxConfirmation {
        for op in operations {
            if op.kind() != "account_update" {
                continue;
            }
            let Some(name) = op.body()["account"].as_str() else {
                continue;
            };
            if let Ok(posting) = serde_json::from_value::<AuthorityDef>(op.body()["posting"].clone()) {
                if let Some(account) = self.accounts.lock().get_mut(name) {
                    account.posting = posting;
                }
            }
        }

        self.submitted.lock().push(operations.to_vec());
        let block = self.next_block.fetch_add(1, Ordering::SeqCst) + 1000;
        TxConfirmation {
            id: format!("tx-{block}"),
            block_num: block,
            trx_num: 0,
            expired: false,
        }
    }
}

#[async_trait]
impl AccountReader for MockChain {
    async fn get_account(&self, username: &str) -> BroadcastResult<Option<Account>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.account(username))
    }
}

/// Local key signer that records which key signed what.
pub struct MockKeySigner {
    chain: Arc<MockChain>,
    pub signed: Mutex<Vec<(String, Vec<Operation>)>>,
}

#[async_trait]
impl KeyBroadcaster for MockKeySigner {
    async fn broadcast_with_key(
        &self,
        operations: &[Operation],
        private_key: &str,
    ) -> BroadcastResult<TxConfirmation> {
        self.signed
            .lock()
            .push((private_key.to_string(), operations.to_vec()));
        Ok(self.chain.submit(operations))
    }
}

impl MockKeySigner {
    pub fn keys_used(&self) -> Vec<String> {
        self.signed.lock().iter().map(|(k, _)| k.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionMode {
    Approve,
    Reject,
    /// Keep the callback without calling it.
    Silent,
}

pub struct MockExtension {
    chain: Arc<MockChain>,
    pub available: AtomicBool,
    pub mode: Mutex<ExtensionMode>,
    pub requests: Mutex<Vec<(String, Authority)>>,
    pub held: Mutex<Vec<(Vec<Operation>, ExtensionCallback)>>,
}

impl MockExtension {
    pub fn set_mode(&self, mode: ExtensionMode) {
        *self.mode.lock() = mode;
    }

    /// Fire every held callback with an approval. Returns how many were
    /// accepted by a still-waiting request.
    pub fn release_held(&self) -> usize {
        let held: Vec<_> = self.held.lock().drain(..).collect();
        held.into_iter()
            .map(|(ops, callback)| callback(ExtensionResponse::ok(self.chain.submit(&ops))))
            .filter(|delivered| *delivered)
            .count()
    }
}

impl ExtensionBridge for MockExtension {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn request_broadcast(
        &self,
        username: &str,
        operations: &[Operation],
        key_type: Authority,
        callback: ExtensionCallback,
    ) {
        self.requests.lock().push((username.to_string(), key_type));
        match *self.mode.lock() {
            ExtensionMode::Approve => {
                callback(ExtensionResponse::ok(self.chain.submit(operations)));
            }
            ExtensionMode::Reject => {
                callback(ExtensionResponse::failed("Request was canceled by the user."));
            }
            ExtensionMode::Silent => self.held.lock().push((operations.to_vec(), callback)),
        }
    }

    fn request_transfer(&self, request: &TransferRequest, callback: ExtensionCallback) {
        self.requests
            .lock()
            .push((request.from.clone(), Authority::Active));
        callback(ExtensionResponse::failed("transfer not expected in tests"));
    }
}

pub struct MockMobileSession {
    chain: Arc<MockChain>,
    pub calls: Mutex<Vec<Authority>>,
}

#[async_trait]
impl MobileSessionSigner for MockMobileSession {
    async fn broadcast(
        &self,
        _username: &str,
        operations: &[Operation],
        key_type: Authority,
    ) -> BroadcastResult<TxConfirmation> {
        self.calls.lock().push(key_type);
        Ok(self.chain.submit(operations))
    }
}

pub struct MockRelay {
    chain: Arc<MockChain>,
    pub fail: AtomicBool,
    pub calls: Mutex<Vec<(String, Vec<Operation>)>>,
}

impl MockRelay {
    pub fn tokens_used(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(t, _)| t.clone()).collect()
    }
}

#[async_trait]
impl OAuthRelay for MockRelay {
    async fn broadcast(
        &self,
        access_token: &str,
        operations: &[Operation],
    ) -> BroadcastResult<TxConfirmation> {
        self.calls
            .lock()
            .push((access_token.to_string(), operations.to_vec()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(BroadcastError::Relay("missing_authority".to_string()));
        }
        Ok(self.chain.submit(operations))
    }
}

#[derive(Default)]
pub struct MockPrompt {
    pub answer: Mutex<Option<Signer>>,
    pub calls: Mutex<Vec<(Authority, String)>>,
}

impl MockPrompt {
    pub fn answer_with(&self, choice: Option<Signer>) {
        *self.answer.lock() = choice;
    }
}

#[async_trait]
impl AuthUpgradePrompt for MockPrompt {
    async fn choose(&self, required: Authority, operation: &str) -> Option<Signer> {
        self.calls.lock().push((required, operation.to_string()));
        self.answer.lock().clone()
    }
}

pub struct MockActivity {
    events: EventLog,
    pub fail: AtomicBool,
    pub recorded: Mutex<Vec<(String, u32, u64, String)>>,
}

#[async_trait]
impl ActivityRecorder for MockActivity {
    async fn record(
        &self,
        access_token: &str,
        activity: ActivityKind,
        block_num: u64,
        tx_id: &str,
    ) -> BroadcastResult<()> {
        self.events.push(format!("activity:{}", activity.code()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(BroadcastError::Rpc("activity endpoint down".to_string()));
        }
        self.recorded.lock().push((
            access_token.to_string(),
            activity.code(),
            block_num,
            tx_id.to_string(),
        ));
        Ok(())
    }
}

/// Query cache that logs each invalidation before applying it.
pub struct RecordingCache {
    events: EventLog,
    pub inner: MemoryQueryCache,
    pub invalidations: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub fn invalidated(&self) -> Vec<String> {
        self.invalidations.lock().clone()
    }
}

#[async_trait]
impl QueryCache for RecordingCache {
    async fn invalidate(&self, target: &InvalidationTarget) {
        let label = match target {
            InvalidationTarget::Key(key) => key.join("/"),
            InvalidationTarget::Predicate(predicate) => format!("?{}", predicate.name()),
        };
        self.events.push(format!("invalidate:{label}"));
        self.invalidations.lock().push(label);
        self.inner.invalidate(target).await;
    }
}

#[derive(Default)]
pub struct MockRefresher {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TokenRefresher for MockRefresher {
    async fn refresh(&self, username: &str, _refresh_token: &str) -> TokenResult<RefreshedTokens> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RefreshedTokens {
            access_token: format!("{username}-refreshed"),
            refresh_token: Some(format!("{username}-refresh-2")),
            expires_in: 3600,
        })
    }
}

/// Dispatcher wired to recording mocks.
pub struct TestHarness {
    pub config: Config,
    pub store: Arc<CredentialStore>,
    pub tokens: Arc<TokenManager>,
    pub refresher: Arc<MockRefresher>,
    pub chain: Arc<MockChain>,
    pub keys: Arc<MockKeySigner>,
    pub extension: Arc<MockExtension>,
    pub mobile: Arc<MockMobileSession>,
    pub relay: Arc<MockRelay>,
    pub prompt: Arc<MockPrompt>,
    pub activity: Arc<MockActivity>,
    pub cache: Arc<RecordingCache>,
    pub events: EventLog,
    pub platform: Arc<WebPlatform>,
    pub dispatcher: BroadcastDispatcher,
}

impl TestHarness {
    pub fn new() -> Self {
        let config = Config::default();
        let events = EventLog::default();

        let store = Arc::new(CredentialStore::new(
            Box::new(MemoryStorage::new()),
            config.storage_prefix.clone(),
        ));
        let refresher = Arc::new(MockRefresher::default());
        let tokens = Arc::new(TokenManager::from_config(
            store.clone(),
            refresher.clone(),
            &config,
        ));

        let chain = Arc::new(MockChain::default());
        let keys = Arc::new(MockKeySigner {
            chain: chain.clone(),
            signed: Mutex::new(Vec::new()),
        });
        let extension = Arc::new(MockExtension {
            chain: chain.clone(),
            available: AtomicBool::new(true),
            mode: Mutex::new(ExtensionMode::Approve),
            requests: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
        });
        let mobile = Arc::new(MockMobileSession {
            chain: chain.clone(),
            calls: Mutex::new(Vec::new()),
        });
        let relay = Arc::new(MockRelay {
            chain: chain.clone(),
            fail: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        });
        let prompt = Arc::new(MockPrompt::default());
        let activity = Arc::new(MockActivity {
            events: events.clone(),
            fail: AtomicBool::new(false),
            recorded: Mutex::new(Vec::new()),
        });
        let cache = Arc::new(RecordingCache {
            events: events.clone(),
            inner: MemoryQueryCache::new(),
            invalidations: Mutex::new(Vec::new()),
        });

        let services = PlatformServices {
            tokens: tokens.clone(),
            accounts: chain.clone(),
            key_broadcaster: keys.clone(),
            extension: Some(extension.clone()),
            mobile_session: Some(mobile.clone()),
            relay: relay.clone(),
            upgrade_prompt: prompt.clone(),
            activity: activity.clone(),
            cache: CacheInvalidationGateway::new(cache.clone()),
        };
        let platform = Arc::new(WebPlatform::new(services, &config));
        let dispatcher = BroadcastDispatcher::new(platform.clone());

        Self {
            config,
            store,
            tokens,
            refresher,
            chain,
            keys,
            extension,
            mobile,
            relay,
            prompt,
            activity,
            cache,
            events,
            platform,
            dispatcher,
        }
    }

    fn fresh_record(username: &str) -> CredentialRecord {
        CredentialRecord::new(username, format!("{username}-token"))
            .with_refresh_token(format!("{username}-refresh"))
            .with_expiry(3600, now_ms())
    }

    /// Store a login with the given type (and posting key for key logins).
    pub fn login(&self, username: &str, login_type: LoginType) {
        let mut record = Self::fresh_record(username).with_login_type(login_type);
        if login_type == LoginType::Key {
            record = record.with_posting_key(POSTING_KEY);
        }
        self.store.set(&record).unwrap();
        self.chain.add_account(username, &[]);
    }

    /// Store a session whose login type is unknown.
    pub fn login_without_signer(&self, username: &str, delegates: &[&str]) {
        self.store.set(&Self::fresh_record(username)).unwrap();
        self.chain.add_account(username, delegates);
    }

    /// Total submissions across every backend.
    pub fn broadcast_count(&self) -> usize {
        self.chain.submitted_count()
    }
}
