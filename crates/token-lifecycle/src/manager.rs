//! Token lifecycle manager with background refresh and request deduplication.
//!
//! Two read paths are offered:
//! - [`TokenManager::get_access_token`] never waits. An expired token is
//!   returned as-is and a refresh is detached onto the runtime.
//! - [`TokenManager::ensure_valid_token`] waits for a refresh when needed.
//!
//! Both share one pending-refresh table keyed by username, so at most one
//! refresh call per user is outstanding and every caller that arrives during
//! it observes the same result.

use crate::TokenRefresher;
use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use session_config_and_utils::Config;
use session_storage::{CredentialRecord, CredentialStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// In-flight refresh shared by every caller for one username.
type PendingRefresh = Shared<BoxFuture<'static, Option<String>>>;

/// Username -> (generation, refresh). The generation keeps a refresh that
/// outlived `reset()` from evicting a newer entry for the same user.
type PendingTable = Arc<Mutex<HashMap<String, (u64, PendingRefresh)>>>;

/// Removes a username's pending entry when its refresh settles, including on panic.
struct PendingEntryGuard {
    pending: PendingTable,
    username: String,
    generation: u64,
}

impl Drop for PendingEntryGuard {
    fn drop(&mut self) {
        // The removed refresh may own this guard's future, so it is dropped
        // only after the lock is released.
        let removed = {
            let mut pending = self.pending.lock();
            if matches!(pending.get(&self.username), Some((generation, _)) if *generation == self.generation)
            {
                pending.remove(&self.username)
            } else {
                None
            }
        };
        drop(removed);
    }
}

/// Keeps stored access tokens fresh.
pub struct TokenManager {
    store: Arc<CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    pending: PendingTable,
    next_generation: AtomicU64,
    refresh_buffer: Duration,
}

impl TokenManager {
    /// Create a manager with the given refresh buffer.
    pub fn new(
        store: Arc<CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        refresh_buffer: Duration,
    ) -> Self {
        Self {
            store,
            refresher,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            refresh_buffer,
        }
    }

    /// Create a manager using the configured refresh buffer.
    pub fn from_config(
        store: Arc<CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        config: &Config,
    ) -> Self {
        Self::new(store, refresher, config.refresh_buffer())
    }

    /// Credential store this manager reads from and writes to.
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Whether `record` should be refreshed now.
    pub fn is_expired(&self, record: &CredentialRecord) -> bool {
        self.is_expired_at(record, Utc::now().timestamp_millis())
    }

    /// Whether `record` should be refreshed at `now_ms`.
    ///
    /// Records without expiry metadata are always expired. The buffer
    /// boundary itself counts as expired.
    pub fn is_expired_at(&self, record: &CredentialRecord, now_ms: i64) -> bool {
        let Some(expires_at) = record.expires_at_ms() else {
            return true;
        };
        let buffer_ms = i64::try_from(self.refresh_buffer.as_millis()).unwrap_or(i64::MAX);
        now_ms >= expires_at.saturating_sub(buffer_ms)
    }

    /// Current stored token, without waiting.
    ///
    /// If the token is expired and a refresh token exists, a background
    /// refresh is scheduled. The returned token may be stale.
    pub fn get_access_token(&self, username: &str) -> Option<String> {
        let record = self.load(username)?;

        if self.is_expired(&record) {
            match record.refresh_token.clone() {
                Some(refresh_token) => {
                    self.spawn_background_refresh(username, refresh_token, &record.access_token)
                }
                None => debug!(username = %username, "Token expired with no refresh token"),
            }
        }

        Some(record.access_token)
    }

    /// A token that is fresh whenever a refresh is possible.
    ///
    /// Refresh failures are logged and resolve to the previous token, so the
    /// caller can still attempt its request and let the API reject it.
    pub async fn ensure_valid_token(&self, username: &str) -> Option<String> {
        let record = self.load(username)?;

        if !self.is_expired(&record) {
            return Some(record.access_token);
        }

        let Some(refresh_token) = record.refresh_token.clone() else {
            debug!(username = %username, "Token expired with no refresh token, using it anyway");
            return Some(record.access_token);
        };

        self.shared_refresh(username, refresh_token, record.access_token)
            .await
    }

    /// Number of refreshes currently in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Forget every in-flight refresh.
    ///
    /// Detached refreshes keep running but their results are no longer shared
    /// with new callers.
    pub fn reset(&self) {
        // Dropping the last clone of a refresh runs its guard, which locks the
        // table again.
        let drained = std::mem::take(&mut *self.pending.lock());
        drop(drained);
    }

    fn load(&self, username: &str) -> Option<CredentialRecord> {
        match self.store.get(username) {
            Ok(record) => record,
            Err(e) => {
                warn!(username = %username, error = %e, "Failed to read credential record");
                None
            }
        }
    }

    fn spawn_background_refresh(&self, username: &str, refresh_token: String, previous: &str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(username = %username, "No async runtime, skipping background refresh");
            return;
        };

        let refresh = self.shared_refresh(username, refresh_token, previous.to_string());
        handle.spawn(async move {
            refresh.await;
        });
    }

    /// Join the pending refresh for `username`, or start one.
    fn shared_refresh(
        &self,
        username: &str,
        refresh_token: String,
        previous: String,
    ) -> PendingRefresh {
        let mut pending = self.pending.lock();

        if let Some((_, existing)) = pending.get(username) {
            debug!(username = %username, "Joining in-flight token refresh");
            return existing.clone();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let refresh = run_refresh(
            self.store.clone(),
            self.refresher.clone(),
            PendingEntryGuard {
                pending: self.pending.clone(),
                username: username.to_string(),
                generation,
            },
            refresh_token,
            previous,
        )
        .boxed()
        .shared();

        pending.insert(username.to_string(), (generation, refresh.clone()));
        refresh
    }
}

async fn run_refresh(
    store: Arc<CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    guard: PendingEntryGuard,
    refresh_token: String,
    previous: String,
) -> Option<String> {
    let username = guard.username.clone();

    let token = match refresher.refresh(&username, &refresh_token).await {
        Ok(tokens) => {
            let obtained_at = Utc::now().timestamp_millis();
            if let Err(e) = store.update_tokens(
                &username,
                &tokens.access_token,
                tokens.refresh_token.as_deref(),
                tokens.expires_in,
                obtained_at,
            ) {
                warn!(username = %username, error = %e, "Refreshed token could not be persisted");
            }
            info!(username = %username, expires_in = tokens.expires_in, "Access token refreshed");
            tokens.access_token
        }
        Err(e) => {
            warn!(
                username = %username,
                error = %e,
                transient = e.is_transient(),
                "Token refresh failed, continuing with previous token"
            );
            previous
        }
    };

    drop(guard);
    Some(token)
}
