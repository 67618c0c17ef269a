//! High-level credential store over a `SecureStorage` backend.

use crate::{CredentialRecord, SecureStorage, StorageError, StorageKeys, StorageResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Reads and writes `CredentialRecord`s keyed by username.
///
/// Records are stored as base64(JSON) under `<prefix>user_<username>`.
/// Writes are last-writer-wins.
pub struct CredentialStore {
    storage: Box<dyn SecureStorage>,
    prefix: String,
}

impl CredentialStore {
    /// Create a store over `storage`, namespacing every key with `prefix`.
    pub fn new(storage: Box<dyn SecureStorage>, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
        }
    }

    fn record_key(&self, username: &str) -> String {
        format!("{}{}{}", self.prefix, StorageKeys::USER_RECORD, username)
    }

    fn active_user_key(&self) -> String {
        format!("{}{}", self.prefix, StorageKeys::ACTIVE_USER)
    }

    fn encode(record: &CredentialRecord) -> StorageResult<String> {
        let json = serde_json::to_vec(record)?;
        Ok(BASE64.encode(json))
    }

    fn decode(blob: &str) -> StorageResult<CredentialRecord> {
        let bytes = BASE64
            .decode(blob.trim())
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Load the record for `username`.
    pub fn get(&self, username: &str) -> StorageResult<Option<CredentialRecord>> {
        match self.storage.get(&self.record_key(username))? {
            Some(blob) => Self::decode(&blob).map(Some),
            None => Ok(None),
        }
    }

    /// Persist `record`, stripping keys that must never reach storage.
    pub fn set(&self, record: &CredentialRecord) -> StorageResult<()> {
        let clean = record.sanitized();
        if record.active_key.is_some() {
            tracing::debug!(username = %record.username, "Dropping active key before persisting");
        }
        self.storage
            .set(&self.record_key(&record.username), &Self::encode(&clean)?)
    }

    /// Remove the record for `username`.
    pub fn clear(&self, username: &str) -> StorageResult<bool> {
        let removed = self.storage.delete(&self.record_key(username))?;
        if self.get_active_user()?.as_deref() == Some(username) {
            self.clear_active_user()?;
        }
        Ok(removed)
    }

    /// Replace token fields after a refresh.
    ///
    /// A `None` refresh token keeps the stored one. Returns the updated record,
    /// or `None` if no record exists (e.g. the user logged out mid-refresh).
    pub fn update_tokens(
        &self,
        username: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in: u64,
        obtained_at_ms: i64,
    ) -> StorageResult<Option<CredentialRecord>> {
        let Some(mut record) = self.get(username)? else {
            tracing::debug!(username = %username, "No credential record to update");
            return Ok(None);
        };

        record.access_token = access_token.to_string();
        if let Some(refresh_token) = refresh_token {
            record.refresh_token = Some(refresh_token.to_string());
        }
        record.expires_in = Some(expires_in);
        record.token_obtained_at = Some(obtained_at_ms);

        self.set(&record)?;
        Ok(Some(record))
    }

    /// Usernames that have a stored record.
    pub fn usernames(&self) -> StorageResult<Vec<String>> {
        let prefix = self.record_key("");
        Ok(self
            .storage
            .list_keys_with_prefix(&prefix)?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    /// Mark `username` as the currently selected account.
    pub fn set_active_user(&self, username: &str) -> StorageResult<()> {
        self.storage.set(&self.active_user_key(), username)
    }

    /// Currently selected account, if any.
    pub fn get_active_user(&self) -> StorageResult<Option<String>> {
        self.storage.get(&self.active_user_key())
    }

    pub fn clear_active_user(&self) -> StorageResult<bool> {
        self.storage.delete(&self.active_user_key())
    }
}
