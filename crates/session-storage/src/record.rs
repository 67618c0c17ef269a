//! Credential record and the enums that classify it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signing backend an identity logged in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginType {
    /// Private key held locally.
    Key,
    /// Browser extension signer.
    Keychain,
    /// QR / mobile session signer.
    #[serde(rename = "hiveauth")]
    HiveAuth,
    /// OAuth token relay.
    #[serde(rename = "hivesigner")]
    HiveSigner,
}

impl LoginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginType::Key => "key",
            LoginType::Keychain => "keychain",
            LoginType::HiveAuth => "hiveauth",
            LoginType::HiveSigner => "hivesigner",
        }
    }
}

impl fmt::Display for LoginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-chain authority level, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    Memo,
    Posting,
    Active,
    Owner,
}

impl Authority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Authority::Memo => "memo",
            Authority::Posting => "posting",
            Authority::Active => "active",
            Authority::Owner => "owner",
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything persisted for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub username: String,
    /// Bearer token for the private API and OAuth relay.
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Seconds until expiry, relative to `token_obtained_at`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Epoch milliseconds when the token was minted or refreshed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_obtained_at: Option<i64>,
    #[serde(default)]
    pub login_type: Option<LoginType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posting_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo_key: Option<String>,
}

impl CredentialRecord {
    pub fn new(username: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
            token_obtained_at: None,
            login_type: None,
            posting_key: None,
            active_key: None,
            owner_key: None,
            memo_key: None,
        }
    }

    pub fn with_login_type(mut self, login_type: LoginType) -> Self {
        self.login_type = Some(login_type);
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Set expiry metadata: `expires_in` seconds from `obtained_at_ms`.
    pub fn with_expiry(mut self, expires_in: u64, obtained_at_ms: i64) -> Self {
        self.expires_in = Some(expires_in);
        self.token_obtained_at = Some(obtained_at_ms);
        self
    }

    pub fn with_posting_key(mut self, key: impl Into<String>) -> Self {
        self.posting_key = Some(key.into());
        self
    }

    pub fn with_active_key(mut self, key: impl Into<String>) -> Self {
        self.active_key = Some(key.into());
        self
    }

    /// Absolute expiry in epoch milliseconds, if both expiry fields are present.
    pub fn expires_at_ms(&self) -> Option<i64> {
        let obtained = self.token_obtained_at?;
        let expires_in = i64::try_from(self.expires_in?).ok()?;
        Some(obtained.saturating_add(expires_in.saturating_mul(1000)))
    }

    /// Locally held private key for `authority`, if any.
    pub fn key_for(&self, authority: Authority) -> Option<&str> {
        match authority {
            Authority::Posting => self.posting_key.as_deref(),
            Authority::Active => self.active_key.as_deref(),
            Authority::Owner => self.owner_key.as_deref(),
            Authority::Memo => self.memo_key.as_deref(),
        }
    }

    /// Copy of this record that is safe to write to storage.
    ///
    /// Active, owner and memo keys are dropped unconditionally. The posting
    /// key survives only for `key` logins.
    pub fn sanitized(&self) -> Self {
        let mut record = self.clone();
        record.active_key = None;
        record.owner_key = None;
        record.memo_key = None;
        if record.login_type != Some(LoginType::Key) {
            record.posting_key = None;
        }
        record
    }
}
