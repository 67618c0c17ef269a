//! Storage key constants.

/// Key names written under the configured namespace prefix.
pub struct StorageKeys;

impl StorageKeys {
    /// Prefix for per-user credential blobs (`<prefix>user_<username>`)
    pub const USER_RECORD: &'static str = "user_";

    /// Currently selected account
    pub const ACTIVE_USER: &'static str = "active_user";
}
