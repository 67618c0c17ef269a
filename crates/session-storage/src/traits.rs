//! Key-value store abstraction injected into the credential layer.

use crate::StorageResult;

/// Injected key-value store that holds encoded credential blobs.
///
/// Implementations decide where bytes live (memory, a JSON file, a
/// platform secret store). Values are opaque strings.
pub trait SecureStorage: Send + Sync {
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Returns true if `key` was present.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    fn has(&self, key: &str) -> StorageResult<bool> {
        self.get(key).map(|value| value.is_some())
    }

    /// Keys under `prefix`, for backends that can enumerate.
    ///
    /// Backends that cannot enumerate report nothing.
    fn list_keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let _ = prefix;
        Ok(Vec::new())
    }
}
