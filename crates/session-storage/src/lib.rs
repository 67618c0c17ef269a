//! Credential persistence for the broadcast layer.
//!
//! This crate provides:
//! - A `SecureStorage` key-value abstraction with in-memory and file backends
//! - The per-user `CredentialRecord` and its base64(JSON) codec
//! - `CredentialStore`, which namespaces records by prefix and refuses to
//!   persist keys other than a key-login posting key

mod credentials;
mod file;
mod keys;
mod memory;
mod record;
mod traits;

pub use credentials::CredentialStore;
pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use record::{Authority, CredentialRecord, LoginType};
pub use traits::SecureStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Encoding(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
