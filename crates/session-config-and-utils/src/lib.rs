//! Core types, configuration, and utilities shared by the session and
//! broadcast crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    compile_time_api_base_url, Config, DEFAULT_API_BASE_URL, DEFAULT_DELEGATE_ACCOUNT,
    DEFAULT_HIVESIGNER_URL, DEFAULT_HIVE_RPC_URL, DEFAULT_KEYCHAIN_TIMEOUT_MS,
    DEFAULT_REFRESH_BUFFER_MS, DEFAULT_STORAGE_PREFIX,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level, LogFormat};
pub use paths::Paths;
