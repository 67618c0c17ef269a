//! Configuration for the session and broadcast layer.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default private API base URL (can be overridden at compile time via ECENCY_API_URL env var).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("ECENCY_API_URL") {
    Some(url) => url,
    None => "https://ecency.com",
};

/// Default Hive JSON-RPC node.
pub const DEFAULT_HIVE_RPC_URL: &str = "https://api.hive.blog";

/// Default HiveSigner OAuth relay.
pub const DEFAULT_HIVESIGNER_URL: &str = "https://hivesigner.com";

/// Account that receives delegated posting authority.
pub const DEFAULT_DELEGATE_ACCOUNT: &str = "ecency.app";

/// Tokens are treated as expired this long before their real expiry.
pub const DEFAULT_REFRESH_BUFFER_MS: u64 = 5 * 60 * 1000;

/// Upper bound on a browser-extension signing round trip.
pub const DEFAULT_KEYCHAIN_TIMEOUT_MS: u64 = 60_000;

/// Namespace prefix for keys written to the credential store.
pub const DEFAULT_STORAGE_PREFIX: &str = "ecency_";

/// Log level used when neither file nor env sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Returns the API base URL baked in at compile time.
pub fn compile_time_api_base_url() -> &'static str {
    DEFAULT_API_BASE_URL
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub log_level: String,
    /// Private API base URL used for token refresh and activity recording.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Hive JSON-RPC node used for read-only account lookups.
    #[serde(default = "default_hive_rpc_url")]
    pub hive_rpc_url: String,
    /// HiveSigner base URL for OAuth relay broadcasts.
    #[serde(default = "default_hivesigner_url")]
    pub hivesigner_url: String,
    /// Account expected in `posting.account_auths` for delegated posting.
    #[serde(default = "default_delegate_account")]
    pub delegate_account: String,
    /// Refresh buffer in milliseconds.
    #[serde(default = "default_refresh_buffer_ms")]
    pub refresh_buffer_ms: u64,
    /// Browser extension interaction timeout in milliseconds.
    #[serde(default = "default_keychain_timeout_ms")]
    pub keychain_timeout_ms: u64,
    /// Prefix applied to every credential store key.
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_hive_rpc_url() -> String {
    DEFAULT_HIVE_RPC_URL.to_string()
}

fn default_hivesigner_url() -> String {
    DEFAULT_HIVESIGNER_URL.to_string()
}

fn default_delegate_account() -> String {
    DEFAULT_DELEGATE_ACCOUNT.to_string()
}

fn default_refresh_buffer_ms() -> u64 {
    DEFAULT_REFRESH_BUFFER_MS
}

fn default_keychain_timeout_ms() -> u64 {
    DEFAULT_KEYCHAIN_TIMEOUT_MS
}

fn default_storage_prefix() -> String {
    DEFAULT_STORAGE_PREFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_base_url: default_api_base_url(),
            hive_rpc_url: default_hive_rpc_url(),
            hivesigner_url: default_hivesigner_url(),
            delegate_account: default_delegate_account(),
            refresh_buffer_ms: DEFAULT_REFRESH_BUFFER_MS,
            keychain_timeout_ms: DEFAULT_KEYCHAIN_TIMEOUT_MS,
            storage_prefix: default_storage_prefix(),
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Read a config file without env overrides or validation.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Write the config as pretty JSON to `paths.config_file()`.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Apply `ECENCY_*` environment overrides.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("ECENCY_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Reject values that would break the token or broadcast layer.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;
        self.hive_rpc_url()?;
        self.hivesigner_url()?;

        if self.keychain_timeout_ms == 0 {
            return Err(CoreError::Config(
                "keychain_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.delegate_account.trim().is_empty() {
            return Err(CoreError::Config(
                "delegate_account must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the private API base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    /// Get the Hive RPC URL as a parsed URL.
    pub fn hive_rpc_url(&self) -> CoreResult<Url> {
        Url::parse(&self.hive_rpc_url).map_err(CoreError::from)
    }

    /// Get the HiveSigner URL as a parsed URL.
    pub fn hivesigner_url(&self) -> CoreResult<Url> {
        Url::parse(&self.hivesigner_url).map_err(CoreError::from)
    }

    /// Refresh buffer as a duration.
    pub fn refresh_buffer(&self) -> Duration {
        Duration::from_millis(self.refresh_buffer_ms)
    }

    /// Browser extension timeout as a duration.
    pub fn keychain_timeout(&self) -> Duration {
        Duration::from_millis(self.keychain_timeout_ms)
    }
}
