//! Token lifecycle error types.

use thiserror::Error;

/// Errors raised while refreshing tokens.
///
/// These never escape `TokenManager`'s public token accessors; they are
/// logged and the previous token is handed back instead.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Refresh endpoint rejected the request
    #[error("Token refresh failed: {0}")]
    Refresh(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl TokenError {
    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            TokenError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }
}

/// Result type alias using TokenError.
pub type TokenResult<T> = Result<T, TokenError>;
