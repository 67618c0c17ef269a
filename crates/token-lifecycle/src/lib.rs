//! Access-token lifecycle for logged-in accounts.
//!
//! This crate provides:
//! - Expiry checks against a refresh buffer window
//! - Non-blocking token reads that schedule a background refresh
//! - Awaited refresh with per-user request deduplication
//! - An HTTP client for the token refresh endpoint

mod error;
mod manager;
mod refresher;

pub use error::{TokenError, TokenResult};
pub use manager::TokenManager;
pub use refresher::{HttpTokenRefresher, RefreshedTokens, TokenRefresher, TOKEN_REFRESH_PATH};
