//! Token refresh endpoint client.

use crate::{TokenError, TokenResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// Path of the refresh endpoint under the private API base URL.
pub const TOKEN_REFRESH_PATH: &str = "/auth-api/hs-token-refresh";

/// Tokens minted by a successful refresh.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Rotated refresh token. Absent means the old one stays valid.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the new access token expires.
    pub expires_in: u64,
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, username: &str, refresh_token: &str) -> TokenResult<RefreshedTokens>;
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    code: &'a str,
}

/// `TokenRefresher` backed by the private API's refresh endpoint.
#[derive(Clone)]
pub struct HttpTokenRefresher {
    http_client: Client,
    refresh_url: Url,
}

impl HttpTokenRefresher {
    /// Create a refresher for the API at `api_base_url`.
    pub fn new(api_base_url: &str) -> TokenResult<Self> {
        Ok(Self {
            http_client: Client::new(),
            refresh_url: Url::parse(api_base_url)?.join(TOKEN_REFRESH_PATH)?,
        })
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, username: &str, refresh_token: &str) -> TokenResult<RefreshedTokens> {
        debug!(url = %self.refresh_url, username = %username, "Refreshing token");

        let response = self
            .http_client
            .post(self.refresh_url.clone())
            .json(&RefreshRequest {
                code: refresh_token,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, username = %username, "Token refresh rejected");
            return Err(TokenError::Refresh(format!("HTTP {}: {}", status, body)));
        }

        Ok(response.json().await?)
    }
}
