//! HiveSigner OAuth broadcast relay.

use crate::{BroadcastError, BroadcastResult, Operation, TxConfirmation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use session_config_and_utils::Config;
use tracing::{debug, warn};
use url::Url;

/// Relays operations signed server-side on behalf of an access token.
#[async_trait]
pub trait OAuthRelay: Send + Sync {
    async fn broadcast(
        &self,
        access_token: &str,
        operations: &[Operation],
    ) -> BroadcastResult<TxConfirmation>;
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    operations: &'a [Operation],
}

#[derive(Deserialize)]
struct RelayResponse {
    #[serde(default)]
    result: Option<TxConfirmation>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// HTTP client for `{hivesigner}/api/broadcast`.
pub struct HttpOAuthRelay {
    client: reqwest::Client,
    broadcast_url: Url,
}

impl HttpOAuthRelay {
    pub fn new(hivesigner_url: &Url) -> BroadcastResult<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            broadcast_url: hivesigner_url.join("/api/broadcast")?,
        })
    }

    pub fn from_config(config: &Config) -> BroadcastResult<Self> {
        let url = Url::parse(&config.hivesigner_url)?;
        Self::new(&url)
    }

    pub fn broadcast_url(&self) -> &Url {
        &self.broadcast_url
    }
}

#[async_trait]
impl OAuthRelay for HttpOAuthRelay {
    async fn broadcast(
        &self,
        access_token: &str,
        operations: &[Operation],
    ) -> BroadcastResult<TxConfirmation> {
        debug!(operations = operations.len(), "Relaying broadcast");

        let response = self
            .client
            .post(self.broadcast_url.clone())
            .header(reqwest::header::AUTHORIZATION, access_token)
            .json(&RelayRequest { operations })
            .send()
            .await?;

        let status = response.status();
        let body: RelayResponse = response.json().await?;

        if let Some(error) = body.error {
            let detail = body.error_description.unwrap_or(error);
            warn!(status = %status, error = %detail, "Relay rejected broadcast");
            return Err(BroadcastError::Relay(detail));
        }
        if !status.is_success() {
            return Err(BroadcastError::Relay(format!("relay returned {status}")));
        }

        body.result
            .ok_or_else(|| BroadcastError::Relay("relay returned no transaction".to_string()))
    }
}
