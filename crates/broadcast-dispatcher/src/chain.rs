//! Chain account reads and the posting-authority grant operation.

use crate::{BroadcastError, BroadcastResult, Operation, TxConfirmation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use session_config_and_utils::Config;
use tracing::debug;
use url::Url;

/// Weighted authority: threshold plus account and key auths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityDef {
    pub weight_threshold: u32,
    #[serde(default)]
    pub account_auths: Vec<(String, u32)>,
    #[serde(default)]
    pub key_auths: Vec<(String, u32)>,
}

impl AuthorityDef {
    pub fn has_account(&self, account: &str) -> bool {
        self.account_auths.iter().any(|(name, _)| name == account)
    }

    /// Copy with `account` added at `weight`, kept sorted by name.
    pub fn with_account(&self, account: &str, weight: u32) -> Self {
        let mut updated = self.clone();
        updated.account_auths.retain(|(name, _)| name != account);
        updated.account_auths.push((account.to_string(), weight));
        updated.account_auths.sort_by(|a, b| a.0.cmp(&b.0));
        updated
    }
}

/// Subset of an on-chain account this crate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub posting: AuthorityDef,
    #[serde(default)]
    pub memo_key: String,
    #[serde(default)]
    pub json_metadata: String,
}

/// Reads account state from a chain node.
#[async_trait]
pub trait AccountReader: Send + Sync {
    async fn get_account(&self, username: &str) -> BroadcastResult<Option<Account>>;
}

/// Signs with a raw private key and submits to the chain.
#[async_trait]
pub trait KeyBroadcaster: Send + Sync {
    async fn broadcast_with_key(
        &self,
        operations: &[Operation],
        private_key: &str,
    ) -> BroadcastResult<TxConfirmation>;
}

/// `account_update` adding `delegate` to the account's posting authority.
///
/// The delegate gets weight equal to the posting threshold so it can sign
/// alone. Memo key and metadata are carried over unchanged.
pub fn grant_posting_operation(account: &Account, delegate: &str) -> Operation {
    let posting = account
        .posting
        .with_account(delegate, account.posting.weight_threshold);

    Operation::new(
        "account_update",
        json!({
            "account": account.name,
            "posting": posting,
            "memo_key": account.memo_key,
            "json_metadata": account.json_metadata,
        }),
    )
}

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// JSON-RPC account reader using `condenser_api.get_accounts`.
pub struct HttpAccountReader {
    client: reqwest::Client,
    rpc_url: Url,
}

impl HttpAccountReader {
    pub fn new(rpc_url: Url) -> BroadcastResult<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            rpc_url,
        })
    }

    pub fn from_config(config: &Config) -> BroadcastResult<Self> {
        Self::new(Url::parse(&config.hive_rpc_url)?)
    }
}

#[async_trait]
impl AccountReader for HttpAccountReader {
    async fn get_account(&self, username: &str) -> BroadcastResult<Option<Account>> {
        debug!(username = %username, "Fetching account");

        let request = RpcRequest {
            jsonrpc: "2.0",
            method: "condenser_api.get_accounts",
            params: [[username]],
            id: 1,
        };

        let response: RpcResponse<Vec<Account>> = self
            .client
            .post(self.rpc_url.clone())
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(BroadcastError::Rpc(format!(
                "{} ({})",
                error.message, error.code
            )));
        }

        Ok(response
            .result
            .unwrap_or_default()
            .into_iter()
            .find(|account| account.name == username))
    }
}
