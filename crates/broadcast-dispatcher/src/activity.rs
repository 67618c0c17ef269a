//! Post-broadcast activity recording.

use crate::BroadcastResult;
use async_trait::async_trait;
use serde::Serialize;
use session_config_and_utils::Config;
use tracing::debug;
use url::Url;

/// Path of the activity endpoint under the API base URL.
pub const ACTIVITY_PATH: &str = "/private-api/usr-activity";

/// Kinds of user activity the API scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Post,
    Comment,
    Vote,
    Reblog,
}

impl ActivityKind {
    pub fn code(&self) -> u32 {
        match self {
            ActivityKind::Post => 100,
            ActivityKind::Comment => 110,
            ActivityKind::Vote => 120,
            ActivityKind::Reblog => 130,
        }
    }
}

/// Records a confirmed broadcast against the user's activity.
#[async_trait]
pub trait ActivityRecorder: Send + Sync {
    async fn record(
        &self,
        access_token: &str,
        activity: ActivityKind,
        block_num: u64,
        tx_id: &str,
    ) -> BroadcastResult<()>;
}

#[derive(Serialize)]
struct ActivityBody<'a> {
    code: &'a str,
    ty: u32,
    bl: u64,
    tx: &'a str,
}

pub struct HttpActivityRecorder {
    client: reqwest::Client,
    url: Url,
}

impl HttpActivityRecorder {
    pub fn new(api_base_url: &Url) -> BroadcastResult<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            url: api_base_url.join(ACTIVITY_PATH)?,
        })
    }

    pub fn from_config(config: &Config) -> BroadcastResult<Self> {
        Self::new(&Url::parse(&config.api_base_url)?)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ActivityRecorder for HttpActivityRecorder {
    async fn record(
        &self,
        access_token: &str,
        activity: ActivityKind,
        block_num: u64,
        tx_id: &str,
    ) -> BroadcastResult<()> {
        debug!(ty = activity.code(), block_num, tx_id = %tx_id, "Recording activity");

        self.client
            .post(self.url.clone())
            .json(&ActivityBody {
                code: access_token,
                ty: activity.code(),
                bl: block_num,
                tx: tx_id,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
