//! Broadcast requests for common user actions.

use crate::activity::ActivityKind;
use crate::cache::InvalidationTarget;
use crate::Operation;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use session_storage::Authority;

/// Operations plus the side effects to run once they confirm.
#[derive(Debug, Clone)]
pub struct BroadcastRequest {
    pub operations: Vec<Operation>,
    /// Overrides authority inference when set.
    pub authority: Option<Authority>,
    /// Shown in the upgrade prompt.
    pub description: String,
    pub activity: Option<ActivityKind>,
    pub invalidate: Vec<Option<InvalidationTarget>>,
}

impl BroadcastRequest {
    pub fn new(operations: Vec<Operation>, description: impl Into<String>) -> Self {
        Self {
            operations,
            authority: None,
            description: description.into(),
            activity: None,
            invalidate: Vec::new(),
        }
    }

    pub fn with_authority(mut self, authority: Authority) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn with_activity(mut self, activity: ActivityKind) -> Self {
        self.activity = Some(activity);
        self
    }

    pub fn invalidating(mut self, target: Option<InvalidationTarget>) -> Self {
        self.invalidate.push(target);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentOptions {
    pub max_accepted_payout: String,
    pub percent_hbd: u16,
    pub allow_votes: bool,
    pub allow_curation_rewards: bool,
    #[serde(default)]
    pub extensions: Vec<Value>,
}

impl Default for CommentOptions {
    fn default() -> Self {
        Self {
            max_accepted_payout: "1000000.000 HBD".to_string(),
            percent_hbd: 10000,
            allow_votes: true,
            allow_curation_rewards: true,
            extensions: Vec::new(),
        }
    }
}

/// A post (empty `parent_author`) or a reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommentPayload {
    pub author: String,
    pub permlink: String,
    pub parent_author: String,
    /// Category tag for root posts.
    pub parent_permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: Value,
    pub options: Option<CommentOptions>,
}

impl CommentPayload {
    pub fn is_reply(&self) -> bool {
        !self.parent_author.is_empty()
    }
}

fn entry_path(author: &str, permlink: &str) -> String {
    format!("/@{author}/{permlink}")
}

/// Publish a post or reply.
pub fn comment(payload: CommentPayload) -> BroadcastRequest {
    let mut operations = vec![Operation::new(
        "comment",
        json!({
            "parent_author": payload.parent_author,
            "parent_permlink": payload.parent_permlink,
            "author": payload.author,
            "permlink": payload.permlink,
            "title": payload.title,
            "body": payload.body,
            "json_metadata": payload.json_metadata.to_string(),
        }),
    )];

    if let Some(options) = &payload.options {
        operations.push(Operation::new(
            "comment_options",
            json!({
                "author": payload.author,
                "permlink": payload.permlink,
                "max_accepted_payout": options.max_accepted_payout,
                "percent_hbd": options.percent_hbd,
                "allow_votes": options.allow_votes,
                "allow_curation_rewards": options.allow_curation_rewards,
                "extensions": options.extensions,
            }),
        ));
    }

    let feed = Some(InvalidationTarget::key(["posts", "feed", payload.author.as_str()]));

    if !payload.is_reply() {
        return BroadcastRequest::new(operations, "Publish post")
            .with_activity(ActivityKind::Post)
            .invalidating(feed);
    }

    let parent_author = payload.parent_author.clone();
    BroadcastRequest::new(
        operations,
        format!("Reply to @{}/{}", payload.parent_author, payload.parent_permlink),
    )
    .with_activity(ActivityKind::Comment)
    .invalidating(feed)
    .invalidating(Some(InvalidationTarget::key([
        "posts".to_string(),
        "entry".to_string(),
        entry_path(&payload.parent_author, &payload.parent_permlink),
    ])))
    .invalidating(Some(InvalidationTarget::predicate(
        format!("discussions involving @{parent_author}"),
        move |key| {
            key.len() > 2
                && key[0] == "posts"
                && key[1] == "discussions"
                && key[2..].iter().any(|part| *part == parent_author)
        },
    )))
}

/// Vote on a post. `weight` is in basis points, negative to downvote.
pub fn vote(voter: &str, author: &str, permlink: &str, weight: i16) -> BroadcastRequest {
    let operations = vec![Operation::new(
        "vote",
        json!({
            "voter": voter,
            "author": author,
            "permlink": permlink,
            "weight": weight,
        }),
    )];

    BroadcastRequest::new(operations, format!("Vote on @{author}/{permlink}"))
        .with_activity(ActivityKind::Vote)
        .invalidating(Some(InvalidationTarget::key([
            "posts".to_string(),
            "entry".to_string(),
            entry_path(author, permlink),
        ])))
}

/// Reblog a post to the account's blog.
pub fn reblog(account: &str, author: &str, permlink: &str) -> BroadcastRequest {
    let payload = json!([
        "reblog",
        { "account": account, "author": author, "permlink": permlink }
    ]);
    let operations = vec![Operation::new(
        "custom_json",
        json!({
            "required_auths": [],
            "required_posting_auths": [account],
            "id": "follow",
            "json": payload.to_string(),
        }),
    )];

    BroadcastRequest::new(operations, format!("Reblog @{author}/{permlink}"))
        .with_activity(ActivityKind::Reblog)
        .invalidating(Some(InvalidationTarget::key(["posts", "blog", account])))
}

/// Transfer funds. `amount` carries precision and symbol, e.g. `1.000 HIVE`.
pub fn transfer(from: &str, to: &str, amount: &str, memo: &str) -> BroadcastRequest {
    let operations = vec![Operation::new(
        "transfer",
        json!({ "from": from, "to": to, "amount": amount, "memo": memo }),
    )];

    BroadcastRequest::new(operations, format!("Transfer {amount} to @{to}"))
        .invalidating(Some(InvalidationTarget::key(["accounts", from])))
        .invalidating(Some(InvalidationTarget::key(["wallet", from])))
}
