//! Twitter API v2 payload types.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Standard v2 response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterResponse<T> {
    pub data: Option<T>,

    /// Expanded objects requested through `expansions`
    #[serde(default)]
    pub includes: Option<Includes>,

    #[serde(default)]
    pub meta: Option<ResponseMeta>,

    /// Partial errors reported next to successful data
    #[serde(default)]
    pub errors: Option<Vec<ApiProblem>>,
}

/// Objects expanded under `includes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default)]
    pub tweets: Vec<Tweet>,

    #[serde(default)]
    pub media: Vec<Media>,

    #[serde(default)]
    pub places: Vec<Place>,

    #[serde(default)]
    pub polls: Vec<Poll>,
}

impl Includes {
    /// Look up an expanded user by ID.
    #[must_use]
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

/// Response metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub result_count: Option<u32>,

    #[serde(default)]
    pub next_token: Option<String>,

    #[serde(default)]
    pub newest_id: Option<String>,

    #[serde(default)]
    pub oldest_id: Option<String>,
}

/// Problem object, used both for partial errors and for error bodies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiProblem {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub detail: Option<String>,

    /// Problem type URI
    #[serde(default, rename = "type")]
    pub problem_type: Option<String>,

    /// Legacy `message` field, still sent by some endpoints
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub resource_id: Option<String>,

    #[serde(default)]
    pub parameter: Option<String>,
}

/// Top-level error body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub detail: Option<String>,

    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

impl ErrorBody {
    /// Best human-readable message in the body.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .or_else(|| {
                self.errors.iter().find_map(|p| {
                    p.message
                        .clone()
                        .or_else(|| p.detail.clone())
                        .or_else(|| p.title.clone())
                })
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tweets
// ─────────────────────────────────────────────────────────────────────────────

/// Tweet object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,

    pub text: String,

    #[serde(default)]
    pub author_id: Option<String>,

    /// ISO 8601 creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub conversation_id: Option<String>,

    #[serde(default)]
    pub in_reply_to_user_id: Option<String>,

    #[serde(default)]
    pub referenced_tweets: Option<Vec<ReferencedTweet>>,

    #[serde(default)]
    pub attachments: Option<Attachments>,

    #[serde(default)]
    pub public_metrics: Option<TweetPublicMetrics>,

    /// BCP47 language tag
    #[serde(default)]
    pub lang: Option<String>,

    #[serde(default)]
    pub possibly_sensitive: Option<bool>,

    #[serde(default)]
    pub edit_history_tweet_ids: Option<Vec<String>>,

    /// Fields this crate does not model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Reply, quote or retweet reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencedTweet {
    /// `retweeted`, `quoted` or `replied_to`
    #[serde(rename = "type")]
    pub ref_type: String,

    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachments {
    #[serde(default)]
    pub media_keys: Option<Vec<String>>,

    #[serde(default)]
    pub poll_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetPublicMetrics {
    pub retweet_count: u64,
    pub reply_count: u64,
    pub like_count: u64,
    pub quote_count: u64,
    #[serde(default)]
    pub impression_count: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Users, media, places, polls
// ─────────────────────────────────────────────────────────────────────────────

/// User object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    /// Display name
    pub name: String,

    /// Handle without the leading `@`
    pub username: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub profile_image_url: Option<String>,

    #[serde(default)]
    pub verified: Option<bool>,

    #[serde(default)]
    pub protected: Option<bool>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub public_metrics: Option<UserPublicMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublicMetrics {
    pub followers_count: u64,
    pub following_count: u64,
    pub tweet_count: u64,
    pub listed_count: u64,
}

/// Media object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub media_key: String,

    /// `photo`, `video` or `animated_gif`
    #[serde(rename = "type")]
    pub media_type: String,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub preview_image_url: Option<String>,

    #[serde(default)]
    pub alt_text: Option<String>,
}

/// Place object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: String,

    pub full_name: String,

    #[serde(default)]
    pub country_code: Option<String>,

    #[serde(default)]
    pub place_type: Option<String>,
}

/// Poll object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,

    pub options: Vec<PollOption>,

    #[serde(default)]
    pub voting_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub position: u32,
    pub label: String,
    pub votes: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Streams
// ─────────────────────────────────────────────────────────────────────────────

/// One event from a tweet stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamTweet {
    pub data: Tweet,

    #[serde(default)]
    pub includes: Option<Includes>,

    /// Rules that matched; only sent by the filtered stream
    #[serde(default)]
    pub matching_rules: Option<Vec<MatchingRule>>,
}

/// Rule that caused a filtered-stream match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingRule {
    pub id: String,

    #[serde(default)]
    pub tag: Option<String>,
}

/// Filtered stream rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRule {
    /// Assigned by the server; omitted when adding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Rule query
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl StreamRule {
    /// Create a rule to add.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: None,
            value: value.into(),
            tag: None,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Response of the rules endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRulesResponse {
    #[serde(default)]
    pub data: Option<Vec<StreamRule>>,

    #[serde(default)]
    pub meta: Option<StreamRulesMeta>,

    #[serde(default)]
    pub errors: Option<Vec<ApiProblem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRulesMeta {
    /// Server timestamp
    pub sent: String,

    #[serde(default)]
    pub result_count: Option<u32>,

    #[serde(default)]
    pub summary: Option<RulesSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesSummary {
    #[serde(default)]
    pub created: Option<u32>,
    #[serde(default)]
    pub not_created: Option<u32>,
    #[serde(default)]
    pub deleted: Option<u32>,
    #[serde(default)]
    pub not_deleted: Option<u32>,
    #[serde(default)]
    pub valid: Option<u32>,
    #[serde(default)]
    pub invalid: Option<u32>,
}

/// App-only token response from `/oauth2/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
}
