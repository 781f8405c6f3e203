//! Twitter REST API client.
//!
//! Every call follows the same cycle: check arguments, build the URL, attach
//! the bearer token, send once, decode one JSON body. Non-success statuses
//! become [`TwitterError::Api`]. Nothing is retried.

use std::sync::Arc;

use reqwest::Url;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::{RateLimitInfo, TwitterConfig},
    error::{TwitterError, TwitterResult},
    oauth2,
    options::{FieldSelection, append_query, single_options},
    transport::{ApiRequest, ReqwestTransport, Transport},
    types::{
        ErrorBody, StreamRule, StreamRulesResponse, TokenResponse, Tweet, TwitterResponse, User,
    },
};

/// Largest ID list accepted by the batch lookup endpoints.
const MAX_LOOKUP_IDS: usize = 100;

/// Twitter API v2 client.
#[derive(Debug, Clone)]
pub struct TwitterApiClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: TwitterConfig,
    bearer_token: Option<String>,
}

impl TwitterApiClient {
    /// Create a client that talks HTTP through `reqwest`.
    pub fn new(config: TwitterConfig) -> TwitterResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client on top of a custom transport.
    pub fn with_transport(
        config: TwitterConfig,
        transport: Arc<dyn Transport>,
    ) -> TwitterResult<Self> {
        config.validate()?;
        Url::parse(config.base_url())
            .map_err(|e| TwitterError::Config(format!("invalid api_url: {e}")))?;

        Ok(Self {
            transport,
            bearer_token: config.bearer_token.clone(),
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &TwitterConfig {
        &self.config
    }

    /// Bearer token currently used for requests.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// Obtain an app-only bearer token from the consumer credentials.
    ///
    /// Does nothing if a bearer token is already set.
    #[instrument(skip(self))]
    pub async fn authenticate(&mut self) -> TwitterResult<()> {
        if self.bearer_token.is_some() {
            return Ok(());
        }

        let (Some(key), Some(secret)) = (
            self.config.consumer_key.as_deref(),
            self.config.consumer_secret.as_deref(),
        ) else {
            return Err(TwitterError::Config(
                "consumer_key and consumer_secret are required to obtain a bearer token".into(),
            ));
        };

        let url = self.url(&["oauth2", "token"], &[])?;
        let request = oauth2::token_request(url, key, secret)?;
        let response: TokenResponse = self.invoke(oauth2::TOKEN_API, request).await?;
        let token = oauth2::bearer_from_response(response)?;

        info!("Obtained app-only bearer token");
        self.bearer_token = Some(token);
        Ok(())
    }

    /// Build `<api_url>/<segments...>?<pairs>`.
    ///
    /// Segments are percent-encoded, so identifiers cannot alter the path.
    pub(crate) fn url(
        &self,
        segments: &[&str],
        pairs: &[(&'static str, String)],
    ) -> TwitterResult<Url> {
        let mut url = Url::parse(self.config.base_url())
            .map_err(|e| TwitterError::Config(format!("invalid api_url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| TwitterError::Config("api_url cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        append_query(&mut url, pairs);
        Ok(url)
    }

    /// Attach the bearer token to `request`.
    pub(crate) fn authorized(&self, request: ApiRequest) -> TwitterResult<ApiRequest> {
        let token = self
            .bearer_token
            .as_deref()
            .ok_or_else(|| TwitterError::Config("Bearer token required".into()))?;
        request.bearer_auth(token)
    }

    /// Send one request and decode its JSON body.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        api: &'static str,
        mut request: ApiRequest,
    ) -> TwitterResult<T> {
        if request.timeout.is_none() {
            request.timeout = Some(self.config.timeout);
        }
        let url = request.url.to_string();

        debug!(api, "Making Twitter API request");
        let response = self.transport.execute(request).await?;
        let status = response.status;

        let rate_limit = RateLimitInfo::from_headers(&response.headers);
        if rate_limit.is_exhausted() {
            debug!(api, reset = ?rate_limit.reset, "Rate limit exhausted");
        }

        let bytes = response.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(TwitterError::from);
        }

        let partial: Option<serde_json::Value> = serde_json::from_slice(&bytes).ok();
        let message = partial
            .clone()
            .and_then(|value| serde_json::from_value::<ErrorBody>(value).ok())
            .and_then(|body| body.message())
            .or_else(|| {
                let text = String::from_utf8_lossy(&bytes).trim().to_string();
                (!text.is_empty()).then_some(text)
            })
            .unwrap_or_else(|| "Unknown error".into());

        warn!(api, status = status.as_u16(), %message, "Twitter API request failed");

        Err(TwitterError::Api {
            api,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            url,
            message,
            partial,
            rate_limit,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        api: &'static str,
        segments: &[&str],
        pairs: &[(&'static str, String)],
    ) -> TwitterResult<T> {
        let request = self.authorized(ApiRequest::get(self.url(segments, pairs)?))?;
        self.invoke(api, request).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tweet endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a tweet by ID.
    #[instrument(skip(self, opts))]
    pub async fn get_tweet(
        &self,
        tweet_id: &str,
        opts: &[FieldSelection],
    ) -> TwitterResult<TwitterResponse<Tweet>> {
        const API: &str = "tweet_lookup";
        let pairs = selection_pairs(API, opts)?;
        require_id(API, "tweet_id", tweet_id)?;
        self.get(API, &["2", "tweets", tweet_id], &pairs).await
    }

    /// Get multiple tweets by ID.
    #[instrument(skip(self, opts))]
    pub async fn get_tweets(
        &self,
        tweet_ids: &[&str],
        opts: &[FieldSelection],
    ) -> TwitterResult<TwitterResponse<Vec<Tweet>>> {
        const API: &str = "tweets_lookup";
        let mut pairs = selection_pairs(API, opts)?;
        pairs.insert(0, ("ids", id_list(API, tweet_ids)?));
        self.get(API, &["2", "tweets"], &pairs).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a user by ID.
    #[instrument(skip(self, opts))]
    pub async fn get_user(
        &self,
        user_id: &str,
        opts: &[FieldSelection],
    ) -> TwitterResult<TwitterResponse<User>> {
        const API: &str = "user_lookup";
        let pairs = selection_pairs(API, opts)?;
        require_id(API, "user_id", user_id)?;
        self.get(API, &["2", "users", user_id], &pairs).await
    }

    /// Get a user by username.
    #[instrument(skip(self, opts))]
    pub async fn get_user_by_username(
        &self,
        username: &str,
        opts: &[FieldSelection],
    ) -> TwitterResult<TwitterResponse<User>> {
        const API: &str = "username_lookup";
        let pairs = selection_pairs(API, opts)?;
        let username = username.trim_start_matches('@');
        require_id(API, "username", username)?;
        self.get(API, &["2", "users", "by", "username", username], &pairs)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stream rules endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// Get filtered stream rules, optionally restricted to `rule_ids`.
    #[instrument(skip(self))]
    pub async fn get_stream_rules(&self, rule_ids: &[&str]) -> TwitterResult<StreamRulesResponse> {
        const API: &str = "stream_rules_lookup";
        let pairs = if rule_ids.is_empty() {
            Vec::new()
        } else {
            vec![("ids", id_list(API, rule_ids)?)]
        };
        self.get(API, RULES_PATH, &pairs).await
    }

    /// Add filtered stream rules. With `dry_run` the rules are only validated.
    #[instrument(skip(self, rules), fields(count = rules.len()))]
    pub async fn add_stream_rules(
        &self,
        rules: &[StreamRule],
        dry_run: bool,
    ) -> TwitterResult<StreamRulesResponse> {
        const API: &str = "stream_rules_add";
        if rules.is_empty() {
            return Err(TwitterError::Config(format!("{API}: at least one rule is required")));
        }
        if let Some(rule) = rules.iter().find(|r| r.value.trim().is_empty()) {
            return Err(TwitterError::Config(format!(
                "{API}: rule value must not be empty (tag: {:?})",
                rule.tag
            )));
        }

        let pairs = if dry_run {
            vec![("dry_run", "true".to_string())]
        } else {
            Vec::new()
        };
        let request = ApiRequest::post(self.url(RULES_PATH, &pairs)?).json(&AddRules { add: rules })?;
        self.invoke(API, self.authorized(request)?).await
    }

    /// Delete filtered stream rules by ID.
    #[instrument(skip(self))]
    pub async fn delete_stream_rules(&self, rule_ids: &[&str]) -> TwitterResult<StreamRulesResponse> {
        const API: &str = "stream_rules_delete";
        if rule_ids.is_empty() {
            return Err(TwitterError::Config(format!("{API}: at least one rule ID is required")));
        }
        for id in rule_ids {
            require_id(API, "rule_id", id)?;
        }

        let body = DeleteRules {
            delete: DeleteIds { ids: rule_ids },
        };
        let request = ApiRequest::post(self.url(RULES_PATH, &[])?).json(&body)?;
        self.invoke(API, self.authorized(request)?).await
    }
}

const RULES_PATH: &[&str] = &["2", "tweets", "search", "stream", "rules"];

#[derive(Serialize)]
struct AddRules<'a> {
    add: &'a [StreamRule],
}

#[derive(Serialize)]
struct DeleteRules<'a> {
    delete: DeleteIds<'a>,
}

#[derive(Serialize)]
struct DeleteIds<'a> {
    ids: &'a [&'a str],
}

fn selection_pairs(
    api: &str,
    opts: &[FieldSelection],
) -> TwitterResult<Vec<(&'static str, String)>> {
    Ok(single_options(api, opts)?
        .map(FieldSelection::query_pairs)
        .unwrap_or_default())
}

fn require_id(api: &str, name: &str, value: &str) -> TwitterResult<()> {
    if value.trim().is_empty() {
        return Err(TwitterError::Config(format!("{api}: {name} is required")));
    }
    Ok(())
}

fn id_list(api: &str, ids: &[&str]) -> TwitterResult<String> {
    if ids.is_empty() {
        return Err(TwitterError::Config(format!("{api}: at least one ID is required")));
    }
    if ids.len() > MAX_LOOKUP_IDS {
        return Err(TwitterError::Config(format!(
            "{api}: at most {MAX_LOOKUP_IDS} IDs per request, got {}",
            ids.len()
        )));
    }
    for id in ids {
        require_id(api, "id", id)?;
    }
    Ok(ids.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Expansion, TweetField};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path, query_param},
    };

    /// Create a test config pointing to the mock server.
    fn test_config(mock_server: &MockServer) -> TwitterConfig {
        TwitterConfig {
            bearer_token: Some("test_bearer_token".into()),
            api_url: mock_server.uri(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_tweet_with_fields() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/1234"))
            .and(header("Authorization", "Bearer test_bearer_token"))
            .and(query_param("expansions", "author_id"))
            .and(query_param("tweet.fields", "created_at,lang"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "id": "1234", "text": "Hello world", "author_id": "42" },
                "includes": { "users": [{ "id": "42", "name": "Test User", "username": "testuser" }] }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TwitterApiClient::new(test_config(&mock_server)).unwrap();
        let selection = FieldSelection::new()
            .expansions([Expansion::AuthorId])
            .tweet_fields([TweetField::CreatedAt, TweetField::Lang]);

        let response = client.get_tweet("1234", &[selection]).await.unwrap();
        let tweet = response.data.unwrap();
        assert_eq!(tweet.text, "Hello world");
        assert_eq!(response.includes.unwrap().user("42").unwrap().username, "testuser");
    }

    #[tokio::test]
    async fn test_get_tweets_joins_ids() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets"))
            .and(query_param("ids", "1,2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "1", "text": "a" }, { "id": "2", "text": "b" }]
            })))
            .mount(&mock_server)
            .await;

        let client = TwitterApiClient::new(test_config(&mock_server)).unwrap();
        let response = client.get_tweets(&["1", "2"], &[]).await.unwrap();
        assert_eq!(response.data.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_user_by_username_strips_at() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/by/username/testuser"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "id": "42", "name": "Test User", "username": "testuser" }
            })))
            .mount(&mock_server)
            .await;

        let client = TwitterApiClient::new(test_config(&mock_server)).unwrap();
        let user = client
            .get_user_by_username("@testuser", &[])
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(user.id, "42");
    }

    #[tokio::test]
    async fn test_error_unauthorized_carries_context() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/42"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "title": "Unauthorized",
                "detail": "Unauthorized",
                "type": "about:blank",
                "status": 401
            })))
            .mount(&mock_server)
            .await;

        let client = TwitterApiClient::new(test_config(&mock_server)).unwrap();
        let err = client.get_user("42", &[]).await.unwrap_err();

        match err {
            TwitterError::Api {
                api,
                status,
                status_text,
                url,
                message,
                partial,
                ..
            } => {
                assert_eq!(api, "user_lookup");
                assert_eq!(status, 401);
                assert_eq!(status_text, "Unauthorized");
                assert!(url.ends_with("/2/users/42"));
                assert_eq!(message, "Unauthorized");
                assert_eq!(partial.unwrap()["status"], 401);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limited_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/1"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("x-rate-limit-remaining", "0")
                    .insert_header("x-rate-limit-reset", "1700000000")
                    .set_body_string("Too Many Requests"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TwitterApiClient::new(test_config(&mock_server)).unwrap();
        let err = client.get_tweet("1", &[]).await.unwrap_err();
        match err {
            TwitterError::Api {
                status,
                message,
                partial,
                rate_limit,
                ..
            } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Too Many Requests");
                assert!(partial.is_none());
                assert!(rate_limit.is_exhausted());
                assert_eq!(rate_limit.reset, Some(1_700_000_000));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_and_delete_stream_rules() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets/search/stream/rules"))
            .and(query_param("dry_run", "true"))
            .and(body_json(serde_json::json!({
                "add": [{ "value": "cat has:images", "tag": "cats" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "1", "value": "cat has:images", "tag": "cats" }],
                "meta": { "sent": "2024-01-01T00:00:00.000Z", "summary": { "created": 1, "not_created": 0, "valid": 1, "invalid": 0 } }
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/tweets/search/stream/rules"))
            .and(body_json(serde_json::json!({ "delete": { "ids": ["1"] } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": { "sent": "2024-01-01T00:00:01.000Z", "summary": { "deleted": 1, "not_deleted": 0 } }
            })))
            .mount(&mock_server)
            .await;

        let client = TwitterApiClient::new(test_config(&mock_server)).unwrap();

        let added = client
            .add_stream_rules(&[StreamRule::new("cat has:images").with_tag("cats")], true)
            .await
            .unwrap();
        assert_eq!(added.data.unwrap()[0].id.as_deref(), Some("1"));

        let deleted = client.delete_stream_rules(&["1"]).await.unwrap();
        let summary = deleted.meta.unwrap().summary.unwrap();
        assert_eq!(summary.deleted, Some(1));
    }

    #[tokio::test]
    async fn test_argument_errors_make_no_requests() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = TwitterApiClient::new(test_config(&mock_server)).unwrap();
        let two = [FieldSelection::new(), FieldSelection::new()];

        assert!(client.get_tweet("1", &two).await.unwrap_err().is_config());
        assert!(client.get_tweet("", &[]).await.unwrap_err().is_config());
        assert!(client.get_tweets(&[], &[]).await.unwrap_err().is_config());
        assert!(client.get_user("42", &two).await.unwrap_err().is_config());
        assert!(client.get_user_by_username("@", &[]).await.unwrap_err().is_config());
        assert!(client.add_stream_rules(&[], false).await.unwrap_err().is_config());
        assert!(client.delete_stream_rules(&[]).await.unwrap_err().is_config());
    }

    #[tokio::test]
    async fn test_missing_bearer_token() {
        let client = TwitterApiClient::new(TwitterConfig::default()).unwrap();
        let err = client.get_tweet("1", &[]).await.unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let client =
            TwitterApiClient::new(TwitterConfig::with_bearer_token("t")).unwrap();
        let url = client.url(&["2", "users", "a/../b"], &[]).unwrap();
        assert_eq!(url.path(), "/2/users/a%2F..%2Fb");
    }
}
