//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TwitterError, TwitterResult};

/// Configuration for the Twitter API client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    /// OAuth 2.0 app-only Bearer Token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,

    /// Consumer Key (API Key), used to obtain a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_key: Option<String>,

    /// Consumer Secret (API Secret), used to obtain a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_secret: Option<String>,

    /// Base URL for the Twitter API v2 (default: https://api.twitter.com)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Timeout for single-shot requests
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// Streaming connection settings
    #[serde(default)]
    pub stream: StreamConfig,
}

fn default_api_url() -> String {
    "https://api.twitter.com".into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl TwitterConfig {
    /// Create a configuration with a bearer token and default endpoints.
    #[must_use]
    pub fn with_bearer_token(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Check the configuration for values that can never work.
    pub fn validate(&self) -> TwitterResult<()> {
        if self.api_url.trim().is_empty() {
            return Err(TwitterError::Config("api_url must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(TwitterError::Config("timeout must be non-zero".into()));
        }
        self.stream.validate()
    }

    pub(crate) fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            consumer_key: None,
            consumer_secret: None,
            api_url: default_api_url(),
            timeout: default_timeout(),
            stream: StreamConfig::default(),
        }
    }
}

/// What the receive loop does after a frame fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorPolicy {
    /// Report the error and keep reading.
    #[default]
    Continue,
    /// Report the error and close the connection.
    Abort,
}

/// Streaming connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Timeout for establishing the connection
    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Maximum silence between reads before the connection is considered stalled.
    /// The feed sends a keep-alive every 20 seconds.
    #[serde(default = "default_read_timeout", with = "duration_secs")]
    pub read_timeout: Duration,

    /// Largest single frame the decoder will buffer
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Policy for malformed frames
    #[serde(default)]
    pub decode_errors: DecodeErrorPolicy,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(90)
}

const fn default_max_frame_bytes() -> usize {
    1024 * 1024
}

impl StreamConfig {
    fn validate(&self) -> TwitterResult<()> {
        if self.max_frame_bytes == 0 {
            return Err(TwitterError::Config(
                "stream.max_frame_bytes must be non-zero".into(),
            ));
        }
        if self.read_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(TwitterError::Config(
                "stream timeouts must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            max_frame_bytes: default_max_frame_bytes(),
            decode_errors: DecodeErrorPolicy::default(),
        }
    }
}

/// Rate limit information from Twitter API headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum number of requests allowed in the window
    pub limit: Option<u32>,

    /// Remaining requests in the current window
    pub remaining: Option<u32>,

    /// Unix timestamp when the rate limit resets
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    /// Parse rate limit info from response headers.
    #[must_use]
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        fn parse<T: std::str::FromStr>(
            headers: &reqwest::header::HeaderMap,
            name: &str,
        ) -> Option<T> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        }

        Self {
            limit: parse(headers, "x-rate-limit-limit"),
            remaining: parse(headers, "x-rate-limit-remaining"),
            reset: parse(headers, "x-rate-limit-reset"),
        }
    }

    /// Check if we're rate limited (remaining == 0).
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}
