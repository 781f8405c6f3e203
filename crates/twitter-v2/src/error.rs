//! Twitter-specific error types.

use thiserror::Error;

use crate::config::RateLimitInfo;

/// Errors returned synchronously by client calls.
#[derive(Error, Debug)]
pub enum TwitterError {
    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading a response body failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Twitter API returned a non-success status
    #[error("{api} failed: {status} {status_text} ({url}): {message}")]
    Api {
        /// Name of the API call, e.g. `tweet_lookup`
        api: &'static str,
        status: u16,
        status_text: String,
        /// Request URL, including the query string
        url: String,
        message: String,
        /// Whatever JSON could still be decoded from the error body
        partial: Option<serde_json::Value>,
        rate_limit: RateLimitInfo,
    },

    /// Invalid arguments or configuration, detected before any I/O
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TwitterError {
    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this is a configuration error raised before any network call.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type for Twitter operations.
pub type TwitterResult<T> = Result<T, TwitterError>;

/// Failure to produce one event from the feed's byte stream.
#[derive(Error, Debug)]
pub enum FrameError {
    /// The body could not be read; the connection is unusable.
    #[error("read failed: {0}")]
    Read(#[source] TwitterError),

    /// A frame was not valid JSON or did not match the event schema.
    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// A frame grew past the configured limit without completing.
    #[error("frame exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// The stream ended part-way through a frame.
    #[error("stream ended inside a frame")]
    Truncated,

    /// The feed delivered an error object instead of an event.
    #[error("platform reported: {0}")]
    Remote(String),
}

impl FrameError {
    /// Whether the decoder can keep reading after this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Read(_))
    }
}

/// What went wrong on a stream.
#[derive(Error, Debug)]
pub enum StreamErrorKind {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(#[source] TwitterError),

    /// The feed answered with a non-success status.
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    /// A frame could not be read or decoded.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Error delivered on a stream's error channel.
#[derive(Error, Debug)]
#[error("{endpoint} ({url}): {kind}")]
pub struct StreamError {
    /// Stream endpoint name, e.g. `sample_stream`
    pub endpoint: &'static str,
    /// Request URL, including the query string
    pub url: String,
    #[source]
    pub kind: StreamErrorKind,
}

impl StreamError {
    pub(crate) fn new(
        endpoint: &'static str,
        url: impl Into<String>,
        kind: impl Into<StreamErrorKind>,
    ) -> Self {
        Self {
            endpoint,
            url: url.into(),
            kind: kind.into(),
        }
    }

    /// Whether the receive loop exits after reporting this error.
    ///
    /// Decode-level errors are only fatal under
    /// [`DecodeErrorPolicy::Abort`](crate::DecodeErrorPolicy::Abort), which
    /// this method does not know about.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match &self.kind {
            StreamErrorKind::Connect(_) | StreamErrorKind::Status { .. } => true,
            StreamErrorKind::Frame(frame) => !frame.is_recoverable(),
        }
    }

    /// HTTP status, for errors raised at connection time.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            StreamErrorKind::Status { status, .. } => Some(*status),
            StreamErrorKind::Connect(e) => e.status(),
            StreamErrorKind::Frame(_) => None,
        }
    }
}
