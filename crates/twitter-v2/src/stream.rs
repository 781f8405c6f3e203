//! Tweet stream entry points.
//!
//! Two feeds share one session implementation: the sampled volume stream
//! and the rule-filtered stream, whose rules are managed through
//! [`TwitterApiClient::add_stream_rules`] and friends.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, instrument};

use crate::{
    client::TwitterApiClient,
    error::{StreamError, TwitterResult},
    options::{StreamOptions, single_options},
    session::{StreamHandle, StreamSession},
    transport::ApiRequest,
    types::StreamTweet,
};

/// A streaming endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEndpoint {
    /// `GET /2/tweets/sample/stream`
    Sample,
    /// `GET /2/tweets/search/stream`
    Filtered,
}

impl StreamEndpoint {
    /// Name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sample => "sample_stream",
            Self::Filtered => "filtered_stream",
        }
    }

    const fn segments(self) -> &'static [&'static str] {
        match self {
            Self::Sample => &["2", "tweets", "sample", "stream"],
            Self::Filtered => &["2", "tweets", "search", "stream"],
        }
    }
}

impl TwitterApiClient {
    /// Connect to the sampled stream.
    ///
    /// Returns immediately; events and errors arrive on the given channels
    /// until the feed ends or [`StreamHandle::stop`] is called. Argument
    /// errors, and a call made outside a Tokio runtime, are returned before any
    /// connection is attempted.
    #[instrument(skip_all)]
    pub fn sample_stream(
        &self,
        events: mpsc::Sender<StreamTweet>,
        errors: mpsc::Sender<StreamError>,
        opts: &[StreamOptions],
    ) -> TwitterResult<StreamHandle> {
        self.open_stream(StreamEndpoint::Sample, events, errors, opts)
    }

    /// Connect to the filtered stream. Events carry `matching_rules`.
    ///
    /// Same contract as [`sample_stream`](Self::sample_stream).
    #[instrument(skip_all)]
    pub fn filtered_stream(
        &self,
        events: mpsc::Sender<StreamTweet>,
        errors: mpsc::Sender<StreamError>,
        opts: &[StreamOptions],
    ) -> TwitterResult<StreamHandle> {
        self.open_stream(StreamEndpoint::Filtered, events, errors, opts)
    }

    /// Build the authenticated request for `endpoint` without connecting.
    pub fn stream_request(
        &self,
        endpoint: StreamEndpoint,
        opts: &[StreamOptions],
    ) -> TwitterResult<ApiRequest> {
        let pairs = match single_options(endpoint.name(), opts)? {
            Some(options) => options.query_pairs()?,
            None => Vec::new(),
        };
        let url = self.url(endpoint.segments(), &pairs)?;
        self.authorized(ApiRequest::get(url))
    }

    fn open_stream(
        &self,
        endpoint: StreamEndpoint,
        events: mpsc::Sender<StreamTweet>,
        errors: mpsc::Sender<StreamError>,
        opts: &[StreamOptions],
    ) -> TwitterResult<StreamHandle> {
        let request = self.stream_request(endpoint, opts)?;
        info!(endpoint = endpoint.name(), url = %request.url, "Starting stream");

        StreamSession::start(
            Arc::clone(&self.transport),
            endpoint.name(),
            request,
            events,
            errors,
            &self.config.stream,
        )
    }
}
