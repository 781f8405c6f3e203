//! Shared test doubles for the stream integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use reqwest::StatusCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use twitter_v2::{
    ApiRequest, RawResponse, Transport, TwitterApiClient, TwitterConfig, TwitterError,
    TwitterResult,
};

static INIT: Once = Once::new();

/// Initialize tracing for tests; honours `RUST_LOG`.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,twitter_v2=debug"));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .compact(),
            )
            .init();
    });
}

/// Ordered record of what happened to a connection.
#[derive(Debug, Clone, Default)]
pub struct Timeline(Arc<Mutex<Vec<String>>>);

impl Timeline {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == entry)
    }
}

/// One scripted answer of [`RecordingTransport`].
#[derive(Debug)]
pub enum Reply {
    /// Respond with `status` and these body chunks, then end or hang.
    Body {
        status: StatusCode,
        chunks: Vec<TwitterResult<Bytes>>,
        hang: bool,
    },
    /// Fail before any response arrives.
    Refuse,
}

impl Reply {
    /// 200 response whose body ends after `lines`.
    pub fn lines(lines: &[&str]) -> Self {
        Self::Body {
            status: StatusCode::OK,
            chunks: lines
                .iter()
                .map(|l| Ok(Bytes::from(format!("{l}\r\n"))))
                .collect(),
            hang: false,
        }
    }

    /// 200 response that sends `lines` and then stays open forever.
    pub fn open(lines: &[&str]) -> Self {
        match Self::lines(lines) {
            Self::Body { status, chunks, .. } => Self::Body {
                status,
                chunks,
                hang: true,
            },
            refuse @ Self::Refuse => refuse,
        }
    }

    pub fn status(status: u16) -> Self {
        Self::Body {
            status: StatusCode::from_u16(status).unwrap(),
            chunks: vec![Ok(Bytes::from_static(b"{\"title\":\"Forbidden\"}"))],
            hang: false,
        }
    }
}

/// Transport double that serves scripted replies and records a timeline.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub timeline: Timeline,
    calls: AtomicUsize,
    replies: Mutex<VecDeque<Reply>>,
}

impl RecordingTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            timeline: Timeline::default(),
            calls: AtomicUsize::new(0),
            replies: Mutex::new(replies.into_iter().collect()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, request: ApiRequest) -> TwitterResult<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.timeline.push("request");

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left");

        match reply {
            Reply::Refuse => Err(TwitterError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            Reply::Body {
                status,
                chunks,
                hang,
            } => {
                let body = stream::iter(chunks);
                let body = if hang {
                    body.chain(stream::pending()).boxed()
                } else {
                    body.boxed()
                };
                Ok(RawResponse::new(
                    status,
                    request.url,
                    TrackedBody {
                        inner: body,
                        timeline: self.timeline.clone(),
                        polled: false,
                    }
                    .boxed(),
                ))
            }
        }
    }
}

/// Body wrapper that records its first poll and its release.
struct TrackedBody {
    inner: Pin<Box<dyn Stream<Item = TwitterResult<Bytes>> + Send>>,
    timeline: Timeline,
    polled: bool,
}

impl Stream for TrackedBody {
    type Item = TwitterResult<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if !self.polled {
            self.polled = true;
            self.timeline.push("body polled");
        }
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.timeline.push("closed");
    }
}

/// Client wired to `transport` with a test bearer token.
pub fn client(transport: Arc<RecordingTransport>) -> TwitterApiClient {
    client_with(transport, TwitterConfig::with_bearer_token("test_bearer_token"))
}

pub fn client_with(transport: Arc<RecordingTransport>, config: TwitterConfig) -> TwitterApiClient {
    TwitterApiClient::with_transport(config, transport).unwrap()
}

/// Minimal stream event JSON.
pub fn tweet(id: u32) -> String {
    format!("{{\"data\":{{\"id\":\"{id}\",\"text\":\"tweet {id}\"}}}}")
}
