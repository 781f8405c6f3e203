//! HTTP transport seam.
//!
//! Requests are plain values built by pure functions; a [`Transport`] turns
//! one into a [`RawResponse`] whose body is a byte stream. Dropping the body
//! releases the underlying connection.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{StreamExt, TryStreamExt, stream::BoxStream};
use reqwest::{
    Client, Method, StatusCode, Url,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde::Serialize;
use tracing::debug;

use crate::{
    config::TwitterConfig,
    error::{TwitterError, TwitterResult},
};

/// Response body as a stream of chunks.
pub type BodyStream = BoxStream<'static, TwitterResult<Bytes>>;

/// One HTTP request, described by value.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Total time allowed for the request; `None` leaves it open-ended.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Create a request with no headers or body.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Create a GET request.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a POST request.
    #[must_use]
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a header, replacing any previous value.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach `Authorization: Bearer <token>`.
    pub fn bearer_auth(self, token: &str) -> TwitterResult<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| TwitterError::Config("bearer token contains invalid characters".into()))?;
        value.set_sensitive(true);
        Ok(self.header(AUTHORIZATION, value))
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> TwitterResult<Self> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self.header(CONTENT_TYPE, HeaderValue::from_static("application/json")))
    }

    /// Encode `pairs` as an `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.body = Some(Bytes::from(encoded));
        self.header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded;charset=UTF-8"),
        )
    }

    /// Bound the total request time.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Status, headers and a streaming body.
pub struct RawResponse {
    pub status: StatusCode,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl RawResponse {
    /// Create a response with empty headers.
    #[must_use]
    pub fn new(status: StatusCode, url: Url, body: BodyStream) -> Self {
        Self {
            status,
            url,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Read the whole body into memory.
    pub async fn bytes(self) -> TwitterResult<Bytes> {
        let buf = self
            .body
            .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await?;
        Ok(buf.freeze())
    }
}

/// Issues requests on behalf of the client.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send `request` and return as soon as the response head is available.
    async fn execute(&self, request: ApiRequest) -> TwitterResult<RawResponse>;
}

/// [`Transport`] backed by a shared `reqwest` client.
///
/// The client has no total timeout so streams can stay open indefinitely;
/// single-shot requests carry their own timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport from configuration.
    pub fn new(config: &TwitterConfig) -> TwitterResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.stream.connect_timeout)
            .read_timeout(config.stream.read_timeout)
            .user_agent(format!("twitter-v2/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> TwitterResult<RawResponse> {
        let ApiRequest {
            method,
            url,
            headers,
            body,
            timeout,
        } = request;

        debug!(%method, url = %url, "Sending request");

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(TwitterError::from).boxed();

        Ok(RawResponse {
            status,
            url,
            headers,
            body,
        })
    }
}
