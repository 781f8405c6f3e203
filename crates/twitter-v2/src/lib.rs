//! Typed client for the Twitter/X API v2.
//!
//! Single-shot endpoints (tweet and user lookup, filtered stream rules,
//! app-only token) send one request and decode one JSON body. The two tweet
//! streams keep a connection open indefinitely and deliver events through
//! caller-supplied channels.
//!
//! ## Streaming
//!
//! ```rust,ignore
//! use tokio::sync::mpsc;
//! use twitter_v2::{TwitterApiClient, TwitterConfig};
//!
//! let client = TwitterApiClient::new(TwitterConfig::with_bearer_token(token))?;
//! let (event_tx, mut events) = mpsc::channel(256);
//! let (error_tx, mut errors) = mpsc::channel(16);
//!
//! let handle = client.filtered_stream(event_tx, error_tx, &[])?;
//! while let Some(tweet) = events.recv().await {
//!     println!("{}: {}", tweet.data.id, tweet.data.text);
//! }
//! handle.stop().await;
//! ```
//!
//! The library never reconnects. A dropped connection shows up on the error
//! channel and the caller decides whether to open the stream again.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod error;
pub mod fields;
mod frame;
mod oauth2;
mod options;
mod session;
mod stream;
pub mod transport;
pub mod types;

pub use client::TwitterApiClient;
pub use config::{DecodeErrorPolicy, RateLimitInfo, StreamConfig, TwitterConfig};
pub use error::{FrameError, StreamError, StreamErrorKind, TwitterError, TwitterResult};
pub use frame::FrameDecoder;
pub use oauth2::basic_credentials;
pub use options::{FieldSelection, StreamOptions, single_options};
pub use session::{StreamHandle, StreamSession};
pub use stream::StreamEndpoint;
pub use transport::{ApiRequest, RawResponse, ReqwestTransport, Transport};
