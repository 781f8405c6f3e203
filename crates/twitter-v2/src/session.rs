//! Receive loop for one streaming connection.
//!
//! A session runs on its own task. Decoded events go to the caller's event
//! channel and every failure goes to the caller's error channel; nothing is
//! retried. The caller ends the session through [`StreamHandle::stop`].
//!
//! # Cancellation
//!
//! Stopping is cooperative. The loop checks the stop signal before each read
//! and also races it against a pending read or channel push, so `stop` returns
//! even when the feed is silent or the consumer has stopped receiving. An
//! event that was already pushed before the signal fired may still be sitting
//! in the channel; nothing is pushed after the loop has observed the signal.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::{
    config::{DecodeErrorPolicy, StreamConfig},
    error::{StreamError, StreamErrorKind, TwitterError, TwitterResult},
    frame::FrameDecoder,
    transport::{ApiRequest, Transport},
};

/// Caller's handle on a running stream.
///
/// Dropping the handle without calling [`stop`](Self::stop) also signals the
/// loop, which then winds down in the background.
#[derive(Debug)]
pub struct StreamHandle {
    endpoint: &'static str,
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Signal the loop to stop and wait until it has exited.
    ///
    /// When this returns the connection has been released and no further
    /// event or error will be sent by this stream.
    pub async fn stop(mut self) {
        info!(endpoint = self.endpoint, "Stopping stream");
        self.cancel.send_replace(true);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(endpoint = self.endpoint, error = %e, "Stream task failed");
            }
        }
    }

    /// Whether the receive loop has already exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Name of the stream endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &'static str {
        self.endpoint
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

/// Why the receive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Stopped,
    EndOfStream,
    Failed,
    ConsumerGone,
}

/// State owned by one stream task.
pub struct StreamSession<T> {
    endpoint: &'static str,
    url: String,
    config: StreamConfig,
    events: mpsc::Sender<T>,
    errors: mpsc::Sender<StreamError>,
    cancel: watch::Receiver<bool>,
}

impl<T> StreamSession<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Open `request` on a new task and return its handle.
    ///
    /// Fails with [`TwitterError::Config`] outside a Tokio runtime. The task
    /// runs inside the caller's current span.
    pub fn start(
        transport: Arc<dyn Transport>,
        endpoint: &'static str,
        request: ApiRequest,
        events: mpsc::Sender<T>,
        errors: mpsc::Sender<StreamError>,
        config: &StreamConfig,
    ) -> TwitterResult<StreamHandle> {
        let runtime = Handle::try_current().map_err(|_| {
            TwitterError::Config(format!("{endpoint}: streams must be started within a Tokio runtime"))
        })?;
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let session = Self {
            endpoint,
            url: request.url.to_string(),
            config: config.clone(),
            events,
            errors,
            cancel: cancel_rx,
        };

        let task = runtime.spawn(session.run(transport, request).instrument(Span::current()));

        Ok(StreamHandle {
            endpoint,
            cancel: cancel_tx,
            task: Some(task),
        })
    }

    async fn run(mut self, transport: Arc<dyn Transport>, request: ApiRequest) {
        info!(endpoint = self.endpoint, url = %self.url, "Opening stream");

        let connected = tokio::select! {
            biased;
            () = cancelled(&mut self.cancel) => {
                debug!(endpoint = self.endpoint, "Stopped before the connection was established");
                return;
            }
            result = transport.execute(request) => result,
        };

        let response = match connected {
            Ok(response) => response,
            Err(e) => {
                error!(endpoint = self.endpoint, error = %e, "Failed to connect to stream");
                self.report(StreamErrorKind::Connect(e)).await;
                return;
            }
        };

        if !response.status.is_success() {
            let status = response.status;
            // The body is released unread.
            drop(response);
            warn!(endpoint = self.endpoint, status = status.as_u16(), "Stream rejected");
            self.report(StreamErrorKind::Status {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            })
            .await;
            return;
        }

        info!(endpoint = self.endpoint, "Stream connected");

        let mut decoder = FrameDecoder::<T>::new(response.body, self.config.max_frame_bytes);
        let exit = self.receive(&mut decoder).await;
        drop(decoder);

        info!(endpoint = self.endpoint, exit = ?exit, "Stream closed");
    }

    async fn receive(&mut self, decoder: &mut FrameDecoder<T>) -> Exit {
        loop {
            if *self.cancel.borrow() {
                return Exit::Stopped;
            }

            let next = tokio::select! {
                biased;
                () = cancelled(&mut self.cancel) => return Exit::Stopped,
                next = decoder.next_frame() => next,
            };

            match next {
                None => return Exit::EndOfStream,
                Some(Ok(event)) => {
                    tokio::select! {
                        biased;
                        () = cancelled(&mut self.cancel) => return Exit::Stopped,
                        sent = self.events.send(event) => {
                            if sent.is_err() {
                                debug!(endpoint = self.endpoint, "Event receiver dropped");
                                return Exit::ConsumerGone;
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    let fatal = !e.is_recoverable()
                        || self.config.decode_errors == DecodeErrorPolicy::Abort;
                    self.report(e.into()).await;
                    if fatal {
                        return Exit::Failed;
                    }
                }
            }
        }
    }

    async fn report(&mut self, kind: StreamErrorKind) {
        let err = StreamError::new(self.endpoint, self.url.clone(), kind);
        warn!(endpoint = self.endpoint, error = %err, "Stream error");

        tokio::select! {
            biased;
            () = cancelled(&mut self.cancel) => {}
            sent = self.errors.send(err) => {
                if sent.is_err() {
                    debug!(endpoint = self.endpoint, "Error receiver dropped");
                }
            }
        }
    }
}

/// Resolves once the stop signal is set or the handle is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|stop| *stop).await;
}
