//! Incremental decoder for a feed of concatenated JSON values.
//!
//! The feed writes one JSON object per event, separated by `\r\n`, and sends a
//! bare `\r\n` as a keep-alive. The decoder pulls chunks from the response
//! body only until one complete value is buffered, so memory stays bounded by
//! the largest frame.

use std::marker::PhantomData;

use bytes::{Buf, BytesMut};
use futures_util::StreamExt;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{trace, warn};

use crate::{error::FrameError, transport::BodyStream, types::ErrorBody};

enum Scan {
    /// A value spans this many bytes from the front of the buffer.
    Complete(usize),
    Incomplete,
    Invalid(serde_json::Error),
}

/// Turns one response body into a sequence of typed frames.
pub struct FrameDecoder<T> {
    body: BodyStream,
    buffer: BytesMut,
    max_frame_bytes: usize,
    /// Discard input up to the next newline before scanning again.
    resync: bool,
    eof: bool,
    _frame: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for FrameDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("buffered", &self.buffer.len())
            .field("max_frame_bytes", &self.max_frame_bytes)
            .field("resync", &self.resync)
            .field("eof", &self.eof)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned> FrameDecoder<T> {
    #[must_use]
    pub fn new(body: BodyStream, max_frame_bytes: usize) -> Self {
        Self {
            body,
            buffer: BytesMut::new(),
            max_frame_bytes,
            resync: false,
            eof: false,
            _frame: PhantomData,
        }
    }

    /// Wait for the next frame.
    ///
    /// Returns `None` once the body has ended cleanly. Every error except
    /// [`FrameError::Read`] leaves the decoder positioned at the next frame.
    pub async fn next_frame(&mut self) -> Option<Result<T, FrameError>> {
        loop {
            if self.resync {
                if self.skip_malformed() {
                    self.resync = false;
                } else {
                    match self.fill().await {
                        Ok(true) => continue,
                        Ok(false) => {
                            self.buffer.clear();
                            return None;
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
            }

            self.skip_whitespace();

            if !self.buffer.is_empty() {
                match self.scan() {
                    Scan::Complete(len) if len > self.max_frame_bytes => {
                        warn!(
                            size = len,
                            limit = self.max_frame_bytes,
                            "Frame too large, dropping it"
                        );
                        self.buffer.advance(len);
                        return Some(Err(FrameError::TooLarge {
                            limit: self.max_frame_bytes,
                        }));
                    }
                    Scan::Complete(len) => {
                        let frame = self.buffer.split_to(len);
                        return Some(decode(&frame));
                    }
                    Scan::Invalid(e) => {
                        warn!(error = %e, "Malformed frame, skipping to next boundary");
                        self.resync = true;
                        return Some(Err(FrameError::Decode(e)));
                    }
                    Scan::Incomplete if self.buffer.len() >= self.max_frame_bytes => {
                        warn!(
                            buffered = self.buffer.len(),
                            limit = self.max_frame_bytes,
                            "Frame too large, skipping to next boundary"
                        );
                        self.resync = true;
                        return Some(Err(FrameError::TooLarge {
                            limit: self.max_frame_bytes,
                        }));
                    }
                    Scan::Incomplete => {}
                }
            }

            match self.fill().await {
                Ok(true) => {}
                Ok(false) if self.buffer.is_empty() => return None,
                Ok(false) => {
                    warn!(buffered = self.buffer.len(), "Stream ended inside a frame");
                    self.buffer.clear();
                    return Some(Err(FrameError::Truncated));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Read one more chunk; `Ok(false)` at end of body.
    async fn fill(&mut self) -> Result<bool, FrameError> {
        if self.eof {
            return Ok(false);
        }
        match self.body.next().await {
            Some(Ok(chunk)) => {
                if chunk.iter().all(u8::is_ascii_whitespace) {
                    trace!("Received keep-alive");
                }
                self.buffer.extend_from_slice(&chunk);
                Ok(true)
            }
            Some(Err(e)) => {
                self.eof = true;
                Err(FrameError::Read(e))
            }
            None => {
                self.eof = true;
                Ok(false)
            }
        }
    }

    /// Drop the rest of a bad frame up to the next boundary: a newline, or a
    /// whitespace run followed by `{`, whichever comes first. Returns `false`
    /// when no boundary is buffered yet.
    fn skip_malformed(&mut self) -> bool {
        let mut i = 0;
        while i < self.buffer.len() {
            if !self.buffer[i].is_ascii_whitespace() {
                i += 1;
                continue;
            }
            let run = self.buffer[i..]
                .iter()
                .take_while(|b| b.is_ascii_whitespace())
                .count();
            if let Some(nl) = self.buffer[i..i + run].iter().position(|&b| b == b'\n') {
                self.buffer.advance(i + nl + 1);
                return true;
            }
            match self.buffer.get(i + run).copied() {
                Some(b'{') => {
                    self.buffer.advance(i + run);
                    return true;
                }
                Some(_) => i += run,
                None => {
                    // Keep the trailing run; the next chunk decides.
                    self.buffer.advance(i);
                    return false;
                }
            }
        }
        self.buffer.clear();
        false
    }

    fn skip_whitespace(&mut self) {
        let leading = self
            .buffer
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.buffer.advance(leading);
    }

    fn scan(&self) -> Scan {
        let mut values =
            serde_json::Deserializer::from_slice(&self.buffer).into_iter::<IgnoredAny>();
        match values.next() {
            Some(Ok(_)) => Scan::Complete(values.byte_offset()),
            Some(Err(e)) if e.is_eof() => Scan::Incomplete,
            Some(Err(e)) => Scan::Invalid(e),
            None => Scan::Incomplete,
        }
    }
}

fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, FrameError> {
    serde_json::from_slice(frame).map_err(|e| {
        // Operational notices arrive in-band as problem objects.
        serde_json::from_slice::<ErrorBody>(frame)
            .ok()
            .and_then(|body| body.message())
            .map_or(FrameError::Decode(e), FrameError::Remote)
    })
}
