// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Relay processor
//
// Takes the upstream byte stream, reassembles SSE lines, classifies each
// frame, and produces the simplified outbound byte stream: one content frame
// per non-empty text delta, then a single `[DONE]` frame on normal close.

use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{self, Duration};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use super::classifier::{parse_sse_line, ChunkClassifier, SseLine};
use super::frame::FrameBuffer;
use super::types::{RelayEvent, RelayState, SseChunk, UpstreamEvent};

/// Outbound frames buffered between the relay task and the response body.
const OUTPUT_CHANNEL_CAPACITY: usize = 64;

/// Re-frames one upstream stream. Built per request.
pub struct RelayProcessor {
    classifier: Arc<dyn ChunkClassifier>,
    idle_timeout: Duration,
    request_id: String,
}

impl RelayProcessor {
    pub fn new(classifier: Arc<dyn ChunkClassifier>, idle_timeout: Duration) -> Self {
        Self {
            classifier,
            idle_timeout,
            request_id: String::new(),
        }
    }

    /// Tag every log line of this relay with a request id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Spawn the read/transform/write loop and return the outbound stream.
    ///
    /// The outbound stream ends with `[DONE]` only when the upstream closed
    /// normally. A transport error or an idle timeout ends it without the
    /// sentinel. Dropping the outbound stream stops the loop and releases the
    /// upstream body.
    pub fn process<S, E>(&self, input: S) -> impl Stream<Item = Bytes>
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let classifier = self.classifier.clone();
        let idle_timeout = self.idle_timeout;
        let request_id = self.request_id.clone();

        let (tx, rx) = mpsc::channel::<Bytes>(OUTPUT_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut input = Box::pin(input);
            let mut state = LoopState::new(request_id);

            loop {
                let next = tokio::select! {
                    biased;
                    _ = tx.closed() => {
                        tracing::info!(
                            request_id = %state.request_id,
                            fragments = state.fragments,
                            "client disconnected; releasing upstream"
                        );
                        return;
                    }
                    next = time::timeout(idle_timeout, input.next()) => next,
                };

                match next {
                    Err(_) => {
                        state.fail(&format!(
                            "upstream idle for more than {}ms",
                            idle_timeout.as_millis()
                        ));
                        return;
                    }
                    Ok(None) => break,
                    Ok(Some(Err(e))) => {
                        state.fail(&format!("upstream stream interrupted: {e}"));
                        return;
                    }
                    Ok(Some(Ok(chunk))) => {
                        state.transition(RelayState::Relaying);
                        for line in state.frames.push(&chunk) {
                            if state.handle_line(&line, classifier.as_ref(), &tx).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }

            // Upstream closed normally. A final line without a newline is
            // still a complete frame.
            if let Some(line) = state.frames.finish() {
                if state.handle_line(&line, classifier.as_ref(), &tx).await.is_err() {
                    return;
                }
            }

            if tx.send(RelayEvent::Done.to_frame()).await.is_err() {
                return;
            }
            state.transition(RelayState::Done);
            tracing::info!(
                request_id = %state.request_id,
                fragments = state.fragments,
                content_bytes = state.content_bytes,
                skipped_frames = state.skipped_frames,
                discarded_lines = state.frames.discarded_lines(),
                upstream_signaled_stop = state.upstream_signaled_stop,
                "relay complete"
            );
        });

        ReceiverStream::new(rx)
    }
}

// ---------------------------------------------------------------------------
// Loop state
// ---------------------------------------------------------------------------

/// Mutable state carried through one relay loop.
struct LoopState {
    request_id: String,
    relay_state: RelayState,
    frames: FrameBuffer,
    /// `event:` name waiting for its `data:` line.
    pending_event: Option<String>,
    fragments: usize,
    content_bytes: usize,
    skipped_frames: usize,
    upstream_signaled_stop: bool,
}

impl LoopState {
    fn new(request_id: String) -> Self {
        Self {
            request_id,
            relay_state: RelayState::UpstreamConnecting,
            frames: FrameBuffer::new(),
            pending_event: None,
            fragments: 0,
            content_bytes: 0,
            skipped_frames: 0,
            upstream_signaled_stop: false,
        }
    }

    fn transition(&mut self, next: RelayState) {
        if self.relay_state == next || self.relay_state.is_terminal() {
            return;
        }
        tracing::debug!(
            request_id = %self.request_id,
            from = %self.relay_state,
            to = %next,
            "relay state transition"
        );
        self.relay_state = next;
    }

    fn fail(&mut self, reason: &str) {
        self.transition(RelayState::Failed);
        tracing::warn!(
            request_id = %self.request_id,
            fragments = self.fragments,
            reason,
            "relay closed without completion"
        );
    }

    /// Handle one complete SSE line. `Err` means the client is gone.
    async fn handle_line(
        &mut self,
        line: &str,
        classifier: &dyn ChunkClassifier,
        tx: &mpsc::Sender<Bytes>,
    ) -> Result<(), ()> {
        let data = match parse_sse_line(line) {
            Some(SseLine::Data(data)) => data,
            Some(SseLine::Event(name)) => {
                self.pending_event = Some(name);
                return Ok(());
            }
            Some(SseLine::Boundary) => {
                self.pending_event = None;
                return Ok(());
            }
            None => return Ok(()),
        };

        let chunk = SseChunk {
            event: self.pending_event.take(),
            data,
        };

        match classifier.classify(&chunk) {
            Ok(UpstreamEvent::ContentDelta(text)) => {
                if text.is_empty() {
                    return Ok(());
                }
                self.fragments += 1;
                self.content_bytes += text.len();
                tx.send(RelayEvent::Content(text).to_frame())
                    .await
                    .map_err(|_| ())?;
            }
            Ok(UpstreamEvent::Stop) => {
                self.upstream_signaled_stop = true;
            }
            Ok(UpstreamEvent::Other(kind)) => {
                tracing::trace!(request_id = %self.request_id, kind = %kind, "dropping frame");
            }
            Err(e) => {
                self.skipped_frames += 1;
                tracing::debug!(request_id = %self.request_id, error = %e, "skipping malformed frame");
            }
        }

        Ok(())
    }
}
