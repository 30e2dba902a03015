// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Relay types
//
// Core types for re-framing: parsed upstream chunks, their classification,
// the simplified outbound events, and the relay lifecycle.

use std::fmt;

use bytes::Bytes;

// ---------------------------------------------------------------------------
// Upstream side
// ---------------------------------------------------------------------------

/// A parsed SSE chunk from the upstream response stream.
///
/// Each chunk is one `data:` line, optionally preceded by an `event:` line
/// (Anthropic sends both; OpenAI-compatible providers send only data).
#[derive(Debug, Clone, PartialEq)]
pub struct SseChunk {
    pub event: Option<String>,
    pub data: String,
}

/// One upstream frame after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    /// Visible text. May be empty, in which case nothing is emitted.
    ContentDelta(String),
    /// The provider's own end marker (`[DONE]`, `message_stop`, a finish reason).
    Stop,
    /// Any other frame type. Never reflected downstream.
    Other(String),
}

/// A frame whose payload could not be understood.
///
/// Recovered locally by the relay loop: the frame is skipped and the stream
/// continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("frame payload is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("frame payload has unexpected shape: {0}")]
    UnexpectedShape(String),
}

// ---------------------------------------------------------------------------
// Outbound side
// ---------------------------------------------------------------------------

/// Literal payload of the terminal frame.
pub const DONE_MARKER: &str = "[DONE]";

/// The simplified event the relay emits to its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Content(String),
    /// Terminal sentinel: no further content follows.
    Done,
}

#[derive(serde::Deserialize)]
struct ContentPayload {
    content: String,
}

impl RelayEvent {
    /// Encode as one SSE frame: `data: <payload>\n\n`.
    pub fn to_frame(&self) -> Bytes {
        match self {
            RelayEvent::Content(text) => {
                let payload = serde_json::json!({ "content": text });
                Bytes::from(format!("data: {payload}\n\n"))
            }
            RelayEvent::Done => Bytes::from(format!("data: {DONE_MARKER}\n\n")),
        }
    }

    /// Decode the payload of a `data:` line written by [`RelayEvent::to_frame`].
    pub fn from_data(data: &str) -> Result<Self, FrameError> {
        let data = data.trim();
        if data == DONE_MARKER {
            return Ok(RelayEvent::Done);
        }
        let payload: ContentPayload =
            serde_json::from_str(data).map_err(|e| FrameError::MalformedJson(e.to_string()))?;
        Ok(RelayEvent::Content(payload.content))
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle of one relayed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    UpstreamConnecting,
    Relaying,
    Done,
    Failed,
}

impl RelayState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RelayState::Done | RelayState::Failed)
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayState::Idle => "idle",
            RelayState::UpstreamConnecting => "upstream_connecting",
            RelayState::Relaying => "relaying",
            RelayState::Done => "done",
            RelayState::Failed => "failed",
        };
        f.write_str(name)
    }
}
