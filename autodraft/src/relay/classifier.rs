// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Chunk classifiers
//
// Decide what each upstream SSE chunk means: visible text, the provider's
// end marker, or something to drop. One implementation per wire format.

use super::types::{FrameError, SseChunk, UpstreamEvent, DONE_MARKER};

// ---------------------------------------------------------------------------
// Trait: ChunkClassifier
// ---------------------------------------------------------------------------

/// Understands one provider's line-delimited content-delta protocol.
///
/// An `Err` means the single frame is unusable; the relay skips it.
pub trait ChunkClassifier: Send + Sync {
    fn classify(&self, chunk: &SseChunk) -> Result<UpstreamEvent, FrameError>;
}

// ---------------------------------------------------------------------------
// Anthropic classifier
// ---------------------------------------------------------------------------

/// Classifies Anthropic messages-API SSE chunks.
///
/// Every data payload is a JSON object tagged by `type`:
/// - `content_block_delta` with `delta.text` -> ContentDelta
/// - `message_stop` -> Stop
/// - `message_start`, `content_block_start`, `content_block_stop`,
///   `message_delta`, `ping`, `error`, ... -> Other
pub struct AnthropicChunkClassifier;

impl ChunkClassifier for AnthropicChunkClassifier {
    fn classify(&self, chunk: &SseChunk) -> Result<UpstreamEvent, FrameError> {
        let data = chunk.data.trim();
        if data == DONE_MARKER {
            return Ok(UpstreamEvent::Stop);
        }

        let json: serde_json::Value =
            serde_json::from_str(data).map_err(|e| FrameError::MalformedJson(e.to_string()))?;

        // The payload's own tag wins; fall back to the `event:` line.
        let kind = json
            .get("type")
            .and_then(|t| t.as_str())
            .or(chunk.event.as_deref())
            .ok_or_else(|| FrameError::UnexpectedShape("missing \"type\" field".into()))?;

        match kind {
            "content_block_delta" => {
                let text = json
                    .get("delta")
                    .and_then(|d| d.get("text"))
                    .and_then(|t| t.as_str())
                    .unwrap_or("");
                Ok(UpstreamEvent::ContentDelta(text.to_string()))
            }
            "message_stop" => Ok(UpstreamEvent::Stop),
            other => Ok(UpstreamEvent::Other(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI classifier
// ---------------------------------------------------------------------------

/// Classifies OpenAI-compatible chat completion SSE chunks.
///
/// - `data: {"choices":[{"delta":{"content":"Hello"}}]}` -> ContentDelta
/// - `data: {"choices":[{"delta":{},"finish_reason":"stop"}]}` -> Stop
/// - `data: [DONE]` -> Stop
/// - role-only deltas, usage chunks, ... -> Other
pub struct OpenAiChunkClassifier;

impl ChunkClassifier for OpenAiChunkClassifier {
    fn classify(&self, chunk: &SseChunk) -> Result<UpstreamEvent, FrameError> {
        let data = chunk.data.trim();
        if data == DONE_MARKER {
            return Ok(UpstreamEvent::Stop);
        }

        let json: serde_json::Value =
            serde_json::from_str(data).map_err(|e| FrameError::MalformedJson(e.to_string()))?;

        if json.get("error").is_some() {
            return Ok(UpstreamEvent::Other("error".into()));
        }

        let choice = match json.get("choices").and_then(|c| c.get(0)) {
            Some(c) => c,
            None => return Ok(UpstreamEvent::Other("no_choices".into())),
        };

        if let Some(text) = choice
            .get("delta")
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str())
        {
            return Ok(UpstreamEvent::ContentDelta(text.to_string()));
        }

        if choice
            .get("finish_reason")
            .is_some_and(|reason| !reason.is_null())
        {
            return Ok(UpstreamEvent::Stop);
        }

        Ok(UpstreamEvent::Other("delta".into()))
    }
}

// ---------------------------------------------------------------------------
// SSE line parsing
// ---------------------------------------------------------------------------

/// One meaningful line of an SSE stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// `event: <name>`
    Event(String),
    /// `data: <payload>`
    Data(String),
    /// Blank line: end of the current event.
    Boundary,
}

/// Parse one raw SSE line.
///
/// Comments (`:` prefix) and fields other than `event`/`data` (`id`,
/// `retry`) yield `None`. A single space after the colon is not part of
/// the value.
pub fn parse_sse_line(line: &str) -> Option<SseLine> {
    if line.trim().is_empty() {
        return Some(SseLine::Boundary);
    }
    if line.starts_with(':') {
        return None;
    }

    let (field, value) = match line.split_once(':') {
        Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
        None => (line, ""),
    };

    match field {
        "data" => Some(SseLine::Data(value.to_string())),
        "event" => Some(SseLine::Event(value.trim().to_string())),
        _ => None,
    }
}
