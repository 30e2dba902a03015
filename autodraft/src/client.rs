// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Relay client
//
// Consumes the relay's simplified event stream:
// - RelayDecoder turns raw bytes back into RelayEvents
// - Generation accumulates content and tracks the lifecycle
// - RelayClient posts a request and drives a Generation over HTTP

use chrono::{DateTime, Utc};
use futures_util::StreamExt;

use crate::relay::{parse_sse_line, FrameBuffer, RelayEvent, SseLine};
use crate::request::GenerationRequest;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to relay failed: {0}")]
    Transport(String),

    #[error("relay rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("generation failed: {reason}")]
    Failed { reason: String, partial: String },
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Incremental decoder for relay output. Frames may arrive split at any byte.
#[derive(Debug, Default)]
pub struct RelayDecoder {
    frames: FrameBuffer,
    skipped: usize,
}

impl RelayDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read; returns every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RelayEvent> {
        let lines = self.frames.push(chunk);
        lines.iter().filter_map(|line| self.decode_line(line)).collect()
    }

    /// Flush a final line that arrived without a newline.
    pub fn finish(&mut self) -> Option<RelayEvent> {
        let line = self.frames.finish()?;
        self.decode_line(&line)
    }

    /// Malformed frames seen so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode_line(&mut self, line: &str) -> Option<RelayEvent> {
        let Some(SseLine::Data(data)) = parse_sse_line(line) else {
            return None;
        };
        match RelayEvent::from_data(&data) {
            Ok(event) => Some(event),
            Err(e) => {
                self.skipped += 1;
                tracing::debug!(error = %e, "skipping malformed relay frame");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    Idle,
    Generating,
    Completed,
    Failed(String),
}

/// Content accumulated for one generation, plus where it stands.
///
/// Once Completed or Failed, further input is ignored.
#[derive(Debug, Clone)]
pub struct Generation {
    content: String,
    status: GenerationStatus,
}

impl Default for Generation {
    fn default() -> Self {
        Self::new()
    }
}

impl Generation {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            status: GenerationStatus::Idle,
        }
    }

    /// Start (or restart) a generation with empty content.
    pub fn begin(&mut self) {
        self.content.clear();
        self.status = GenerationStatus::Generating;
    }

    /// Apply one relay event. Returns true when the content changed.
    pub fn apply(&mut self, event: RelayEvent) -> bool {
        if self.status != GenerationStatus::Generating {
            return false;
        }
        match event {
            RelayEvent::Content(text) => {
                self.content.push_str(&text);
                !text.is_empty()
            }
            RelayEvent::Done => {
                self.status = GenerationStatus::Completed;
                false
            }
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.status == GenerationStatus::Generating {
            self.status = GenerationStatus::Failed(reason.into());
        }
    }

    /// The stream ended. Without a prior `Done` that is a failure.
    pub fn finish(&mut self) {
        self.fail("stream ended before completion");
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> &GenerationStatus {
        &self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == GenerationStatus::Completed
    }
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Talks to a running relay over HTTP.
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    /// `base_url` is the relay root, e.g. `http://127.0.0.1:9800`.
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one generation to the end.
    ///
    /// `on_update` sees the full accumulated text after every content
    /// fragment. Returns the final text once the relay sends `[DONE]`.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        mut on_update: impl FnMut(&str),
    ) -> Result<String, ClientError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let mut generation = Generation::new();
        generation.begin();
        let mut decoder = RelayDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(read) = body.next().await {
            match read {
                Ok(chunk) => {
                    for event in decoder.push(&chunk) {
                        if generation.apply(event) {
                            on_update(generation.content());
                        }
                    }
                }
                Err(e) => {
                    generation.fail(format!("stream interrupted: {e}"));
                    break;
                }
            }
            if generation.is_complete() {
                break;
            }
        }

        if let Some(event) = decoder.finish() {
            if generation.apply(event) {
                on_update(generation.content());
            }
        }
        generation.finish();

        match generation.status {
            GenerationStatus::Completed => Ok(generation.content),
            GenerationStatus::Failed(reason) => Err(ClientError::Failed {
                reason,
                partial: generation.content,
            }),
            // finish() leaves only terminal states
            GenerationStatus::Idle | GenerationStatus::Generating => Err(ClientError::Failed {
                reason: "generation did not start".into(),
                partial: generation.content,
            }),
        }
    }
}

/// Default file name for saving a generation: `<template>-<unix-millis>.md`.
pub fn download_file_name(template_id: &str, at: DateTime<Utc>) -> String {
    format!("{template_id}-{}.md", at.timestamp_millis())
}
