// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Streaming relay
//
// Responsibilities:
// - Reassemble upstream SSE lines split across network reads
// - Classify each frame with the provider's classifier
// - Emit `data: {"content": ...}` for every non-empty text delta, in order
// - Drop every other frame; skip malformed frames without aborting
// - Emit exactly one `data: [DONE]` when the upstream closes normally
// - Close without the sentinel on interruption or idle timeout

mod classifier;
mod frame;
mod processor;
mod types;

pub use classifier::{
    parse_sse_line, AnthropicChunkClassifier, ChunkClassifier, OpenAiChunkClassifier, SseLine,
};
pub use frame::{FrameBuffer, MAX_PENDING_LINE_BYTES};
pub use processor::RelayProcessor;
pub use types::{FrameError, RelayEvent, RelayState, SseChunk, UpstreamEvent, DONE_MARKER};
