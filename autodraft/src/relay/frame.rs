// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Line reassembly for SSE byte streams.
//
// Network reads split lines (and UTF-8 characters) at arbitrary points. The
// buffer keeps raw bytes of the trailing incomplete line only; every complete
// line is handed out as soon as its newline arrives.

use bytes::BytesMut;

/// Longest unterminated line kept before it is discarded.
pub const MAX_PENDING_LINE_BYTES: usize = 1_048_576; // 1 MB

/// Accumulates bytes and yields complete lines.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: BytesMut,
    /// Set while skipping the rest of an oversized line.
    discarding: bool,
    discarded_lines: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one read and return every line it completed, in order.
    ///
    /// Lines are returned without their `\n` / `\r\n` terminator.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }

            self.pending.extend_from_slice(head);
            let line = self.pending.split();
            lines.push(decode_line(&line));
        }

        if self.discarding {
            return lines;
        }

        self.pending.extend_from_slice(rest);
        if self.pending.len() > MAX_PENDING_LINE_BYTES {
            self.pending.clear();
            self.discarding = true;
            self.discarded_lines += 1;
        }

        lines
    }

    /// Take the trailing unterminated line left when the stream ends.
    pub fn finish(&mut self) -> Option<String> {
        if self.discarding || self.pending.is_empty() {
            self.discarding = false;
            self.pending.clear();
            return None;
        }
        let line = self.pending.split();
        Some(decode_line(&line))
    }

    /// Bytes currently held for the incomplete line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of oversized lines dropped so far.
    pub fn discarded_lines(&self) -> usize {
        self.discarded_lines
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
