// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

use crate::provider::Provider;

/// Default declared output budget sent with every upstream request.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic API version header value.
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;

/// Longest silence tolerated between two upstream reads.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 60_000;

/// Top-level parsed and validated config.
#[derive(Debug, Clone)]
pub struct Config {
    pub upstream: UpstreamConfig,
    /// Free-form deployment label, logged at startup.
    pub environment: String,
    /// SHA256 of the raw YAML: "sha256:{hex}".
    pub config_hash: String,
}

/// Everything needed to open a streaming call to the upstream provider.
#[derive(Clone)]
pub struct UpstreamConfig {
    pub provider: Provider,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub anthropic_version: String,
    pub connect_timeout_ms: u64,
    pub idle_timeout_ms: u64,
}

// Hand-written so the API key never reaches a log line.
impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("anthropic_version", &self.anthropic_version)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("idle_timeout_ms", &self.idle_timeout_ms)
            .finish()
    }
}
