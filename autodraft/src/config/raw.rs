// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal).
// Interpolation, defaults and validation happen between these and the public
// `Config` types.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub autodraft: String,
    pub upstream: Option<RawUpstreamConfig>,
    pub environment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawUpstreamConfig {
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub anthropic_version: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}
