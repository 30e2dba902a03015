// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Provider adapters (Anthropic + OpenAI-compatible)
//
// Responsibilities:
// - Name the wire format of each supported upstream
// - Build the streaming request path, headers and JSON body
// - Hand out the matching chunk classifier for the relay

use std::sync::Arc;

use axum::http::header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::compose::ComposedPrompt;
use crate::config::UpstreamConfig;
use crate::relay::{AnthropicChunkClassifier, ChunkClassifier, OpenAiChunkClassifier};

/// Wire format of the upstream completion API.
///
/// `OpenAi` covers any provider speaking the OpenAI-compatible chat
/// completions API. `Anthropic` covers the Anthropic messages API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "anthropic" => Some(Provider::Anthropic),
            "openai" => Some(Provider::OpenAi),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::OpenAi => "https://api.openai.com",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-5-sonnet-20241022",
            Provider::OpenAi => "gpt-4o-mini",
        }
    }

    /// Environment variable consulted when the config names no API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Path of the streaming completion endpoint, appended to the base URL.
    pub fn completion_path(self) -> &'static str {
        match self {
            Provider::Anthropic => "/v1/messages",
            Provider::OpenAi => "/v1/chat/completions",
        }
    }

    /// Request headers, including the provider's authentication scheme.
    pub fn request_headers(self, config: &UpstreamConfig) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match self {
            Provider::Anthropic => {
                let mut key = HeaderValue::from_str(&config.api_key)?;
                key.set_sensitive(true);
                headers.insert("x-api-key", key);
                headers.insert(
                    "anthropic-version",
                    HeaderValue::from_str(&config.anthropic_version)?,
                );
            }
            Provider::OpenAi => {
                let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))?;
                bearer.set_sensitive(true);
                headers.insert(AUTHORIZATION, bearer);
            }
        }
        Ok(headers)
    }

    /// Streaming request body carrying the prompt as a single user message.
    ///
    /// Both wire formats accept the same minimal shape.
    pub fn request_body(self, config: &UpstreamConfig, prompt: &ComposedPrompt) -> serde_json::Value {
        serde_json::json!({
            "model": config.model,
            "max_tokens": config.max_tokens,
            "stream": true,
            "messages": [{ "role": "user", "content": prompt.as_str() }],
        })
    }

    pub fn classifier(self) -> Arc<dyn ChunkClassifier> {
        match self {
            Provider::Anthropic => Arc::new(AnthropicChunkClassifier),
            Provider::OpenAi => Arc::new(OpenAiChunkClassifier),
        }
    }
}
