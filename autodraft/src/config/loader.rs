// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha256};

use crate::provider::Provider;

use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate an autodraft config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Compute SHA256 config hash
/// 3. Parse YAML into raw deserialization types
/// 4. Validate version, provider and numeric limits
/// 5. Resolve `${VAR}` interpolation; fill provider defaults
/// 6. Build typed Config struct
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let config_hash = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.autodraft != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.autodraft
        )));
    }

    let upstream = build_upstream_config(raw.upstream.unwrap_or_default())?;

    Ok(Config {
        upstream,
        environment: raw.environment.unwrap_or_else(|| "production".to_string()),
        config_hash,
    })
}

pub fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    let hash = hasher.finalize();
    format!("sha256:{:x}", hash)
}

fn build_upstream_config(raw: raw::RawUpstreamConfig) -> Result<UpstreamConfig, ConfigError> {
    let provider = match raw.provider.as_deref() {
        None => Provider::Anthropic,
        Some(name) => Provider::from_key(name).ok_or_else(|| {
            ConfigError::Validation(format!(
                "unknown upstream provider \"{name}\", expected \"anthropic\" or \"openai\""
            ))
        })?,
    };

    // Without an explicit key, fall back to the provider's conventional env var.
    let api_key = match raw.api_key {
        Some(key) => resolve_variables(&key)?,
        None => std::env::var(provider.api_key_env()).unwrap_or_default(),
    };
    if api_key.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "upstream api_key is empty (set upstream.api_key or ${})",
            provider.api_key_env()
        )));
    }

    let base_url = match raw.base_url {
        Some(url) => resolve_variables(&url)?,
        None => provider.default_base_url().to_string(),
    };
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "upstream base_url must be an http(s) URL, got \"{base_url}\""
        )));
    }

    let model = match raw.model {
        Some(model) => resolve_variables(&model)?,
        None => provider.default_model().to_string(),
    };
    if model.trim().is_empty() {
        return Err(ConfigError::Validation("upstream model must not be empty".into()));
    }

    let max_tokens = raw.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
    if max_tokens == 0 {
        return Err(ConfigError::Validation("upstream max_tokens must be > 0".into()));
    }

    let connect_timeout_ms = raw.connect_timeout_ms.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS);
    if connect_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "upstream connect_timeout_ms must be > 0".into(),
        ));
    }

    let idle_timeout_ms = raw.idle_timeout_ms.unwrap_or(DEFAULT_IDLE_TIMEOUT_MS);
    if idle_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "upstream idle_timeout_ms must be > 0".into(),
        ));
    }

    Ok(UpstreamConfig {
        provider,
        base_url: base_url.trim_end_matches('/').to_string(),
        api_key,
        model,
        max_tokens,
        anthropic_version: raw
            .anthropic_version
            .unwrap_or_else(|| DEFAULT_ANTHROPIC_VERSION.to_string()),
        connect_timeout_ms,
        idle_timeout_ms,
    })
}
