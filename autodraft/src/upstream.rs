// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Upstream client
//
// Opens one streaming completion call per generation:
// - Resolve the base URL (config, overridable from the environment)
// - Build provider headers and body from the composed prompt
// - Send through an injectable HttpSender
// - Reject non-2xx before any event stream is opened

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use bytes::{Bytes, BytesMut};
use futures_util::stream::{Stream, StreamExt};
use futures_util::TryStreamExt;

use crate::compose::ComposedPrompt;
use crate::config::{Config, UpstreamConfig};
use crate::provider::Provider;
use crate::proxy::{ProxyError, UpstreamClient, UpstreamStream};

/// Environment variable that overrides the configured upstream base URL.
pub const BASE_URL_ENV: &str = "AUTODRAFT_UPSTREAM_BASE_URL";

/// How much of a failed upstream response body is kept for the log.
const ERROR_SNIPPET_BYTES: usize = 2048;

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

/// Resolves the upstream base URL for a provider.
pub trait UpstreamResolver: Send + Sync {
    fn base_url(&self, provider: Provider) -> String;
}

/// Sends HTTP requests to upstream providers.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

// ---------------------------------------------------------------------------
// Transport types
// ---------------------------------------------------------------------------

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Bound on waiting for the response head. The body may stream longer.
    pub timeout_ms: Option<u64>,
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream request timed out: {0}")]
    Timeout(String),
}

// ---------------------------------------------------------------------------
// Env-based upstream resolver
// ---------------------------------------------------------------------------

/// Uses the configured base URL unless `AUTODRAFT_UPSTREAM_BASE_URL` is set.
pub struct EnvUpstreamResolver {
    configured: String,
}

impl EnvUpstreamResolver {
    pub fn new(configured: impl Into<String>) -> Self {
        Self {
            configured: configured.into(),
        }
    }
}

impl UpstreamResolver for EnvUpstreamResolver {
    fn base_url(&self, provider: Provider) -> String {
        let url = match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ if self.configured.is_empty() => provider.default_base_url().to_string(),
            _ => self.configured.clone(),
        };
        url.trim().trim_end_matches('/').to_string()
    }
}

// ---------------------------------------------------------------------------
// Reqwest HTTP sender
// ---------------------------------------------------------------------------

pub struct ReqwestHttpSender {
    client: reqwest::Client,
}

impl ReqwestHttpSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSender for ReqwestHttpSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let pending = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body)
            .send();

        // reqwest's own timeout covers the whole body, which would cut long
        // generations short. Only the response head is bounded here.
        let sent = match request.timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), pending)
                .await
                .map_err(|_| HttpError::Timeout(format!("no response after {ms}ms")))?,
            None => pending.await,
        };

        let resp = sent.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(e.to_string())
            } else {
                HttpError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let stream = resp
            .bytes_stream()
            .map_err(|e| HttpError::Transport(e.to_string()));

        Ok(HttpResponse {
            status,
            headers,
            body: Box::pin(stream),
        })
    }
}

// ---------------------------------------------------------------------------
// ProviderUpstreamClient
// ---------------------------------------------------------------------------

/// Upstream client for the configured provider.
pub struct ProviderUpstreamClient {
    config: UpstreamConfig,
    http: Arc<dyn HttpSender>,
    resolver: Arc<dyn UpstreamResolver>,
}

impl ProviderUpstreamClient {
    pub fn new_with(
        config: UpstreamConfig,
        http: Arc<dyn HttpSender>,
        resolver: Arc<dyn UpstreamResolver>,
    ) -> Self {
        Self {
            config,
            http,
            resolver,
        }
    }

    fn build_request(&self, prompt: &ComposedPrompt) -> Result<HttpRequest, ProxyError> {
        let provider = self.config.provider;
        let url = format!(
            "{}{}",
            self.resolver.base_url(provider),
            provider.completion_path()
        );
        let headers = provider
            .request_headers(&self.config)
            .map_err(|e| ProxyError::UpstreamFailure(format!("invalid request header: {e}")))?;
        let body = serde_json::to_vec(&provider.request_body(&self.config, prompt))
            .map_err(|e| ProxyError::UpstreamFailure(format!("failed to encode request: {e}")))?;

        Ok(HttpRequest {
            method: Method::POST,
            url,
            headers,
            body: Bytes::from(body),
            timeout_ms: Some(self.config.connect_timeout_ms),
        })
    }
}

#[async_trait]
impl UpstreamClient for ProviderUpstreamClient {
    async fn open_stream(
        &self,
        prompt: &ComposedPrompt,
        request_id: &str,
    ) -> Result<UpstreamStream, ProxyError> {
        let request = self.build_request(prompt)?;

        tracing::debug!(
            request_id = %request_id,
            provider = self.config.provider.key(),
            model = %self.config.model,
            url = %request.url,
            prompt_bytes = prompt.as_str().len(),
            "sending upstream request"
        );

        let response = self.http.send(request).await.map_err(|e| match e {
            HttpError::Timeout(m) => ProxyError::UpstreamTimeout(m),
            HttpError::Transport(m) => ProxyError::UpstreamFailure(m),
        })?;

        if !response.status.is_success() {
            let snippet = read_snippet(response.body).await;
            tracing::warn!(
                request_id = %request_id,
                status = response.status.as_u16(),
                body = %snippet,
                "upstream rejected request"
            );
            return Err(ProxyError::UpstreamStatus(response.status));
        }

        Ok(UpstreamStream {
            body: response.body,
            classifier: self.config.provider.classifier(),
        })
    }
}

// ---------------------------------------------------------------------------
// Public factory for the default client
// ---------------------------------------------------------------------------

pub fn build_upstream_client(config: &Config) -> ProviderUpstreamClient {
    ProviderUpstreamClient::new_with(
        config.upstream.clone(),
        Arc::new(ReqwestHttpSender::new(reqwest::Client::new())),
        Arc::new(EnvUpstreamResolver::new(config.upstream.base_url.clone())),
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// First few KB of an error body, lossily decoded. Read errors end it early.
async fn read_snippet(mut body: ByteStream) -> String {
    let mut buf = BytesMut::new();
    while buf.len() < ERROR_SNIPPET_BYTES {
        match body.next().await {
            Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
            _ => break,
        }
    }
    buf.truncate(ERROR_SNIPPET_BYTES);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose_prompt, Length, Tone};
    use tokio::sync::Mutex;

    /// Records every request and answers with a canned response.
    struct RecordingSender {
        seen: Mutex<Vec<HttpRequest>>,
        status: StatusCode,
        body: &'static [u8],
        fail_with: Option<fn() -> HttpError>,
    }

    impl RecordingSender {
        fn ok(body: &'static [u8]) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                status: StatusCode::OK,
                body,
                fail_with: None,
            }
        }

        fn status(status: StatusCode, body: &'static [u8]) -> Self {
            Self {
                status,
                ..Self::ok(body)
            }
        }

        fn failing(fail_with: fn() -> HttpError) -> Self {
            Self {
                fail_with: Some(fail_with),
                ..Self::ok(b"")
            }
        }
    }

    #[async_trait]
    impl HttpSender for RecordingSender {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            self.seen.lock().await.push(request);
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            let body: ByteStream =
                Box::pin(futures_util::stream::iter(vec![Ok(Bytes::from_static(self.body))]));
            Ok(HttpResponse {
                status: self.status,
                headers: HeaderMap::new(),
                body,
            })
        }
    }

    struct FixedResolver;

    impl UpstreamResolver for FixedResolver {
        fn base_url(&self, _provider: Provider) -> String {
            "http://upstream.test".to_string()
        }
    }

    fn config(provider: Provider) -> UpstreamConfig {
        UpstreamConfig {
            provider,
            base_url: "http://configured.test".to_string(),
            api_key: "sk-test".to_string(),
            model: "test-model".to_string(),
            max_tokens: 512,
            anthropic_version: "2023-06-01".to_string(),
            connect_timeout_ms: 1500,
            idle_timeout_ms: 1000,
        }
    }

    fn client(provider: Provider, sender: Arc<RecordingSender>) -> ProviderUpstreamClient {
        ProviderUpstreamClient::new_with(config(provider), sender, Arc::new(FixedResolver))
    }

    fn prompt() -> ComposedPrompt {
        compose_prompt("Write about", "cats", Tone::Casual.key(), Length::Short.key())
    }

    async fn collect(mut body: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn anthropic_request_shape() {
        let sender = Arc::new(RecordingSender::ok(b"data: x\n\n"));
        let upstream = client(Provider::Anthropic, sender.clone());

        let opened = upstream.open_stream(&prompt(), "req-1").await.unwrap();
        assert_eq!(collect(opened.body).await, b"data: x\n\n");

        let seen = sender.seen.lock().await;
        assert_eq!(seen.len(), 1);
        let req = &seen[0];
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.url, "http://upstream.test/v1/messages");
        assert_eq!(req.timeout_ms, Some(1500));
        assert_eq!(req.headers.get("x-api-key").unwrap(), "sk-test");

        let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], prompt().as_str());
    }

    #[tokio::test]
    async fn openai_request_uses_chat_completions() {
        let sender = Arc::new(RecordingSender::ok(b""));
        let upstream = client(Provider::OpenAi, sender.clone());
        upstream.open_stream(&prompt(), "req-2").await.unwrap();

        let seen = sender.seen.lock().await;
        assert_eq!(seen[0].url, "http://upstream.test/v1/chat/completions");
        assert_eq!(seen[0].headers.get("authorization").unwrap(), "Bearer sk-test");
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let sender = Arc::new(RecordingSender::status(
            StatusCode::TOO_MANY_REQUESTS,
            br#"{"type":"error","error":{"type":"rate_limit_error"}}"#,
        ));
        let result = client(Provider::Anthropic, sender).open_stream(&prompt(), "req-3").await;
        assert!(matches!(
            result,
            Err(ProxyError::UpstreamStatus(StatusCode::TOO_MANY_REQUESTS))
        ));
    }

    #[tokio::test]
    async fn transport_error_maps_to_failure() {
        let sender = Arc::new(RecordingSender::failing(|| {
            HttpError::Transport("connection refused".into())
        }));
        let result = client(Provider::Anthropic, sender).open_stream(&prompt(), "req-4").await;
        assert!(matches!(result, Err(ProxyError::UpstreamFailure(_))));
    }

    #[tokio::test]
    async fn timeout_maps_to_upstream_timeout() {
        let sender = Arc::new(RecordingSender::failing(|| {
            HttpError::Timeout("no response after 1500ms".into())
        }));
        let result = client(Provider::Anthropic, sender).open_stream(&prompt(), "req-5").await;
        assert!(matches!(result, Err(ProxyError::UpstreamTimeout(_))));
    }

    #[tokio::test]
    async fn error_snippet_is_bounded() {
        let big = vec![b'x'; ERROR_SNIPPET_BYTES * 3];
        let body: ByteStream = Box::pin(futures_util::stream::iter(vec![
            Ok(Bytes::from(big.clone())),
            Ok(Bytes::from(big)),
        ]));
        assert_eq!(read_snippet(body).await.len(), ERROR_SNIPPET_BYTES);
    }

    #[test]
    fn env_resolver_prefers_override_then_config_then_default() {
        let configured = EnvUpstreamResolver::new("http://configured.test/");
        let empty = EnvUpstreamResolver::new("");

        std::env::remove_var(BASE_URL_ENV);
        assert_eq!(configured.base_url(Provider::Anthropic), "http://configured.test");
        assert_eq!(empty.base_url(Provider::OpenAi), "https://api.openai.com");

        std::env::set_var(BASE_URL_ENV, "http://127.0.0.1:4010/");
        let overridden = configured.base_url(Provider::Anthropic);
        std::env::remove_var(BASE_URL_ENV);
        assert_eq!(overridden, "http://127.0.0.1:4010");
    }
}
