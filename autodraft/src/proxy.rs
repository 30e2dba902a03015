// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// HTTP front end
//
// Responsibilities:
// - POST /api/generate: validate, compose, open upstream, relay as SSE
// - GET /api/heartbeat
// - JSON error bodies for every failure before streaming starts
// - 404 for unknown paths

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::compose::ComposedPrompt;
use crate::relay::{ChunkClassifier, RelayProcessor, RelayState};
use crate::request::{GenerationRequest, RequestError};
use crate::upstream::ByteStream;

/// Largest generation request body accepted.
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Public message for every upstream failure. Details go to the log only.
const GENERATION_FAILED: &str = "Generation failed";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures that end a request before any event stream is opened.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("failed to read request body: {0}")]
    UnreadableBody(String),

    #[error("request body is not a valid generation request: {0}")]
    MalformedJson(String),

    #[error(transparent)]
    InvalidRequest(#[from] RequestError),

    #[error("upstream returned status {0}")]
    UpstreamStatus(StatusCode),

    #[error("upstream request failed: {0}")]
    UpstreamFailure(String),

    #[error("upstream request timed out: {0}")]
    UpstreamTimeout(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::EmptyBody
            | ProxyError::UnreadableBody(_)
            | ProxyError::MalformedJson(_)
            | ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamStatus(_) | ProxyError::UpstreamFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let public_message = match &self {
            ProxyError::UpstreamStatus(_) | ProxyError::UpstreamFailure(_) => {
                GENERATION_FAILED.to_string()
            }
            ProxyError::UpstreamTimeout(_) => "Generation timed out".to_string(),
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": public_message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Trait: UpstreamClient (dependency injection point)
// ---------------------------------------------------------------------------

/// An opened upstream event stream plus the classifier for its wire format.
pub struct UpstreamStream {
    pub body: ByteStream,
    pub classifier: Arc<dyn ChunkClassifier>,
}

/// Opens streaming generations against an LLM provider.
///
/// Implementations must be Send + Sync so they can be shared across request
/// handlers via `Arc`. A returned stream has already passed the status check.
#[async_trait::async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn open_stream(
        &self,
        prompt: &ComposedPrompt,
        request_id: &str,
    ) -> Result<UpstreamStream, ProxyError>;
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn UpstreamClient>,
    pub idle_timeout: Duration,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Heartbeat endpoint: GET /api/heartbeat -> 200 OK
pub async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not found" })),
    )
        .into_response()
}

/// POST /api/generate
///
/// Everything up to and including the upstream status check happens before
/// the response starts, so those failures get a plain JSON error. After that
/// the response is an event stream.
pub async fn generate_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = Uuid::new_v4().to_string();

    match open_generation(&state, request, &request_id).await {
        Ok(upstream) => {
            let processor = RelayProcessor::new(upstream.classifier, state.idle_timeout)
                .with_request_id(request_id);
            let body = processor.process(upstream.body).map(Ok::<Bytes, Infallible>);

            (
                [
                    (header::CONTENT_TYPE, "text/event-stream"),
                    (header::CACHE_CONTROL, "no-cache"),
                    (header::CONNECTION, "keep-alive"),
                ],
                Body::from_stream(body),
            )
                .into_response()
        }
        Err(e) => {
            if e.status().is_server_error() {
                tracing::warn!(request_id = %request_id, error = %e, "generation failed");
            } else {
                tracing::info!(request_id = %request_id, error = %e, "generation rejected");
            }
            e.into_response()
        }
    }
}

async fn open_generation(
    state: &AppState,
    request: Request<Body>,
    request_id: &str,
) -> Result<UpstreamStream, ProxyError> {
    let body = axum::body::to_bytes(request.into_body(), MAX_REQUEST_BODY_BYTES)
        .await
        .map_err(|e| ProxyError::UnreadableBody(e.to_string()))?;
    if body.is_empty() {
        return Err(ProxyError::EmptyBody);
    }

    let generation: GenerationRequest =
        serde_json::from_slice(&body).map_err(|e| ProxyError::MalformedJson(e.to_string()))?;
    let prompt = generation.compose()?;

    tracing::info!(
        request_id = %request_id,
        template = %generation.template,
        tone = %generation.tone,
        length = %generation.length,
        from = %RelayState::Idle,
        to = %RelayState::UpstreamConnecting,
        "opening upstream stream"
    );

    state.upstream.open_stream(&prompt, request_id).await
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the axum router.
///
/// The upstream client is injected; tests pass a stub.
pub fn build_router(upstream: Arc<dyn UpstreamClient>, idle_timeout: Duration) -> Router {
    let state = AppState {
        upstream,
        idle_timeout,
    };

    Router::new()
        .route("/api/generate", post(generate_handler))
        .route("/api/heartbeat", get(heartbeat))
        .fallback(not_found)
        .with_state(state)
}

/// Default listen port.
pub const DEFAULT_PORT: u16 = 9800;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::AnthropicChunkClassifier;
    use crate::upstream::HttpError;
    use tower::ServiceExt; // for oneshot

    // -----------------------------------------------------------------------
    // Stub upstream clients
    // -----------------------------------------------------------------------

    /// Replays a fixed list of reads as an Anthropic stream.
    struct ScriptedUpstream {
        reads: Vec<Result<Bytes, HttpError>>,
        prompts: tokio::sync::Mutex<Vec<String>>,
    }

    impl ScriptedUpstream {
        fn new(reads: Vec<Result<Bytes, HttpError>>) -> Self {
            Self {
                reads,
                prompts: tokio::sync::Mutex::new(Vec::new()),
            }
        }

        fn with_fragments(fragments: &[&str]) -> Self {
            let mut reads = Vec::new();
            for text in fragments {
                let payload = serde_json::json!({
                    "type": "content_block_delta",
                    "index": 0,
                    "delta": { "type": "text_delta", "text": text },
                });
                reads.push(Ok(Bytes::from(format!(
                    "event: content_block_delta\ndata: {payload}\n\n"
                ))));
            }
            reads.push(Ok(Bytes::from_static(
                b"event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
            )));
            Self::new(reads)
        }
    }

    fn clone_read(read: &Result<Bytes, HttpError>) -> Result<Bytes, HttpError> {
        match read {
            Ok(b) => Ok(b.clone()),
            Err(HttpError::Transport(m)) => Err(HttpError::Transport(m.clone())),
            Err(HttpError::Timeout(m)) => Err(HttpError::Timeout(m.clone())),
        }
    }

    #[async_trait::async_trait]
    impl UpstreamClient for ScriptedUpstream {
        async fn open_stream(
            &self,
            prompt: &ComposedPrompt,
            _request_id: &str,
        ) -> Result<UpstreamStream, ProxyError> {
            self.prompts.lock().await.push(prompt.to_string());
            let reads: Vec<_> = self.reads.iter().map(clone_read).collect();
            Ok(UpstreamStream {
                body: Box::pin(tokio_stream::iter(reads)),
                classifier: Arc::new(AnthropicChunkClassifier),
            })
        }
    }

    /// Always fails to open.
    struct FailingUpstream(fn() -> ProxyError);

    #[async_trait::async_trait]
    impl UpstreamClient for FailingUpstream {
        async fn open_stream(
            &self,
            _prompt: &ComposedPrompt,
            _request_id: &str,
        ) -> Result<UpstreamStream, ProxyError> {
            Err((self.0)())
        }
    }

    fn app(upstream: Arc<dyn UpstreamClient>) -> Router {
        build_router(upstream, Duration::from_secs(30))
    }

    fn json_request(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    async fn error_message(resp: Response) -> String {
        let body = body_string(resp).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        json["error"].as_str().unwrap().to_string()
    }

    const CATS: &str = r#"{"template":"blog","topic":"cats","tone":"casual","length":"short","basePrompt":"Write a comprehensive blog post about"}"#;

    // -----------------------------------------------------------------------
    // Streaming success
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn generate_streams_relay_frames() {
        let upstream = Arc::new(ScriptedUpstream::with_fragments(&["Cats ", "are ", "great."]));
        let resp = app(upstream.clone()).oneshot(json_request("/api/generate", CATS)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(resp.headers()[header::CONNECTION], "keep-alive");

        let body = body_string(resp).await;
        assert_eq!(
            body,
            "data: {\"content\":\"Cats \"}\n\n\
             data: {\"content\":\"are \"}\n\n\
             data: {\"content\":\"great.\"}\n\n\
             data: [DONE]\n\n"
        );
    }

    #[tokio::test]
    async fn generate_sends_composed_prompt_upstream() {
        let upstream = Arc::new(ScriptedUpstream::with_fragments(&["x"]));
        let body = r#"{"template":"email","topic":"  quarterly review ","tone":"formal","length":"long"}"#;
        let resp = app(upstream.clone()).oneshot(json_request("/api/generate", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let prompts = upstream.prompts.lock().await;
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with(
            "Write a professional email about \"quarterly review\". \
             Write in a formal, academic tone with proper structure. \
             Write a comprehensive piece, around 800-1000 words."
        ));
    }

    #[tokio::test]
    async fn interrupted_upstream_ends_stream_without_sentinel() {
        let upstream = Arc::new(ScriptedUpstream::new(vec![
            Ok(Bytes::from_static(
                b"data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"half\"}}\n\n",
            )),
            Err(HttpError::Transport("connection reset".into())),
        ]));
        let resp = app(upstream).oneshot(json_request("/api/generate", CATS)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_string(resp).await;
        assert_eq!(body, "data: {\"content\":\"half\"}\n\n");
    }

    // -----------------------------------------------------------------------
    // Rejections before any upstream call
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn empty_topic_returns_400_without_upstream_call() {
        let upstream = Arc::new(ScriptedUpstream::with_fragments(&["x"]));
        let body = r#"{"template":"blog","topic":"   ","tone":"casual","length":"short"}"#;
        let resp = app(upstream.clone()).oneshot(json_request("/api/generate", body)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(resp).await, "topic must not be empty");
        assert!(upstream.prompts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn empty_body_returns_400() {
        let upstream = Arc::new(ScriptedUpstream::with_fragments(&[]));
        let resp = app(upstream).oneshot(json_request("/api/generate", "")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(error_message(resp).await.contains("empty"));
    }

    #[tokio::test]
    async fn malformed_json_returns_400() {
        let upstream = Arc::new(ScriptedUpstream::with_fragments(&[]));
        let resp = app(upstream)
            .oneshot(json_request("/api/generate", "this is not json {{{"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(error_message(resp).await.contains("not a valid generation request"));
    }

    #[tokio::test]
    async fn missing_topic_field_returns_400() {
        let upstream = Arc::new(ScriptedUpstream::with_fragments(&[]));
        let resp = app(upstream)
            .oneshot(json_request("/api/generate", r#"{"template":"blog"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(error_message(resp).await.contains("topic"));
    }

    #[tokio::test]
    async fn unknown_template_without_base_prompt_returns_400() {
        let upstream = Arc::new(ScriptedUpstream::with_fragments(&[]));
        let resp = app(upstream)
            .oneshot(json_request("/api/generate", r#"{"template":"sonnet","topic":"cats"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(error_message(resp).await.contains("sonnet"));
    }

    #[tokio::test]
    async fn oversized_body_returns_400() {
        let upstream = Arc::new(ScriptedUpstream::with_fragments(&[]));
        let topic = "x".repeat(MAX_REQUEST_BODY_BYTES + 1);
        let body = format!(r#"{{"template":"blog","topic":"{topic}"}}"#);
        let resp = app(upstream).oneshot(json_request("/api/generate", &body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    // -----------------------------------------------------------------------
    // Upstream failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn upstream_500_returns_json_500_without_stream() {
        let upstream = Arc::new(FailingUpstream(|| {
            ProxyError::UpstreamStatus(StatusCode::INTERNAL_SERVER_ERROR)
        }));
        let resp = app(upstream).oneshot(json_request("/api/generate", CATS)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(error_message(resp).await, "Generation failed");
    }

    #[tokio::test]
    async fn upstream_transport_failure_returns_500() {
        let upstream = Arc::new(FailingUpstream(|| {
            ProxyError::UpstreamFailure("connection refused".into())
        }));
        let resp = app(upstream).oneshot(json_request("/api/generate", CATS)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Transport detail stays out of the public body.
        assert_eq!(error_message(resp).await, "Generation failed");
    }

    #[tokio::test]
    async fn upstream_timeout_returns_504() {
        let upstream = Arc::new(FailingUpstream(|| {
            ProxyError::UpstreamTimeout("no response after 30000ms".into())
        }));
        let resp = app(upstream).oneshot(json_request("/api/generate", CATS)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    // -----------------------------------------------------------------------
    // Other routes
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn heartbeat_returns_200() {
        let upstream = Arc::new(ScriptedUpstream::with_fragments(&[]));
        let req = Request::builder()
            .method("GET")
            .uri("/api/heartbeat")
            .body(Body::empty())
            .unwrap();
        let resp = app(upstream).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_path_returns_404() {
        let upstream = Arc::new(ScriptedUpstream::with_fragments(&[]));
        let resp = app(upstream).oneshot(json_request("/v1/messages", CATS)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn concurrent_generations_are_independent() {
        let upstream = Arc::new(ScriptedUpstream::with_fragments(&["a", "b"]));
        let mut handles = Vec::new();
        for i in 0..10 {
            let app = app(upstream.clone());
            handles.push(tokio::spawn(async move {
                let body = format!(r#"{{"template":"blog","topic":"topic {i}"}}"#);
                let resp = app.oneshot(json_request("/api/generate", &body)).await.unwrap();
                body_string(resp).await
            }));
        }
        for handle in handles {
            let body = handle.await.unwrap();
            assert_eq!(
                body,
                "data: {\"content\":\"a\"}\n\ndata: {\"content\":\"b\"}\n\ndata: [DONE]\n\n"
            );
        }
        assert_eq!(upstream.prompts.lock().await.len(), 10);
    }
}
