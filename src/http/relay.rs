//! The relay handler.
//!
//! # Responsibilities
//! - Tolerantly parse the inbound JSON body
//! - Forward it to the upstream chat endpoint
//! - Hand the upstream body back as a stream, or degrade to the fallback
//!
//! # Design Decisions
//! - Malformed inbound bodies are replaced by `{}`, never rejected
//! - The parsed value is re-serialized before forwarding; the original
//!   request bytes are not preserved
//! - Every forwarding failure collapses into the fallback response, so
//!   the caller always sees HTTP 200

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use hyper::body::Incoming;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::http::response;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Inbound bodies larger than this are treated like unparseable ones.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Why a request degraded to the fallback response.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The upstream could not be reached or the request failed in transit.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// The upstream answered with a non-success status.
    #[error("upstream returned status {0}")]
    Status(StatusCode),

    /// The configured upstream bound elapsed before response headers.
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// The outbound request could not be constructed.
    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

impl RelayError {
    /// Stable label for the degraded-outcome metric.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Upstream(_) => "upstream",
            Self::Status(_) => "status",
            Self::Timeout(_) => "timeout",
            Self::Request(_) => "request",
        }
    }
}

/// Outcome of one relay attempt.
///
/// Both variants serialize to an HTTP 200 for the caller; the distinction
/// exists so logs and metrics can tell failure causes apart.
pub enum RelayOutcome {
    /// The upstream answered with a success status; its body is streamed.
    Streamed(Response<Incoming>),
    /// Forwarding failed; the fixed fallback payload is returned instead.
    Degraded(RelayError),
}

/// `POST /api/ai/apply`: forward the request to the chat backend.
pub async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let body = parse_body(request.into_body()).await;

    tracing::debug!(request_id = %request_id, prompt = ?body.get("prompt"), "Relay prompt");
    tracing::debug!(request_id = %request_id, elements = ?body.get("elements"), "Relay elements");

    let outcome = match forward(&state, &body).await {
        Ok(upstream_response) => RelayOutcome::Streamed(upstream_response),
        Err(e) => RelayOutcome::Degraded(e),
    };

    let config = state.config.load_full();
    match outcome {
        RelayOutcome::Streamed(upstream_response) => {
            if state
                .upstream
                .mark_success(config.health_check.healthy_threshold as usize)
            {
                tracing::info!("Upstream transitioned to healthy");
            }
            metrics::record_upstream_health(state.upstream.is_healthy());
            metrics::record_relay("streamed", "none", start);

            tracing::debug!(request_id = %request_id, "Streaming upstream response");
            response::stream_passthrough(upstream_response)
        }
        RelayOutcome::Degraded(error) => {
            if state
                .upstream
                .mark_failure(config.health_check.unhealthy_threshold as usize)
            {
                tracing::warn!("Upstream transitioned to unhealthy");
            }
            metrics::record_upstream_health(state.upstream.is_healthy());
            metrics::record_relay("degraded", error.reason(), start);

            tracing::error!(
                request_id = %request_id,
                error = %error,
                "Error calling chat backend, serving fallback"
            );
            response::fallback()
        }
    }
}

/// Read and parse the inbound body, substituting `{}` on any failure.
async fn parse_body(body: Body) -> Value {
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return Value::Object(Map::new()),
    };

    serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// Issue the outbound POST and check its status.
///
/// Resolves once upstream response headers arrive; the body is still
/// streaming at that point.
async fn forward(state: &AppState, body: &Value) -> Result<Response<Incoming>, RelayError> {
    let config = state.config.load_full();

    let payload = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());

    let request = Request::builder()
        .method(Method::POST)
        .uri(config.upstream.chat_url.clone())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload))?;

    let response_future = state.client.request(request);
    let response = match config.timeouts.upstream_secs {
        Some(secs) => {
            let bound = Duration::from_secs(secs);
            tokio::time::timeout(bound, response_future)
                .await
                .map_err(|_| RelayError::Timeout(bound))??
        }
        None => response_future.await?,
    };

    if !response.status().is_success() {
        return Err(RelayError::Status(response.status()));
    }

    Ok(response)
}
