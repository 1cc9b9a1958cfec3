//! Response construction for the relay.
//!
//! # Responsibilities
//! - Wrap the upstream body as an incremental event-stream response
//! - Produce the fixed degraded-mode fallback payload
//!
//! # Design Decisions
//! - The streamed response carries a fixed header set; upstream headers
//!   are not forwarded
//! - The fallback reports HTTP 200 so callers degrade without breaking

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Message clients see when forwarding fails.
pub const FALLBACK_MESSAGE: &str = "AI is offline, using local logic.";

/// Fixed payload returned when forwarding fails.
#[derive(Debug, Serialize)]
pub struct FallbackPayload {
    pub status: &'static str,
    pub message: &'static str,
}

/// Wrap an upstream response into the outbound streaming response.
///
/// The body is forwarded as it arrives from the upstream. Only the status
/// and the fixed event-stream headers are set by the relay; whatever
/// headers the upstream sent are discarded.
pub fn stream_passthrough<B>(upstream: Response<B>) -> Response
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<axum::BoxError>,
{
    let (_, body) = upstream.into_parts();

    let mut response = Response::new(Body::new(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

/// The degraded-mode response: HTTP 200 with the fixed JSON payload.
pub fn fallback() -> Response {
    Json(FallbackPayload {
        status: "ok",
        message: FALLBACK_MESSAGE,
    })
    .into_response()
}
