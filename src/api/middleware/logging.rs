//! One span and a completion event per request.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{Instrument, Level, info_span};

use super::RequestId;

pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string());
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let span = info_span!(
        "http_request",
        %method,
        %path,
        route = route.as_deref().unwrap_or(""),
        %request_id,
    );

    async move {
        let start = Instant::now();
        let response = next.run(request).await;
        let status = response.status().as_u16();
        let duration_ms = start.elapsed().as_millis() as u64;

        if response.status().is_server_error() {
            tracing::event!(Level::ERROR, status, duration_ms, "Request completed");
        } else if response.status().is_client_error() {
            tracing::event!(Level::WARN, status, duration_ms, "Request completed");
        } else {
            tracing::event!(Level::INFO, status, duration_ms, "Request completed");
        }
        response
    }
    .instrument(span)
    .await
}
