//! `AppError` to HTTP mapping and the global error body normaliser.

use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::api::dto::ErrorResponse;
use crate::api::middleware::RequestId;
use crate::error::AppError;

/// Error bodies larger than this are not rewritten.
const MAX_ERROR_BODY: usize = 64 * 1024;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Duplicate { .. } => StatusCode::CONFLICT,
            AppError::Validation { .. }
            | AppError::ValidationErrors { .. }
            | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::ConnectionPool { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database { .. } | AppError::Configuration { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing body. Server-side failures never leak their source.
    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            AppError::NotFound { entity, field, value } => ErrorResponse::new(
                "NOT_FOUND",
                format!("{} with {}={} not found", entity, field, value),
            )
            .with_details(json!({ "entity": entity, "field": field, "value": value })),
            AppError::Duplicate { entity, field, value } => ErrorResponse::new(
                "DUPLICATE",
                format!("{} with {}='{}' already exists", entity, field, value),
            )
            .with_details(json!({ "entity": entity, "field": field, "value": value })),
            AppError::Validation { field, reason } => {
                ErrorResponse::new("VALIDATION_ERROR", reason.clone())
                    .with_details(json!({ "field": field }))
            }
            AppError::ValidationErrors { errors } => {
                ErrorResponse::new("VALIDATION_ERROR", "Request validation failed")
                    .with_details(json!({ "errors": errors }))
            }
            AppError::BadRequest { message } => ErrorResponse::new("BAD_REQUEST", message.clone()),
            AppError::Unauthorized { message } => {
                ErrorResponse::new("UNAUTHORIZED", message.clone())
            }
            AppError::Forbidden { message } => ErrorResponse::new("FORBIDDEN", message.clone()),
            AppError::Database { operation, .. } => {
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred")
                    .with_details(json!({ "operation": operation }))
            }
            AppError::Configuration { key, .. } => {
                ErrorResponse::new("CONFIGURATION_ERROR", "Server misconfiguration")
                    .with_details(json!({ "key": key }))
            }
            AppError::ConnectionPool { .. } => {
                ErrorResponse::new("SERVICE_UNAVAILABLE", "Database connection unavailable")
            }
            AppError::Internal { .. } => {
                ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (status, Json(self.to_error_response())).into_response()
    }
}

/// Gives every 4xx/5xx response the [`ErrorResponse`] shape with the
/// request id filled in.
///
/// JSON error bodies produced by [`AppError`] only gain the `request_id`;
/// plain-text framework errors (unknown route, wrong method, timeouts) are
/// rewritten into the JSON shape.
pub async fn global_error_handler(request: Request, next: Next) -> Response {
    let request_id = request.extensions().get::<RequestId>().map(|id| id.0.clone());
    let response = next.run(request).await;

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => return error_body(status, fallback_response(status, ""), request_id),
    };

    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let error = match serde_json::from_slice::<ErrorResponse>(&bytes) {
        Ok(error) if is_json => error,
        _ if is_json => {
            // Foreign JSON error; keep it untouched
            return Response::from_parts(parts, Body::from(bytes));
        }
        _ => fallback_response(status, String::from_utf8_lossy(&bytes).trim()),
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut response = error_body(status, error, request_id);
    for (name, value) in parts.headers.iter() {
        response.headers_mut().entry(name).or_insert_with(|| value.clone());
    }
    response
}

fn error_body(status: StatusCode, error: ErrorResponse, request_id: Option<String>) -> Response {
    let error = match request_id {
        Some(id) => error.with_request_id(id),
        None => error,
    };
    (status, Json(error)).into_response()
}

fn fallback_response(status: StatusCode, original: &str) -> ErrorResponse {
    let (code, default_message) = match status {
        StatusCode::BAD_REQUEST => ("BAD_REQUEST", "Malformed request"),
        StatusCode::UNAUTHORIZED => ("UNAUTHORIZED", "Authentication required"),
        StatusCode::FORBIDDEN => ("FORBIDDEN", "Access denied"),
        StatusCode::NOT_FOUND => ("NOT_FOUND", "The requested resource was not found"),
        StatusCode::METHOD_NOT_ALLOWED => ("METHOD_NOT_ALLOWED", "Method not allowed for this endpoint"),
        StatusCode::REQUEST_TIMEOUT => ("REQUEST_TIMEOUT", "The request timed out"),
        StatusCode::PAYLOAD_TOO_LARGE => ("PAYLOAD_TOO_LARGE", "Request body too large"),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => ("UNSUPPORTED_MEDIA_TYPE", "Unsupported content type"),
        StatusCode::UNPROCESSABLE_ENTITY => ("UNPROCESSABLE_ENTITY", "Request could not be processed"),
        StatusCode::SERVICE_UNAVAILABLE => ("SERVICE_UNAVAILABLE", "Service temporarily unavailable"),
        s if s.is_server_error() => ("INTERNAL_ERROR", "An internal error occurred"),
        _ => ("CLIENT_ERROR", "The request could not be completed"),
    };

    // Server error text may contain internals
    let message = if original.is_empty() || status.is_server_error() {
        default_message.to_string()
    } else {
        original.to_string()
    };
    ErrorResponse::new(code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationFieldError;
    use axum::Router;
    use axum::routing::get;
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::not_found("recipe", "id", 1), StatusCode::NOT_FOUND),
            (
                AppError::Duplicate {
                    entity: "user".into(),
                    field: "email".into(),
                    value: "a@b.c".into(),
                },
                StatusCode::CONFLICT,
            ),
            (AppError::validation("name", "empty"), StatusCode::BAD_REQUEST),
            (AppError::ValidationErrors { errors: vec![] }, StatusCode::BAD_REQUEST),
            (AppError::bad_request("nope"), StatusCode::BAD_REQUEST),
            (AppError::unauthorized("who"), StatusCode::UNAUTHORIZED),
            (AppError::forbidden("no"), StatusCode::FORBIDDEN),
            (
                AppError::ConnectionPool { source: anyhow::anyhow!("down") },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::Internal { source: anyhow::anyhow!("boom") },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{:?}", error);
        }
    }

    #[tokio::test]
    async fn test_internal_error_hides_source() {
        let response = AppError::Internal { source: anyhow::anyhow!("password=hunter2") }.into_response();
        let json = body_json(response).await;
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert!(!json.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_validation_errors_listed_in_details() {
        let response = AppError::ValidationErrors {
            errors: vec![ValidationFieldError {
                field: "cooking_time".to_string(),
                message: "too short".to_string(),
            }],
        }
        .into_response();
        let json = body_json(response).await;
        assert_eq!(json["details"]["errors"][0]["field"], "cooking_time");
    }

    fn app() -> Router {
        Router::new()
            .route("/missing", get(|| async { AppError::not_found("recipe", "id", 9) }))
            .route("/ok", get(|| async { "fine" }))
            .layer(axum::middleware::from_fn(global_error_handler))
            .layer(axum::middleware::from_fn(
                |mut request: Request, next: Next| async move {
                    request.extensions_mut().insert(RequestId("req-1".to_string()));
                    next.run(request).await
                },
            ))
    }

    #[tokio::test]
    async fn test_app_error_gains_request_id() {
        let response = app()
            .oneshot(axum::http::Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["request_id"], "req-1");
    }

    #[tokio::test]
    async fn test_unknown_route_becomes_json() {
        let response = app()
            .oneshot(axum::http::Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["request_id"], "req-1");
    }

    #[tokio::test]
    async fn test_wrong_method_becomes_json() {
        let response = app()
            .oneshot(axum::http::Request::post("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_json(response).await["code"], "METHOD_NOT_ALLOWED");
    }

    #[tokio::test]
    async fn test_success_untouched() {
        let response = app()
            .oneshot(axum::http::Request::get("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"fine");
    }
}
