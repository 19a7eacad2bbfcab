//! Router assembly: API groups, OpenAPI document and the middleware stack.

use std::time::Duration;

use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::doc::ApiDoc;
use crate::api::handlers;
use crate::api::middleware::{
    global_error_handler, logging_middleware, optional_auth_middleware, request_id_middleware,
};
use crate::config::ServerConfig;
use crate::state::AppState;

/// Creates the application router.
///
/// # Middleware Order
/// Layers run outermost first:
/// 1. CORS and response compression
/// 2. Request ID - generates or propagates `x-request-id`
/// 3. Logging - one span per request carrying the request ID
/// 4. Global error handler - normalises every error body
/// 5. Request timeout (408)
/// 6. Optional authentication - attaches `AuthUser` for a valid bearer token
///
/// # Routes
/// - `/api/auth` - Token issuance
/// - `/api/users` - Accounts, profiles and subscriptions
/// - `/api/ingredients` - Ingredient catalogue
/// - `/api/recipes` - Recipes, favorites, shopping cart, shopping list download
/// - `/health` - Liveness and readiness
/// - `/swagger-ui`, `/api-docs/openapi.json` - API documentation
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let (router, openapi) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api/auth", handlers::auth::auth_routes())
        .nest("/api/users", handlers::users::user_routes())
        .nest("/api/ingredients", handlers::ingredients::ingredient_routes())
        .nest("/api/recipes", handlers::recipes::recipe_routes())
        .merge(handlers::health::health_routes())
        .split_for_parts();

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout),
        ))
        .layer(middleware::from_fn(global_error_handler))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&server.cors_origins))
        .with_state(state)
}

/// Any origin when `origins` is empty, otherwise exactly the listed ones.
/// Unparseable origins are skipped with a warning.
pub fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION];

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
