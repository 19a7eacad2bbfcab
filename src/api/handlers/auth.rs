//! Token issuance: login and refresh.

use axum::Json;
use axum::extract::State;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::AUTH_TAG;
use crate::api::dto::{AuthResponse, LoginRequest, RefreshTokenRequest, TokenResponse, UserResponse};
use crate::error::AppResult;
use crate::services::UserProfile;
use crate::state::AppState;
use crate::utils::jwt::{generate_token_pair, validate_refresh_token};
use crate::utils::validate::ValidatedJson;

/// - `POST /login`
/// - `POST /refresh`
pub fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(refresh_token))
}

/// POST /api/auth/login - Exchange email and password for tokens
#[utoipa::path(
    post,
    path = "/login",
    tag = AUTH_TAG,
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Invalid credentials")
    )
)]
async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = state
        .services
        .users
        .authenticate(&payload.email, &payload.password)
        .await?;
    let tokens = generate_token_pair(user.id, &user.username, &state.jwt_config)?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(AuthResponse {
        user: UserResponse::from(UserProfile {
            user,
            is_subscribed: false,
        }),
        tokens: tokens.into(),
    }))
}

/// POST /api/auth/refresh - Rotate both tokens
#[utoipa::path(
    post,
    path = "/refresh",
    tag = AUTH_TAG,
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshTokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let claims = validate_refresh_token(&payload.refresh_token, &state.jwt_config.secret)?;
    // The account may have been removed since the token was issued
    let user = state.services.users.get_user(claims.user_id()?).await?;

    let tokens = generate_token_pair(user.id, &user.username, &state.jwt_config)?;
    Ok(Json(tokens.into()))
}
