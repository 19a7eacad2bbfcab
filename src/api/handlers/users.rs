//! Accounts, the caller's own profile and subscriptions.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::USER_TAG;
use crate::api::dto::{
    AvatarRequest, AvatarResponse, PagedResponse, PaginationParams, RecipesLimitParams,
    RegisterRequest, SetPasswordRequest, SubscriptionResponse, UserResponse,
};
use crate::api::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::{RelationAction, RelationKind};
use crate::services::{RelationOutcome, RelationTarget, UserProfile};
use crate::state::AppState;
use crate::utils::validate::{ValidatedJson, ValidatedQuery};

/// Creates the user routes
///
/// # Routes
/// - `GET|POST /` - List users, register
/// - `GET /me`, `PUT|DELETE /me/avatar`, `POST /set_password`
/// - `GET /subscriptions`
/// - `GET /{id}`, `POST|DELETE /{id}/subscribe`
pub fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_users, register))
        .routes(routes!(me))
        .routes(routes!(set_avatar, delete_avatar))
        .routes(routes!(set_password))
        .routes(routes!(subscriptions))
        .routes(routes!(get_user))
        .routes(routes!(subscribe, unsubscribe))
}

/// GET /api/users - List users by page
#[utoipa::path(
    get,
    path = "/",
    tag = USER_TAG,
    params(PaginationParams),
    responses(
        (status = 200, description = "Users by page", body = PagedResponse<UserResponse>)
    )
)]
async fn list_users(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    ValidatedQuery(params): ValidatedQuery<PaginationParams>,
) -> AppResult<Json<PagedResponse<UserResponse>>> {
    let viewer = caller.map(|c| c.user_id);
    let (profiles, total) = state
        .services
        .users
        .list_profiles(viewer, params.offset(), params.limit())
        .await?;

    Ok(Json(PagedResponse::new(profiles, &params, total).map(UserResponse::from)))
}

/// POST /api/users - Register
#[utoipa::path(
    post,
    path = "/",
    tag = USER_TAG,
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid request data"),
        (status = 409, description = "Email or username taken")
    )
)]
async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state.services.users.register(payload.into()).await?;
    let response = UserResponse::from(UserProfile {
        user,
        is_subscribed: false,
    });
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/users/me - The caller's profile
#[utoipa::path(
    get,
    path = "/me",
    tag = USER_TAG,
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = []))
)]
async fn me(State(state): State<AppState>, caller: AuthUser) -> AppResult<Json<UserResponse>> {
    let user = state.services.users.get_user(caller.user_id).await?;
    Ok(Json(UserResponse::from(UserProfile {
        user,
        is_subscribed: false,
    })))
}

/// PUT /api/users/me/avatar
#[utoipa::path(
    put,
    path = "/me/avatar",
    tag = USER_TAG,
    request_body = AvatarRequest,
    responses(
        (status = 200, description = "Avatar stored", body = AvatarResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = []))
)]
async fn set_avatar(
    State(state): State<AppState>,
    caller: AuthUser,
    ValidatedJson(payload): ValidatedJson<AvatarRequest>,
) -> AppResult<Json<AvatarResponse>> {
    let user = state
        .services
        .users
        .set_avatar(caller.user_id, Some(payload.avatar))
        .await?;
    Ok(Json(AvatarResponse { avatar: user.avatar }))
}

/// DELETE /api/users/me/avatar
#[utoipa::path(
    delete,
    path = "/me/avatar",
    tag = USER_TAG,
    responses(
        (status = 204, description = "Avatar removed"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = []))
)]
async fn delete_avatar(State(state): State<AppState>, caller: AuthUser) -> AppResult<StatusCode> {
    state.services.users.set_avatar(caller.user_id, None).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/users/set_password
#[utoipa::path(
    post,
    path = "/set_password",
    tag = USER_TAG,
    request_body = SetPasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Current password is incorrect"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = []))
)]
async fn set_password(
    State(state): State<AppState>,
    caller: AuthUser,
    ValidatedJson(payload): ValidatedJson<SetPasswordRequest>,
) -> AppResult<StatusCode> {
    state
        .services
        .users
        .change_password(caller.user_id, &payload.current_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/subscriptions - Authors the caller follows
#[utoipa::path(
    get,
    path = "/subscriptions",
    tag = USER_TAG,
    params(PaginationParams, RecipesLimitParams),
    responses(
        (status = 200, description = "Followed authors by page", body = PagedResponse<SubscriptionResponse>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = []))
)]
async fn subscriptions(
    State(state): State<AppState>,
    caller: AuthUser,
    ValidatedQuery(params): ValidatedQuery<PaginationParams>,
    ValidatedQuery(limit): ValidatedQuery<RecipesLimitParams>,
) -> AppResult<Json<PagedResponse<SubscriptionResponse>>> {
    let (authors, total) = state
        .services
        .users
        .subscriptions(caller.user_id, params.offset(), params.limit(), limit.limit())
        .await?;

    Ok(Json(PagedResponse::new(authors, &params, total).map(SubscriptionResponse::from)))
}

/// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/{id}",
    tag = USER_TAG,
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
async fn get_user(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<UserResponse>> {
    let profile = state
        .services
        .users
        .profile(caller.map(|c| c.user_id), id)
        .await?;
    Ok(Json(profile.into()))
}

/// POST /api/users/{id}/subscribe
#[utoipa::path(
    post,
    path = "/{id}/subscribe",
    tag = USER_TAG,
    params(("id" = i32, Path, description = "Author ID"), RecipesLimitParams),
    responses(
        (status = 201, description = "Subscribed", body = SubscriptionResponse),
        (status = 400, description = "Already subscribed or subscribing to oneself"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Author not found")
    ),
    security(("bearerAuth" = []))
)]
async fn subscribe(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i32>,
    ValidatedQuery(limit): ValidatedQuery<RecipesLimitParams>,
) -> AppResult<(StatusCode, Json<SubscriptionResponse>)> {
    let outcome = state
        .services
        .relations
        .toggle(
            caller.user_id,
            id,
            RelationKind::Subscription,
            RelationAction::Add,
            limit.limit(),
        )
        .await?;

    match outcome {
        RelationOutcome::Added(RelationTarget::Author(author)) => {
            Ok((StatusCode::CREATED, Json(author.into())))
        }
        other => Err(AppError::Internal {
            source: anyhow::anyhow!("unexpected subscription outcome: {:?}", other),
        }),
    }
}

/// DELETE /api/users/{id}/subscribe
#[utoipa::path(
    delete,
    path = "/{id}/subscribe",
    tag = USER_TAG,
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 400, description = "Not subscribed"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Author not found")
    ),
    security(("bearerAuth" = []))
)]
async fn unsubscribe(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .relations
        .toggle(
            caller.user_id,
            id,
            RelationKind::Subscription,
            RelationAction::Remove,
            None,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
