//! Recipe CRUD, favorites, shopping cart and the shopping list download.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::RECIPE_TAG;
use crate::api::dto::{
    CreateRecipeRequest, PagedResponse, PaginationParams, RecipeListParams, RecipeResponse,
    RecipeShortResponse, RecipeView, RecipeWriteEcho, UpdateRecipeRequest,
};
use crate::api::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::{RelationAction, RelationKind};
use crate::services::{RelationOutcome, RelationTarget, SHOPPING_LIST_DISPOSITION};
use crate::state::AppState;
use crate::utils::validate::{ValidatedJson, ValidatedQuery};

/// Creates the recipe routes
///
/// # Routes
/// - `GET|POST /`
/// - `GET /download_shopping_cart`
/// - `GET|PATCH|DELETE /{id}`
/// - `POST|DELETE /{id}/favorite`
/// - `POST|DELETE /{id}/shopping_cart`
pub fn recipe_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_recipes, create_recipe))
        .routes(routes!(download_shopping_cart))
        .routes(routes!(get_recipe, update_recipe, delete_recipe))
        .routes(routes!(add_favorite, remove_favorite))
        .routes(routes!(add_to_shopping_cart, remove_from_shopping_cart))
}

/// GET /api/recipes - Newest recipes first
#[utoipa::path(
    get,
    path = "/",
    tag = RECIPE_TAG,
    params(PaginationParams, RecipeListParams),
    responses(
        (status = 200, description = "Recipes by page", body = PagedResponse<RecipeResponse>)
    )
)]
async fn list_recipes(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    ValidatedQuery(page): ValidatedQuery<PaginationParams>,
    Query(filters): Query<RecipeListParams>,
) -> AppResult<Json<PagedResponse<RecipeResponse>>> {
    let (recipes, total) = state
        .services
        .recipes
        .list(
            caller.map(|c| c.user_id),
            filters.into(),
            page.offset(),
            page.limit(),
        )
        .await?;

    Ok(Json(PagedResponse::new(recipes, &page, total).map(RecipeResponse::from)))
}

/// POST /api/recipes
#[utoipa::path(
    post,
    path = "/",
    tag = RECIPE_TAG,
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipeWriteEcho),
        (status = 400, description = "Invalid recipe"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = []))
)]
async fn create_recipe(
    State(state): State<AppState>,
    method: Method,
    caller: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateRecipeRequest>,
) -> AppResult<(StatusCode, RecipeView)> {
    let details = state
        .services
        .recipes
        .create(caller.user_id, payload.into())
        .await?;
    Ok((StatusCode::CREATED, RecipeView::for_method(&method, details)))
}

/// GET /api/recipes/download_shopping_cart - Aggregated shopping list as a text file
#[utoipa::path(
    get,
    path = "/download_shopping_cart",
    tag = RECIPE_TAG,
    responses(
        (status = 200, description = "Shopping list document", body = String, content_type = "text/plain"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = []))
)]
async fn download_shopping_cart(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Response> {
    let document = state.services.shopping_list.render_for(caller.user_id).await?;
    Ok(shopping_list_response(document))
}

fn shopping_list_response(document: String) -> Response {
    let mut response = document.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static(SHOPPING_LIST_DISPOSITION),
    );
    response
}

/// GET /api/recipes/{id}
#[utoipa::path(
    get,
    path = "/{id}",
    tag = RECIPE_TAG,
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe found", body = RecipeResponse),
        (status = 404, description = "Recipe not found")
    )
)]
async fn get_recipe(
    State(state): State<AppState>,
    method: Method,
    caller: Option<AuthUser>,
    Path(id): Path<i32>,
) -> AppResult<RecipeView> {
    let details = state
        .services
        .recipes
        .get(caller.map(|c| c.user_id), id)
        .await?;
    Ok(RecipeView::for_method(&method, details))
}

/// PATCH /api/recipes/{id} - Author only
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = RECIPE_TAG,
    params(("id" = i32, Path, description = "Recipe ID")),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated", body = RecipeWriteEcho),
        (status = 400, description = "Invalid recipe"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearerAuth" = []))
)]
async fn update_recipe(
    State(state): State<AppState>,
    method: Method,
    caller: AuthUser,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<UpdateRecipeRequest>,
) -> AppResult<RecipeView> {
    let details = state
        .services
        .recipes
        .update(caller.user_id, id, payload.into())
        .await?;
    Ok(RecipeView::for_method(&method, details))
}

/// DELETE /api/recipes/{id} - Author only
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = RECIPE_TAG,
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearerAuth" = []))
)]
async fn delete_recipe(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.recipes.delete(caller.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipes/{id}/favorite
#[utoipa::path(
    post,
    path = "/{id}/favorite",
    tag = RECIPE_TAG,
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added to favorites", body = RecipeShortResponse),
        (status = 400, description = "Already in favorites"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearerAuth" = []))
)]
async fn add_favorite(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    toggle_recipe(&state, &caller, id, RelationKind::Favorite, RelationAction::Add).await
}

/// DELETE /api/recipes/{id}/favorite
#[utoipa::path(
    delete,
    path = "/{id}/favorite",
    tag = RECIPE_TAG,
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed from favorites"),
        (status = 400, description = "Not in favorites"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearerAuth" = []))
)]
async fn remove_favorite(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    toggle_recipe(&state, &caller, id, RelationKind::Favorite, RelationAction::Remove).await
}

/// POST /api/recipes/{id}/shopping_cart
#[utoipa::path(
    post,
    path = "/{id}/shopping_cart",
    tag = RECIPE_TAG,
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Added to the shopping cart", body = RecipeShortResponse),
        (status = 400, description = "Already in the shopping cart"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearerAuth" = []))
)]
async fn add_to_shopping_cart(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    toggle_recipe(&state, &caller, id, RelationKind::ShoppingCart, RelationAction::Add).await
}

/// DELETE /api/recipes/{id}/shopping_cart
#[utoipa::path(
    delete,
    path = "/{id}/shopping_cart",
    tag = RECIPE_TAG,
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed from the shopping cart"),
        (status = 400, description = "Not in the shopping cart"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearerAuth" = []))
)]
async fn remove_from_shopping_cart(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    toggle_recipe(&state, &caller, id, RelationKind::ShoppingCart, RelationAction::Remove).await
}

async fn toggle_recipe(
    state: &AppState,
    caller: &AuthUser,
    recipe_id: i32,
    kind: RelationKind,
    action: RelationAction,
) -> AppResult<Response> {
    let outcome = state
        .services
        .relations
        .toggle(caller.user_id, recipe_id, kind, action, None)
        .await?;

    match outcome {
        RelationOutcome::Added(RelationTarget::Recipe(recipe)) => {
            Ok((StatusCode::CREATED, Json(RecipeShortResponse::from(recipe))).into_response())
        }
        RelationOutcome::Removed => Ok(StatusCode::NO_CONTENT.into_response()),
        RelationOutcome::Added(RelationTarget::Author(_)) => Err(AppError::Internal {
            source: anyhow::anyhow!("{} toggle returned an author", kind),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shopping_list_response_headers() {
        let response = shopping_list_response("Shopping list:\n\nFlour (g) - 350".to_string());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"shopping_list.txt\""
        );
    }
}
