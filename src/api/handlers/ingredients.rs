//! Ingredient catalogue handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::INGREDIENT_TAG;
use crate::api::dto::{IngredientResponse, IngredientSearchParams};
use crate::error::AppResult;
use crate::state::AppState;

pub fn ingredient_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_ingredients))
        .routes(routes!(get_ingredient))
}

/// GET /api/ingredients - Catalogue, optionally filtered by name prefix
#[utoipa::path(
    get,
    path = "/",
    tag = INGREDIENT_TAG,
    params(IngredientSearchParams),
    responses(
        (status = 200, description = "Ingredients ordered by name", body = Vec<IngredientResponse>)
    )
)]
async fn list_ingredients(
    State(state): State<AppState>,
    Query(params): Query<IngredientSearchParams>,
) -> AppResult<Json<Vec<IngredientResponse>>> {
    let ingredients = state.services.ingredients.search(params.name.as_deref()).await?;
    Ok(Json(ingredients.into_iter().map(Into::into).collect()))
}

/// GET /api/ingredients/{id}
#[utoipa::path(
    get,
    path = "/{id}",
    tag = INGREDIENT_TAG,
    params(("id" = i32, Path, description = "Ingredient ID")),
    responses(
        (status = 200, description = "Ingredient found", body = IngredientResponse),
        (status = 404, description = "Ingredient not found")
    )
)]
async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<IngredientResponse>> {
    let ingredient = state.services.ingredients.get(id).await?;
    Ok(Json(ingredient.into()))
}
