//! Recipe request and response shapes.

use axum::Json;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::dto::UserResponse;
use crate::models::{Recipe, RecipeIngredientLine};
use crate::services::{IngredientAmount, RecipeDetails, RecipeDraft, RecipePatch, RecipeQuery};

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema, Validate)]
pub struct IngredientAmountRequest {
    /// Catalogue id of the ingredient
    pub id: i32,
    #[validate(range(min = 1, message = "Amount must be at least 1"))]
    #[schema(minimum = 1, example = 200)]
    pub amount: i32,
}

impl From<IngredientAmountRequest> for IngredientAmount {
    fn from(request: IngredientAmountRequest) -> Self {
        Self {
            id: request.id,
            amount: request.amount,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRecipeRequest {
    #[validate(length(min = 1, message = "At least one ingredient is required"), nested)]
    pub ingredients: Vec<IngredientAmountRequest>,
    /// Opaque image reference, stored as given
    pub image: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    /// Required unless `text` is given
    #[serde(default)]
    pub description: Option<String>,
    /// Older clients' name for `description`, used when it is absent or empty
    #[serde(default)]
    pub text: Option<String>,
    /// Minutes
    #[validate(range(min = 1, message = "Cooking time must be at least 1 minute"))]
    #[schema(minimum = 1, example = 30)]
    pub cooking_time: i32,
}

impl From<CreateRecipeRequest> for RecipeDraft {
    fn from(request: CreateRecipeRequest) -> Self {
        Self {
            name: request.name,
            image: request.image,
            description: pick_description(request.description, request.text).unwrap_or_default(),
            cooking_time: request.cooking_time,
            ingredients: request.ingredients.into_iter().map(Into::into).collect(),
        }
    }
}

/// Omitted fields keep their stored value; `ingredients` replaces all rows.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateRecipeRequest {
    #[validate(length(min = 1, message = "At least one ingredient is required"), nested)]
    pub ingredients: Option<Vec<IngredientAmountRequest>>,
    pub image: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    /// Fallback for `description`
    pub text: Option<String>,
    #[validate(range(min = 1, message = "Cooking time must be at least 1 minute"))]
    pub cooking_time: Option<i32>,
}

impl From<UpdateRecipeRequest> for RecipePatch {
    fn from(request: UpdateRecipeRequest) -> Self {
        Self {
            name: request.name,
            image: request.image,
            description: pick_description(request.description, request.text),
            cooking_time: request.cooking_time,
            ingredients: request
                .ingredients
                .map(|items| items.into_iter().map(Into::into).collect()),
        }
    }
}

/// `description` wins unless it is empty, then `text`.
fn pick_description(description: Option<String>, text: Option<String>) -> Option<String> {
    description.filter(|d| !d.is_empty()).or(text)
}

/// Listing filters. Flags accept `1`/`0` as well as `true`/`false`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecipeListParams {
    /// Only recipes by this author
    pub author: Option<i32>,
    /// Only recipes the caller favorited
    #[serde(default, deserialize_with = "deserialize_flag")]
    #[param(value_type = Option<bool>)]
    pub is_favorited: bool,
    /// Only recipes in the caller's shopping cart
    #[serde(default, deserialize_with = "deserialize_flag")]
    #[param(value_type = Option<bool>)]
    pub is_in_shopping_cart: bool,
}

impl From<RecipeListParams> for RecipeQuery {
    fn from(params: RecipeListParams) -> Self {
        Self {
            author: params.author,
            is_favorited: params.is_favorited,
            is_in_shopping_cart: params.is_in_shopping_cart,
        }
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected 0, 1, true or false, got '{}'",
            other
        ))),
    }
}

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeIngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipeIngredientLine> for RecipeIngredientResponse {
    fn from(line: RecipeIngredientLine) -> Self {
        Self {
            id: line.ingredient_id,
            name: line.name,
            measurement_unit: line.measurement_unit,
            amount: line.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub description: String,
    /// Same as `description`
    pub text: String,
    pub cooking_time: i32,
    /// RFC 3339
    #[schema(value_type = String, format = DateTime)]
    pub pub_date: String,
}

impl From<RecipeDetails> for RecipeResponse {
    fn from(details: RecipeDetails) -> Self {
        let recipe = details.recipe;
        Self {
            id: recipe.id,
            author: details.author.into(),
            ingredients: details.ingredients.into_iter().map(Into::into).collect(),
            is_favorited: details.is_favorited,
            is_in_shopping_cart: details.is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.description.clone(),
            description: recipe.description,
            cooking_time: recipe.cooking_time,
            pub_date: recipe.pub_date.to_jiff().to_string(),
        }
    }
}

/// Short shape used by relation toggles and subscriptions.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeShortResponse {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<Recipe> for RecipeShortResponse {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Body returned by create and update.
///
/// Carries the stored recipe in the read shape, flattened, so write
/// responses match what a follow-up `GET` returns.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeWriteEcho {
    #[serde(flatten)]
    pub recipe: RecipeResponse,
}

/// Recipe body chosen by request method.
#[derive(Debug, Clone)]
pub enum RecipeView {
    Read(RecipeResponse),
    Write(RecipeWriteEcho),
}

impl RecipeView {
    pub fn for_method(method: &Method, details: RecipeDetails) -> Self {
        let recipe = RecipeResponse::from(details);
        if method == Method::GET || method == Method::HEAD {
            RecipeView::Read(recipe)
        } else {
            RecipeView::Write(RecipeWriteEcho { recipe })
        }
    }

    pub fn into_inner(self) -> RecipeResponse {
        match self {
            RecipeView::Read(recipe) | RecipeView::Write(RecipeWriteEcho { recipe }) => recipe,
        }
    }
}

impl IntoResponse for RecipeView {
    fn into_response(self) -> Response {
        match self {
            RecipeView::Read(recipe) => Json(recipe).into_response(),
            RecipeView::Write(echo) => Json(echo).into_response(),
        }
    }
}
