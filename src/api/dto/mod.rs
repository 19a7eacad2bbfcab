//! Request and response bodies, grouped by resource.

mod auth;
mod error;
mod health;
mod ingredient;
mod pagination;
mod recipe;
mod user;

pub use auth::{AuthResponse, LoginRequest, RefreshTokenRequest, TokenResponse};
pub use error::ErrorResponse;
pub use health::{ComponentHealth, HealthResponse, HealthStatus};
pub use ingredient::{IngredientResponse, IngredientSearchParams};
pub use pagination::{PagedResponse, PaginationMeta, PaginationParams};
pub use recipe::{
    CreateRecipeRequest, IngredientAmountRequest, RecipeIngredientResponse, RecipeListParams,
    RecipeResponse, RecipeShortResponse, RecipeView, RecipeWriteEcho, UpdateRecipeRequest,
};
pub use user::{
    AvatarRequest, AvatarResponse, RecipesLimitParams, RegisterRequest, SetPasswordRequest,
    SubscriptionResponse, UserResponse,
};
