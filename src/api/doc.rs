use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub const AUTH_TAG: &str = "Auth";
pub const USER_TAG: &str = "User";
pub const INGREDIENT_TAG: &str = "Ingredient";
pub const RECIPE_TAG: &str = "Recipe";
pub const HEALTH_TAG: &str = "Health";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Foodgram",
        description = "Recipe sharing API: recipes, favorites, subscriptions and shopping lists",
    ),
    modifiers(&SecurityAddon),
    components(schemas(crate::api::dto::ErrorResponse, crate::error::ValidationFieldError)),
    tags(
        (name = AUTH_TAG, description = "Token issuance"),
        (name = USER_TAG, description = "Accounts, profiles and subscriptions"),
        (name = INGREDIENT_TAG, description = "Ingredient catalogue"),
        (name = RECIPE_TAG, description = "Recipes, favorites, shopping cart and shopping list download"),
        (name = HEALTH_TAG, description = "Health check endpoints"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Access token from /api/auth/login"))
                    .build(),
            ),
        );
    }
}
