//! Business logic between the HTTP handlers and the repositories.

mod ingredient_service;
mod recipe_service;
mod relation_service;
mod shopping_list;
mod user_service;

pub use ingredient_service::IngredientService;
pub use recipe_service::{
    IngredientAmount, RecipeDetails, RecipeDraft, RecipePatch, RecipeQuery, RecipeService,
};
pub use relation_service::{
    RelationOutcome, RelationService, RelationStore, RelationTarget, RelationTargets,
    ServiceTargets,
};
pub use shopping_list::{
    AggregatedLine, CartIngredientRow, DEFAULT_SHOPPING_LIST_HEADER, SHOPPING_LIST_DISPOSITION,
    SHOPPING_LIST_FILENAME, ShoppingCartSource, ShoppingListService, aggregate, render,
};
pub use user_service::{FollowedAuthor, Registration, UserProfile, UserService, check_username};

#[cfg(test)]
pub(crate) use shopping_list::tests::InMemoryCart;

use std::sync::Arc;

use crate::config::ShoppingListConfig;
use crate::repositories::Repositories;

/// Every service, cloned into the Axum state.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub ingredients: IngredientService,
    pub recipes: RecipeService,
    pub relations: RelationService,
    pub shopping_list: ShoppingListService,
}

impl Services {
    pub fn new(repos: Repositories, shopping_list: &ShoppingListConfig) -> Self {
        let cart_source = Arc::new(repos.relations.clone());
        Self::with_cart_source(repos, shopping_list, cart_source)
    }

    /// Same as [`Services::new`] with the shopping list reading from `cart_source`.
    pub fn with_cart_source(
        repos: Repositories,
        shopping_list: &ShoppingListConfig,
        cart_source: Arc<dyn ShoppingCartSource>,
    ) -> Self {
        let ingredients = IngredientService::new(repos.ingredients);
        let users = UserService::new(
            repos.users.clone(),
            repos.recipes.clone(),
            repos.relations.clone(),
        );
        let recipes = RecipeService::new(
            repos.recipes,
            repos.users,
            repos.relations.clone(),
            ingredients.clone(),
        );
        let relations = RelationService::new(
            Arc::new(repos.relations),
            Arc::new(ServiceTargets::new(recipes.clone(), users.clone())),
        );

        Self {
            users,
            ingredients,
            recipes,
            relations,
            shopping_list: ShoppingListService::new(cart_source, shopping_list.header.clone()),
        }
    }
}
