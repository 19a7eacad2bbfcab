//! Repository layer for data access operations.

mod ingredient_repo;
mod recipe_repo;
mod relation_repo;
mod user_repo;

pub use ingredient_repo::IngredientRepository;
pub use recipe_repo::{RecipeFilter, RecipeRepository};
pub use relation_repo::RelationRepository;
pub use user_repo::UserRepository;

use crate::db::AsyncDbPool;

/// Aggregates all repositories for convenient access.
///
/// Since `AsyncDbPool` uses `Arc` internally, cloning is cheap.
#[derive(Clone)]
pub struct Repositories {
    pub users: UserRepository,
    pub ingredients: IngredientRepository,
    pub recipes: RecipeRepository,
    pub relations: RelationRepository,
}

impl Repositories {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            ingredients: IngredientRepository::new(pool.clone()),
            recipes: RecipeRepository::new(pool.clone()),
            relations: RelationRepository::new(pool),
        }
    }
}
