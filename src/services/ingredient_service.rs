//! Read-only ingredient catalogue.

use crate::error::{AppError, AppResult};
use crate::models::Ingredient;
use crate::repositories::IngredientRepository;

#[derive(Clone)]
pub struct IngredientService {
    repo: IngredientRepository,
}

impl IngredientService {
    pub fn new(repo: IngredientRepository) -> Self {
        Self { repo }
    }

    /// Catalogue ordered by name; `name` is a case-insensitive prefix.
    pub async fn search(&self, name: Option<&str>) -> AppResult<Vec<Ingredient>> {
        self.repo.search(name.map(str::trim)).await
    }

    /// Gets an ingredient by its ID.
    ///
    /// # Returns
    /// The ingredient if found, or `NotFound` error
    pub async fn get(&self, ingredient_id: i32) -> AppResult<Ingredient> {
        self.repo
            .find_by_id(ingredient_id)
            .await?
            .ok_or_else(|| AppError::not_found("ingredient", "id", ingredient_id))
    }

    /// Fails with a validation error naming the first id missing from the
    /// catalogue.
    pub async fn ensure_exist(&self, ids: &[i32]) -> AppResult<()> {
        let found = self.repo.existing_ids(ids).await?;
        match ids.iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(AppError::validation(
                "ingredients",
                format!("Ingredient {} does not exist", missing),
            )),
            None => Ok(()),
        }
    }
}
