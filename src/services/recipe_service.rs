//! Recipe composition: validation, authorship checks and the per-viewer
//! read model.

use std::collections::{HashMap, HashSet};

use crate::error::{AppError, AppResult};
use crate::models::{NewRecipe, Recipe, RecipeChanges, RecipeIngredientLine, RelationKind, User};
use crate::repositories::{RecipeFilter, RecipeRepository, RelationRepository, UserRepository};
use crate::services::{IngredientService, UserProfile};

const MAX_NAME_LEN: usize = 200;

/// One `(ingredient, amount)` pair of a recipe being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: i32,
    pub amount: i32,
}

/// Fields of a new recipe.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub name: String,
    pub image: Option<String>,
    pub description: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
}

/// Partial update. `ingredients`, when present, replaces every row.
#[derive(Debug, Clone, Default)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub cooking_time: Option<i32>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

/// Listing filters as they arrive from the query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    pub author: Option<i32>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeQuery {
    /// Relation filters only narrow the listing for an authenticated viewer.
    pub fn to_filter(self, viewer: Option<i32>) -> RecipeFilter {
        RecipeFilter {
            author_id: self.author,
            favorited_by: viewer.filter(|_| self.is_favorited),
            in_cart_of: viewer.filter(|_| self.is_in_shopping_cart),
        }
    }
}

/// A recipe with its author, ingredients and the viewer's flags.
#[derive(Debug, Clone)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredientLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Clone)]
pub struct RecipeService {
    recipes: RecipeRepository,
    users: UserRepository,
    relations: RelationRepository,
    ingredients: IngredientService,
}

impl RecipeService {
    pub fn new(
        recipes: RecipeRepository,
        users: UserRepository,
        relations: RelationRepository,
        ingredients: IngredientService,
    ) -> Self {
        Self {
            recipes,
            users,
            relations,
            ingredients,
        }
    }

    /// # Returns
    /// Tuple of (recipes on this page, total matching count)
    pub async fn list(
        &self,
        viewer: Option<i32>,
        query: RecipeQuery,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<RecipeDetails>, i64)> {
        let (page, total) = self.recipes.list(query.to_filter(viewer), offset, limit).await?;
        let details = self.details(viewer, page).await?;
        Ok((details, total))
    }

    /// Gets one recipe with author, ingredients and the viewer's flags.
    ///
    /// # Returns
    /// The recipe details, or `NotFound` error
    pub async fn get(&self, viewer: Option<i32>, recipe_id: i32) -> AppResult<RecipeDetails> {
        let recipe = self.find(recipe_id).await?;
        self.single(viewer, recipe).await
    }

    /// The bare recipe row, or `NotFound`.
    pub async fn find(&self, recipe_id: i32) -> AppResult<Recipe> {
        self.recipes
            .find_by_id(recipe_id)
            .await?
            .ok_or_else(|| AppError::not_found("recipe", "id", recipe_id))
    }

    /// Creates a recipe owned by `author_id`.
    ///
    /// # Arguments
    /// * `author_id` - The caller
    /// * `draft` - Recipe fields and ingredient amounts
    ///
    /// # Returns
    /// The stored recipe as seen by its author
    ///
    /// # Errors
    /// - `Validation` for an empty name or description, a cooking time below 1,
    ///   duplicate ingredients, amounts below 1 or unknown ingredient ids
    pub async fn create(&self, author_id: i32, draft: RecipeDraft) -> AppResult<RecipeDetails> {
        check_name(&draft.name)?;
        check_description(&draft.description)?;
        check_cooking_time(draft.cooking_time)?;
        let lines = check_ingredients(&draft.ingredients)?;
        self.ingredients.ensure_exist(&ingredient_ids(&lines)).await?;

        let new_recipe = NewRecipe {
            author_id,
            name: draft.name.trim().to_string(),
            image: draft.image,
            description: draft.description,
            cooking_time: draft.cooking_time,
        };

        let recipe = self.recipes.create(new_recipe, lines).await?;
        tracing::info!(recipe_id = recipe.id, author_id, "Recipe created");
        self.single(Some(author_id), recipe).await
    }

    /// Applies `patch` to a recipe.
    ///
    /// # Arguments
    /// * `user_id` - The caller, who must be the author
    /// * `recipe_id` - The recipe to change
    /// * `patch` - Fields to change; `ingredients` replaces all rows
    ///
    /// # Returns
    /// The updated recipe, `Forbidden` for non-authors or `NotFound`
    pub async fn update(
        &self,
        user_id: i32,
        recipe_id: i32,
        patch: RecipePatch,
    ) -> AppResult<RecipeDetails> {
        let existing = self.find(recipe_id).await?;
        ensure_author(&existing, user_id)?;

        if let Some(name) = &patch.name {
            check_name(name)?;
        }
        if let Some(description) = &patch.description {
            check_description(description)?;
        }
        if let Some(cooking_time) = patch.cooking_time {
            check_cooking_time(cooking_time)?;
        }
        let lines = match &patch.ingredients {
            Some(items) => {
                let lines = check_ingredients(items)?;
                self.ingredients.ensure_exist(&ingredient_ids(&lines)).await?;
                Some(lines)
            }
            None => None,
        };

        let changes = RecipeChanges {
            name: patch.name.map(|n| n.trim().to_string()),
            image: patch.image,
            description: patch.description,
            cooking_time: patch.cooking_time,
        };

        let recipe = self
            .recipes
            .update(recipe_id, changes, lines)
            .await?
            .ok_or_else(|| AppError::not_found("recipe", "id", recipe_id))?;
        tracing::info!(recipe_id, "Recipe updated");
        self.single(Some(user_id), recipe).await
    }

    /// Deletes a recipe. Only the author may delete; others get `Forbidden`.
    pub async fn delete(&self, user_id: i32, recipe_id: i32) -> AppResult<()> {
        let existing = self.find(recipe_id).await?;
        ensure_author(&existing, user_id)?;

        self.recipes.delete(recipe_id).await?;
        tracing::info!(recipe_id, "Recipe deleted");
        Ok(())
    }

    async fn single(&self, viewer: Option<i32>, recipe: Recipe) -> AppResult<RecipeDetails> {
        let recipe_id = recipe.id;
        self.details(viewer, vec![recipe])
            .await?
            .pop()
            .ok_or_else(|| AppError::not_found("recipe", "id", recipe_id))
    }

    /// Builds the read model for a page with one query per concern.
    async fn details(&self, viewer: Option<i32>, page: Vec<Recipe>) -> AppResult<Vec<RecipeDetails>> {
        if page.is_empty() {
            return Ok(Vec::new());
        }

        let recipe_ids: Vec<i32> = page.iter().map(|r| r.id).collect();
        let mut author_ids: Vec<i32> = page.iter().map(|r| r.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<i32, User> = self
            .users
            .find_many(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut lines: HashMap<i32, Vec<RecipeIngredientLine>> = HashMap::new();
        for line in self.recipes.ingredient_lines(&recipe_ids).await? {
            lines.entry(line.recipe_id).or_default().push(line);
        }

        let (favorited, in_cart, followed) = match viewer {
            Some(viewer) => (
                self.relations
                    .target_ids(RelationKind::Favorite, viewer, &recipe_ids)
                    .await?,
                self.relations
                    .target_ids(RelationKind::ShoppingCart, viewer, &recipe_ids)
                    .await?,
                self.relations
                    .target_ids(RelationKind::Subscription, viewer, &author_ids)
                    .await?,
            ),
            None => (HashSet::new(), HashSet::new(), HashSet::new()),
        };

        page.into_iter()
            .map(|recipe| {
                let author = authors
                    .get(&recipe.author_id)
                    .cloned()
                    .ok_or_else(|| AppError::not_found("user", "id", recipe.author_id))?;
                Ok(RecipeDetails {
                    author: UserProfile {
                        is_subscribed: followed.contains(&author.id),
                        user: author,
                    },
                    ingredients: lines.remove(&recipe.id).unwrap_or_default(),
                    is_favorited: favorited.contains(&recipe.id),
                    is_in_shopping_cart: in_cart.contains(&recipe.id),
                    recipe,
                })
            })
            .collect()
    }
}

fn ensure_author(recipe: &Recipe, user_id: i32) -> AppResult<()> {
    if recipe.author_id != user_id {
        return Err(AppError::forbidden("Only the author can modify this recipe"));
    }
    Ok(())
}

fn check_name(name: &str) -> AppResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "Name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(
            "name",
            format!("Name must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    Ok(())
}

fn check_description(description: &str) -> AppResult<()> {
    if description.trim().is_empty() {
        return Err(AppError::validation("description", "Description must not be empty"));
    }
    Ok(())
}

fn check_cooking_time(cooking_time: i32) -> AppResult<()> {
    if cooking_time < 1 {
        return Err(AppError::validation(
            "cooking_time",
            "Cooking time must be at least 1 minute",
        ));
    }
    Ok(())
}

/// Rejects an empty list, repeated ingredients and non-positive amounts.
///
/// # Returns
/// The `(ingredient_id, amount)` pairs in input order.
fn check_ingredients(items: &[IngredientAmount]) -> AppResult<Vec<(i32, i32)>> {
    if items.is_empty() {
        return Err(AppError::validation("ingredients", "At least one ingredient is required"));
    }

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id) {
            return Err(AppError::validation(
                "ingredients",
                format!("Ingredient {} is listed more than once", item.id),
            ));
        }
        if item.amount < 1 {
            return Err(AppError::validation(
                "ingredients",
                format!("Amount of ingredient {} must be greater than 0", item.id),
            ));
        }
    }

    Ok(items.iter().map(|i| (i.id, i.amount)).collect())
}

fn ingredient_ids(lines: &[(i32, i32)]) -> Vec<i32> {
    lines.iter().map(|&(id, _)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i32, amount: i32) -> IngredientAmount {
        IngredientAmount { id, amount }
    }

    fn reason_for(result: AppResult<impl std::fmt::Debug>) -> (String, String) {
        match result {
            Err(AppError::Validation { field, reason }) => (field, reason),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_ingredients_must_not_be_empty() {
        let (field, _) = reason_for(check_ingredients(&[]));
        assert_eq!(field, "ingredients");
    }

    #[test]
    fn test_duplicate_ingredients_rejected() {
        let (_, reason) = reason_for(check_ingredients(&[item(1, 10), item(2, 5), item(1, 3)]));
        assert!(reason.contains("more than once"));
    }

    #[test]
    fn test_amounts_must_be_positive() {
        let (_, reason) = reason_for(check_ingredients(&[item(1, 0)]));
        assert!(reason.contains("greater than 0"));
        assert!(check_ingredients(&[item(1, -5)]).is_err());
    }

    #[test]
    fn test_valid_ingredients_keep_order() {
        let lines = check_ingredients(&[item(3, 100), item(1, 2)]).unwrap();
        assert_eq!(lines, vec![(3, 100), (1, 2)]);
        assert_eq!(ingredient_ids(&lines), vec![3, 1]);
    }

    #[test]
    fn test_scalar_field_rules() {
        assert_eq!(reason_for(check_name("   ")).0, "name");
        assert_eq!(reason_for(check_name(&"x".repeat(201))).0, "name");
        assert!(check_name(&"x".repeat(200)).is_ok());
        assert_eq!(reason_for(check_description("")).0, "description");
        assert_eq!(reason_for(check_cooking_time(0)).0, "cooking_time");
        assert!(check_cooking_time(1).is_ok());
    }

    #[test]
    fn test_only_author_may_modify() {
        let recipe = Recipe {
            id: 1,
            author_id: 7,
            name: "Soup".to_string(),
            image: None,
            description: "Hot".to_string(),
            cooking_time: 20,
            pub_date: jiff::Timestamp::UNIX_EPOCH.into(),
        };
        assert!(ensure_author(&recipe, 7).is_ok());
        assert!(matches!(ensure_author(&recipe, 8), Err(AppError::Forbidden { .. })));
    }

    #[test]
    fn test_relation_filters_need_a_viewer() {
        let query = RecipeQuery {
            author: Some(4),
            is_favorited: true,
            is_in_shopping_cart: true,
        };
        assert_eq!(
            query.to_filter(None),
            RecipeFilter {
                author_id: Some(4),
                favorited_by: None,
                in_cart_of: None
            }
        );
        assert_eq!(query.to_filter(Some(9)).favorited_by, Some(9));
        assert_eq!(query.to_filter(Some(9)).in_cart_of, Some(9));

        let plain = RecipeQuery::default().to_filter(Some(9));
        assert_eq!(plain, RecipeFilter::default());
    }
}
