//! Recipe repository: recipes and their ingredient rows.

use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{NewRecipe, NewRecipeIngredient, Recipe, RecipeChanges, RecipeIngredientLine};
use crate::schema::{favorites, ingredients, recipe_ingredients, recipes, shopping_carts};

/// Restricts a recipe listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author_id: Option<i32>,
    /// Only recipes favorited by this user
    pub favorited_by: Option<i32>,
    /// Only recipes in this user's shopping cart
    pub in_cart_of: Option<i32>,
}

#[derive(Clone)]
pub struct RecipeRepository {
    pool: AsyncDbPool,
}

impl RecipeRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    /// Inserts a recipe together with its ingredient rows in one transaction.
    ///
    /// # Arguments
    /// * `recipe` - The recipe row to insert
    /// * `lines` - `(ingredient_id, amount)` pairs
    ///
    /// # Returns
    /// The created recipe with generated id and `pub_date`
    pub async fn create(&self, recipe: NewRecipe, lines: Vec<(i32, i32)>) -> AppResult<Recipe> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let created = diesel::insert_into(recipes::table)
                    .values(&recipe)
                    .returning(Recipe::as_returning())
                    .get_result(conn)
                    .await?;

                insert_lines(conn, created.id, &lines).await?;
                Ok(created)
            }
            .scope_boxed()
        })
        .await
    }

    /// Applies `changes` and, when `lines` is given, replaces the ingredient
    /// rows.
    ///
    /// # Arguments
    /// * `recipe_id` - The recipe to update
    /// * `changes` - Row fields to change (None fields are ignored)
    /// * `lines` - Replacement `(ingredient_id, amount)` pairs
    ///
    /// # Returns
    /// `Some(Recipe)` after the update, `None` if the recipe does not exist
    pub async fn update(
        &self,
        recipe_id: i32,
        changes: RecipeChanges,
        lines: Option<Vec<(i32, i32)>>,
    ) -> AppResult<Option<Recipe>> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let updated = if changes.is_empty() {
                    recipes::table
                        .find(recipe_id)
                        .select(Recipe::as_select())
                        .first(conn)
                        .await
                        .optional()?
                } else {
                    diesel::update(recipes::table.find(recipe_id))
                        .set(&changes)
                        .returning(Recipe::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?
                };

                let Some(updated) = updated else {
                    return Ok(None);
                };

                if let Some(lines) = lines {
                    diesel::delete(
                        recipe_ingredients::table
                            .filter(recipe_ingredients::recipe_id.eq(recipe_id)),
                    )
                    .execute(conn)
                    .await?;
                    insert_lines(conn, recipe_id, &lines).await?;
                }

                Ok(Some(updated))
            }
            .scope_boxed()
        })
        .await
    }

    /// Deletes a recipe; ingredient rows and relations cascade.
    pub async fn delete(&self, recipe_id: i32) -> AppResult<usize> {
        let mut conn = self.pool.get().await?;

        let deleted = diesel::delete(recipes::table.find(recipe_id))
            .execute(&mut conn)
            .await?;
        Ok(deleted)
    }

    /// Finds a recipe by its ID.
    ///
    /// # Returns
    /// `Some(Recipe)` if found, `None` otherwise
    pub async fn find_by_id(&self, recipe_id: i32) -> AppResult<Option<Recipe>> {
        let mut conn = self.pool.get().await?;

        let recipe = recipes::table
            .find(recipe_id)
            .select(Recipe::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(recipe)
    }

    /// Lists recipes newest first.
    ///
    /// # Returns
    /// Tuple of (recipes on this page, total count)
    pub async fn list(
        &self,
        filter: RecipeFilter,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Recipe>, i64)> {
        let mut conn = self.pool.get().await?;

        let page = filtered(filter)
            .order((recipes::pub_date.desc(), recipes::id.desc()))
            .offset(offset)
            .limit(limit)
            .select(Recipe::as_select())
            .load(&mut conn)
            .await?;

        let total = filtered(filter).count().get_result(&mut conn).await?;
        Ok((page, total))
    }

    /// Every recipe by any of `author_ids`, newest first.
    pub async fn list_by_authors(&self, author_ids: &[i32]) -> AppResult<Vec<Recipe>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await?;

        let found = recipes::table
            .filter(recipes::author_id.eq_any(author_ids))
            .order((recipes::pub_date.desc(), recipes::id.desc()))
            .select(Recipe::as_select())
            .load(&mut conn)
            .await?;
        Ok(found)
    }

    /// Ingredient rows of the given recipes joined with the catalogue,
    /// ordered by recipe then ingredient name.
    pub async fn ingredient_lines(&self, recipe_ids: &[i32]) -> AppResult<Vec<RecipeIngredientLine>> {
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await?;

        let lines = recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq_any(recipe_ids))
            .order((recipe_ingredients::recipe_id.asc(), ingredients::name.asc()))
            .select((
                recipe_ingredients::recipe_id,
                ingredients::id,
                ingredients::name,
                ingredients::measurement_unit,
                recipe_ingredients::amount,
            ))
            .load::<RecipeIngredientLine>(&mut conn)
            .await?;
        Ok(lines)
    }
}

async fn insert_lines(
    conn: &mut AsyncPgConnection,
    recipe_id: i32,
    lines: &[(i32, i32)],
) -> AppResult<()> {
    let rows: Vec<NewRecipeIngredient> = lines
        .iter()
        .map(|&(ingredient_id, amount)| NewRecipeIngredient {
            recipe_id,
            ingredient_id,
            amount,
        })
        .collect();

    diesel::insert_into(recipe_ingredients::table)
        .values(&rows)
        .execute(conn)
        .await?;
    Ok(())
}

fn filtered(filter: RecipeFilter) -> recipes::BoxedQuery<'static, Pg> {
    let mut query = recipes::table.into_boxed();

    if let Some(author_id) = filter.author_id {
        query = query.filter(recipes::author_id.eq(author_id));
    }
    if let Some(user_id) = filter.favorited_by {
        query = query.filter(
            recipes::id.eq_any(
                favorites::table
                    .filter(favorites::user_id.eq(user_id))
                    .select(favorites::recipe_id),
            ),
        );
    }
    if let Some(user_id) = filter.in_cart_of {
        query = query.filter(
            recipes::id.eq_any(
                shopping_carts::table
                    .filter(shopping_carts::user_id.eq(user_id))
                    .select(shopping_carts::recipe_id),
            ),
        );
    }

    query
}
