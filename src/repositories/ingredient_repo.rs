use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::error::AppResult;
use crate::models::Ingredient;
use crate::schema::ingredients;

#[derive(Clone)]
pub struct IngredientRepository {
    pool: AsyncDbPool,
}

impl IngredientRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    /// Lists the catalogue ordered by name, optionally restricted to names
    /// starting with `prefix` (case-insensitive).
    pub async fn search(&self, prefix: Option<&str>) -> AppResult<Vec<Ingredient>> {
        let mut conn = self.pool.get().await?;

        let mut query = ingredients::table
            .select(Ingredient::as_select())
            .order((ingredients::name.asc(), ingredients::id.asc()))
            .into_boxed();

        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            query = query.filter(ingredients::name.ilike(like_prefix(prefix)));
        }

        let found = query.load(&mut conn).await?;
        Ok(found)
    }

    pub async fn find_by_id(&self, ingredient_id: i32) -> AppResult<Option<Ingredient>> {
        let mut conn = self.pool.get().await?;

        let ingredient = ingredients::table
            .find(ingredient_id)
            .select(Ingredient::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(ingredient)
    }

    /// Returns which of `ids` exist in the catalogue.
    pub async fn existing_ids(&self, ids: &[i32]) -> AppResult<Vec<i32>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await?;

        let found = ingredients::table
            .filter(ingredients::id.eq_any(ids))
            .select(ingredients::id)
            .load(&mut conn)
            .await?;
        Ok(found)
    }
}

/// Escapes LIKE wildcards in user input and appends `%`.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("sug"), "sug%");
        assert_eq!(like_prefix("50%_x"), "50\\%\\_x%");
        assert_eq!(like_prefix("a\\b"), "a\\\\b%");
    }
}
