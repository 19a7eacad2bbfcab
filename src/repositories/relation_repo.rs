//! Favorites, shopping cart entries and subscriptions.
//!
//! All three tables share the `(user_id, target)` shape, so the repository
//! dispatches on [`RelationKind`] instead of exposing one type per table.

use std::collections::HashSet;

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::error::AppResult;
use crate::models::RelationKind;
use crate::schema::{favorites, ingredients, recipe_ingredients, shopping_carts, subscriptions};
use crate::services::{CartIngredientRow, RelationStore, ShoppingCartSource};

#[derive(Clone)]
pub struct RelationRepository {
    pool: AsyncDbPool,
}

impl RelationRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    /// The subset of `candidates` that `user_id` links to.
    ///
    /// Used to fill the `is_favorited`, `is_in_shopping_cart` and
    /// `is_subscribed` flags of a whole page in one query.
    pub async fn target_ids(
        &self,
        kind: RelationKind,
        user_id: i32,
        candidates: &[i32],
    ) -> AppResult<HashSet<i32>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }
        let mut conn = self.pool.get().await?;

        let ids: Vec<i32> = match kind {
            RelationKind::Favorite => {
                favorites::table
                    .filter(favorites::user_id.eq(user_id))
                    .filter(favorites::recipe_id.eq_any(candidates))
                    .select(favorites::recipe_id)
                    .load(&mut conn)
                    .await?
            }
            RelationKind::ShoppingCart => {
                shopping_carts::table
                    .filter(shopping_carts::user_id.eq(user_id))
                    .filter(shopping_carts::recipe_id.eq_any(candidates))
                    .select(shopping_carts::recipe_id)
                    .load(&mut conn)
                    .await?
            }
            RelationKind::Subscription => {
                subscriptions::table
                    .filter(subscriptions::user_id.eq(user_id))
                    .filter(subscriptions::author_id.eq_any(candidates))
                    .select(subscriptions::author_id)
                    .load(&mut conn)
                    .await?
            }
        };
        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl ShoppingCartSource for RelationRepository {
    async fn cart_recipe_ids(&self, user_id: i32) -> AppResult<Vec<i32>> {
        let mut conn = self.pool.get().await?;

        let ids = shopping_carts::table
            .filter(shopping_carts::user_id.eq(user_id))
            .select(shopping_carts::recipe_id)
            .load(&mut conn)
            .await?;
        Ok(ids)
    }

    async fn ingredient_rows(&self, recipe_ids: &[i32]) -> AppResult<Vec<CartIngredientRow>> {
        let mut conn = self.pool.get().await?;

        let rows = recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq_any(recipe_ids))
            .select((
                ingredients::name,
                ingredients::measurement_unit,
                recipe_ingredients::amount,
            ))
            .load::<CartIngredientRow>(&mut conn)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl RelationStore for RelationRepository {
    async fn exists(&self, kind: RelationKind, user_id: i32, target_id: i32) -> AppResult<bool> {
        let mut conn = self.pool.get().await?;

        let found = match kind {
            RelationKind::Favorite => {
                diesel::select(exists(
                    favorites::table
                        .filter(favorites::user_id.eq(user_id))
                        .filter(favorites::recipe_id.eq(target_id)),
                ))
                .get_result(&mut conn)
                .await?
            }
            RelationKind::ShoppingCart => {
                diesel::select(exists(
                    shopping_carts::table
                        .filter(shopping_carts::user_id.eq(user_id))
                        .filter(shopping_carts::recipe_id.eq(target_id)),
                ))
                .get_result(&mut conn)
                .await?
            }
            RelationKind::Subscription => {
                diesel::select(exists(
                    subscriptions::table
                        .filter(subscriptions::user_id.eq(user_id))
                        .filter(subscriptions::author_id.eq(target_id)),
                ))
                .get_result(&mut conn)
                .await?
            }
        };
        Ok(found)
    }

    async fn insert(&self, kind: RelationKind, user_id: i32, target_id: i32) -> AppResult<()> {
        let mut conn = self.pool.get().await?;

        match kind {
            RelationKind::Favorite => {
                diesel::insert_into(favorites::table)
                    .values((
                        favorites::user_id.eq(user_id),
                        favorites::recipe_id.eq(target_id),
                    ))
                    .execute(&mut conn)
                    .await?
            }
            RelationKind::ShoppingCart => {
                diesel::insert_into(shopping_carts::table)
                    .values((
                        shopping_carts::user_id.eq(user_id),
                        shopping_carts::recipe_id.eq(target_id),
                    ))
                    .execute(&mut conn)
                    .await?
            }
            RelationKind::Subscription => {
                diesel::insert_into(subscriptions::table)
                    .values((
                        subscriptions::user_id.eq(user_id),
                        subscriptions::author_id.eq(target_id),
                    ))
                    .execute(&mut conn)
                    .await?
            }
        };
        Ok(())
    }

    async fn delete(&self, kind: RelationKind, user_id: i32, target_id: i32) -> AppResult<usize> {
        let mut conn = self.pool.get().await?;

        let deleted = match kind {
            RelationKind::Favorite => {
                diesel::delete(
                    favorites::table
                        .filter(favorites::user_id.eq(user_id))
                        .filter(favorites::recipe_id.eq(target_id)),
                )
                .execute(&mut conn)
                .await?
            }
            RelationKind::ShoppingCart => {
                diesel::delete(
                    shopping_carts::table
                        .filter(shopping_carts::user_id.eq(user_id))
                        .filter(shopping_carts::recipe_id.eq(target_id)),
                )
                .execute(&mut conn)
                .await?
            }
            RelationKind::Subscription => {
                diesel::delete(
                    subscriptions::table
                        .filter(subscriptions::user_id.eq(user_id))
                        .filter(subscriptions::author_id.eq(target_id)),
                )
                .execute(&mut conn)
                .await?
            }
        };
        Ok(deleted)
    }
}
