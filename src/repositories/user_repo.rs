//! User repository for async database operations.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::error::AppResult;
use crate::models::{NewUser, User};
use crate::schema::{subscriptions, users};

/// User repository holding an async connection pool.
///
/// Since `AsyncDbPool` (bb8::Pool) internally uses `Arc`, cloning is cheap.
#[derive(Clone)]
pub struct UserRepository {
    pool: AsyncDbPool,
}

impl UserRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    /// Inserts a new user into the database.
    ///
    /// # Arguments
    /// * `new_user` - The user data to insert
    ///
    /// # Returns
    /// The created user with generated id and timestamps
    pub async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let mut conn = self.pool.get().await?;

        let user = diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .await?;
        Ok(user)
    }

    /// Finds a user by their ID.
    ///
    /// # Arguments
    /// * `user_id` - The user's ID
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn find_by_id(&self, user_id: i32) -> AppResult<Option<User>> {
        let mut conn = self.pool.get().await?;

        let user = users::table
            .find(user_id)
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    /// Finds a user by email.
    ///
    /// # Arguments
    /// * `user_email` - The email address, already normalised to lowercase
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn find_by_email(&self, user_email: &str) -> AppResult<Option<User>> {
        let mut conn = self.pool.get().await?;

        let user = users::table
            .filter(users::email.eq(user_email))
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    /// Loads the users with the given ids, in no particular order.
    pub async fn find_many(&self, user_ids: &[i32]) -> AppResult<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await?;

        let found = users::table
            .filter(users::id.eq_any(user_ids))
            .select(User::as_select())
            .load(&mut conn)
            .await?;
        Ok(found)
    }

    /// Lists users ordered by id.
    ///
    /// # Returns
    /// Tuple of (users on this page, total count)
    pub async fn list_paginated(&self, offset: i64, limit: i64) -> AppResult<(Vec<User>, i64)> {
        let mut conn = self.pool.get().await?;

        let page = users::table
            .order(users::id.asc())
            .offset(offset)
            .limit(limit)
            .select(User::as_select())
            .load(&mut conn)
            .await?;

        let total = users::table.count().get_result(&mut conn).await?;
        Ok((page, total))
    }

    /// Lists the authors `follower_id` is subscribed to, ordered by username.
    ///
    /// # Returns
    /// Tuple of (authors on this page, total count)
    pub async fn list_followed_authors(
        &self,
        follower_id: i32,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<User>, i64)> {
        let mut conn = self.pool.get().await?;

        let followed = subscriptions::table
            .filter(subscriptions::user_id.eq(follower_id))
            .select(subscriptions::author_id);

        let page = users::table
            .filter(users::id.eq_any(followed))
            .order((users::username.asc(), users::id.asc()))
            .offset(offset)
            .limit(limit)
            .select(User::as_select())
            .load(&mut conn)
            .await?;

        let total = subscriptions::table
            .filter(subscriptions::user_id.eq(follower_id))
            .count()
            .get_result(&mut conn)
            .await?;
        Ok((page, total))
    }

    /// Sets or clears the avatar.
    ///
    /// # Arguments
    /// * `user_id` - The user's ID
    /// * `avatar` - New image reference, `None` to clear
    ///
    /// # Returns
    /// The updated user, or `NotFound` error
    pub async fn set_avatar(&self, user_id: i32, avatar: Option<String>) -> AppResult<User> {
        let mut conn = self.pool.get().await?;

        let user = diesel::update(users::table.find(user_id))
            .set((
                users::avatar.eq(avatar),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .returning(User::as_returning())
            .get_result(&mut conn)
            .await?;
        Ok(user)
    }

    /// Stores a new password hash. Returns the number of affected rows.
    pub async fn set_password(&self, user_id: i32, password_hash: &str) -> AppResult<usize> {
        let mut conn = self.pool.get().await?;

        let updated = diesel::update(users::table.find(user_id))
            .set((
                users::password.eq(password_hash),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut conn)
            .await?;
        Ok(updated)
    }
}
