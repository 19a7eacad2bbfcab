//! Accounts, credentials, profiles and the followed-authors listing.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, AppResult};
use crate::models::{NewUser, Recipe, RelationKind, User};
use crate::repositories::{RecipeRepository, RelationRepository, UserRepository};
use crate::services::RelationStore;
use crate::utils::password::{hash_password, verify_password};

static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9._-]{1,20}$").expect("username pattern is valid")
});

/// Reserved because `/api/users/me` shadows it.
const RESERVED_USERNAME: &str = "me";

/// Input for [`UserService::register`]; the password is still plain text.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// A user as seen by a (possibly anonymous) viewer.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    pub is_subscribed: bool,
}

/// An author the viewer follows, with their newest recipes.
#[derive(Debug, Clone)]
pub struct FollowedAuthor {
    pub profile: UserProfile,
    /// Newest first, truncated to the requested limit
    pub recipes: Vec<Recipe>,
    /// Total number of recipes before truncation
    pub recipes_count: usize,
}

#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
    recipes: RecipeRepository,
    relations: RelationRepository,
}

impl UserService {
    /// Creates a new UserService with the given repositories.
    pub fn new(users: UserRepository, recipes: RecipeRepository, relations: RelationRepository) -> Self {
        Self {
            users,
            recipes,
            relations,
        }
    }

    /// Creates an account.
    ///
    /// # Arguments
    /// * `registration` - Account data with the plain-text password
    ///
    /// # Returns
    /// The created user. Email and username collisions surface as
    /// `AppError::Duplicate` from the unique constraints.
    pub async fn register(&self, registration: Registration) -> AppResult<User> {
        check_username(&registration.username)?;

        let new_user = NewUser {
            email: registration.email.trim().to_lowercase(),
            username: registration.username,
            first_name: registration.first_name,
            last_name: registration.last_name,
            password: hash_password(&registration.password)?,
        };

        let user = self.users.create(new_user).await?;
        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Checks an email/password pair.
    ///
    /// # Arguments
    /// * `email` - Login email, matched case-insensitively
    /// * `password` - Plain-text password
    ///
    /// # Returns
    /// The user on success. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<User> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.users.find_by_email(&email).await? else {
            return Err(invalid_credentials());
        };

        if !verify_password(password, &user.password)? {
            tracing::debug!(user_id = user.id, "Password mismatch");
            return Err(invalid_credentials());
        }
        Ok(user)
    }

    /// Gets a user by their ID.
    ///
    /// # Arguments
    /// * `user_id` - The user's ID
    ///
    /// # Returns
    /// The user if found, or `NotFound` error
    pub async fn get_user(&self, user_id: i32) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", "id", user_id))
    }

    /// Gets a profile as seen by `viewer`.
    ///
    /// # Arguments
    /// * `viewer` - The caller, `None` when anonymous
    /// * `user_id` - The profile owner
    ///
    /// # Returns
    /// The profile with `is_subscribed` set for the viewer
    pub async fn profile(&self, viewer: Option<i32>, user_id: i32) -> AppResult<UserProfile> {
        let user = self.get_user(user_id).await?;
        let mut profiles = self.attach_subscription_flags(viewer, vec![user]).await?;
        profiles
            .pop()
            .ok_or_else(|| AppError::not_found("user", "id", user_id))
    }

    /// # Returns
    /// Tuple of (profiles on this page, total user count)
    pub async fn list_profiles(
        &self,
        viewer: Option<i32>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<UserProfile>, i64)> {
        let (users, total) = self.users.list_paginated(offset, limit).await?;
        let profiles = self.attach_subscription_flags(viewer, users).await?;
        Ok((profiles, total))
    }

    /// Sets the avatar, or clears it with `None`.
    pub async fn set_avatar(&self, user_id: i32, avatar: Option<String>) -> AppResult<User> {
        self.users.set_avatar(user_id, avatar).await
    }

    /// Replaces the password after verifying the current one.
    ///
    /// # Arguments
    /// * `user_id` - The account owner
    /// * `current_password` - Must match the stored hash
    /// * `new_password` - Plain text, hashed before storing
    pub async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self.get_user(user_id).await?;
        if !verify_password(current_password, &user.password)? {
            return Err(AppError::validation("current_password", "Current password is incorrect"));
        }

        let hash = hash_password(new_password)?;
        self.users.set_password(user_id, &hash).await?;
        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    /// Authors `follower_id` subscribes to, ordered by username.
    ///
    /// # Returns
    /// Tuple of (authors on this page, total subscription count)
    pub async fn subscriptions(
        &self,
        follower_id: i32,
        offset: i64,
        limit: i64,
        recipes_limit: Option<usize>,
    ) -> AppResult<(Vec<FollowedAuthor>, i64)> {
        let (authors, total) = self
            .users
            .list_followed_authors(follower_id, offset, limit)
            .await?;
        let followed = self.with_recipes(authors, recipes_limit, true).await?;
        Ok((followed, total))
    }

    /// A single author in the followed-authors shape, as returned after
    /// subscribing.
    ///
    /// # Arguments
    /// * `viewer` - The subscriber
    /// * `author_id` - The followed author
    /// * `recipes_limit` - Truncates the embedded recipe list when given
    pub async fn followed_author(
        &self,
        viewer: i32,
        author_id: i32,
        recipes_limit: Option<usize>,
    ) -> AppResult<FollowedAuthor> {
        let author = self.get_user(author_id).await?;
        let is_subscribed = self
            .relations
            .exists(RelationKind::Subscription, viewer, author_id)
            .await?;
        let mut followed = self.with_recipes(vec![author], recipes_limit, is_subscribed).await?;
        followed
            .pop()
            .ok_or_else(|| AppError::not_found("user", "id", author_id))
    }

    async fn with_recipes(
        &self,
        authors: Vec<User>,
        recipes_limit: Option<usize>,
        is_subscribed: bool,
    ) -> AppResult<Vec<FollowedAuthor>> {
        let author_ids: Vec<i32> = authors.iter().map(|u| u.id).collect();
        let mut by_author = group_by_author(self.recipes.list_by_authors(&author_ids).await?);

        Ok(authors
            .into_iter()
            .map(|user| {
                let recipes = by_author.remove(&user.id).unwrap_or_default();
                let (recipes, recipes_count) = limit_recipes(recipes, recipes_limit);
                FollowedAuthor {
                    profile: UserProfile { user, is_subscribed },
                    recipes,
                    recipes_count,
                }
            })
            .collect())
    }

    async fn attach_subscription_flags(
        &self,
        viewer: Option<i32>,
        users: Vec<User>,
    ) -> AppResult<Vec<UserProfile>> {
        let followed = match viewer {
            Some(viewer) => {
                let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
                self.relations
                    .target_ids(RelationKind::Subscription, viewer, &ids)
                    .await?
            }
            None => Default::default(),
        };

        Ok(users
            .into_iter()
            .map(|user| UserProfile {
                is_subscribed: followed.contains(&user.id),
                user,
            })
            .collect())
    }
}

fn invalid_credentials() -> AppError {
    AppError::unauthorized("Invalid email or password")
}

/// Usernames start with a letter, continue with letters, digits, `.`, `_`
/// or `-`, and are 2 to 21 characters long.
pub fn check_username(username: &str) -> AppResult<()> {
    if username.eq_ignore_ascii_case(RESERVED_USERNAME) {
        return Err(AppError::validation("username", "Username 'me' is reserved"));
    }
    if !USERNAME_PATTERN.is_match(username) {
        return Err(AppError::validation(
            "username",
            "Username must start with a letter and contain only letters, digits, '.', '_' or '-'",
        ));
    }
    Ok(())
}

/// Keeps input order (newest first) within each author.
fn group_by_author(recipes: Vec<Recipe>) -> HashMap<i32, Vec<Recipe>> {
    let mut grouped: HashMap<i32, Vec<Recipe>> = HashMap::new();
    for recipe in recipes {
        grouped.entry(recipe.author_id).or_default().push(recipe);
    }
    grouped
}

fn limit_recipes(mut recipes: Vec<Recipe>, limit: Option<usize>) -> (Vec<Recipe>, usize) {
    let count = recipes.len();
    if let Some(limit) = limit {
        recipes.truncate(limit);
    }
    (recipes, count)
}
