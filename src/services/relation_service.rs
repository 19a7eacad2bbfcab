//! Favorites, shopping cart and subscriptions through one add/remove flow.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::models::{Recipe, RelationAction, RelationKind};
use crate::services::{FollowedAuthor, RecipeService, UserService};

/// What a successful add returns to the client.
#[derive(Debug, Clone)]
pub enum RelationTarget {
    Recipe(Recipe),
    Author(FollowedAuthor),
}

#[derive(Debug, Clone)]
pub enum RelationOutcome {
    Added(RelationTarget),
    Removed,
}

/// Storage of `(user, target)` links for every [`RelationKind`].
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Whether `user_id` already links to `target_id`.
    async fn exists(&self, kind: RelationKind, user_id: i32, target_id: i32) -> AppResult<bool>;

    /// Creates the link. A concurrent duplicate surfaces as `AppError::Duplicate`.
    async fn insert(&self, kind: RelationKind, user_id: i32, target_id: i32) -> AppResult<()>;

    /// Removes the link and returns the number of deleted rows (0 or 1).
    async fn delete(&self, kind: RelationKind, user_id: i32, target_id: i32) -> AppResult<usize>;
}

/// Lookup of the recipe or author a link points at.
#[async_trait]
pub trait RelationTargets: Send + Sync {
    /// The recipe row, or `NotFound`.
    async fn recipe(&self, recipe_id: i32) -> AppResult<Recipe>;

    /// `NotFound` unless the user exists.
    async fn ensure_author(&self, author_id: i32) -> AppResult<()>;

    /// The author in the followed-authors shape as seen by `viewer`.
    async fn followed_author(
        &self,
        viewer: i32,
        author_id: i32,
        recipes_limit: Option<usize>,
    ) -> AppResult<FollowedAuthor>;
}

/// Resolves targets through the recipe and user services.
#[derive(Clone)]
pub struct ServiceTargets {
    recipes: RecipeService,
    users: UserService,
}

impl ServiceTargets {
    pub fn new(recipes: RecipeService, users: UserService) -> Self {
        Self { recipes, users }
    }
}

#[async_trait]
impl RelationTargets for ServiceTargets {
    async fn recipe(&self, recipe_id: i32) -> AppResult<Recipe> {
        self.recipes.find(recipe_id).await
    }

    async fn ensure_author(&self, author_id: i32) -> AppResult<()> {
        self.users.get_user(author_id).await.map(|_| ())
    }

    async fn followed_author(
        &self,
        viewer: i32,
        author_id: i32,
        recipes_limit: Option<usize>,
    ) -> AppResult<FollowedAuthor> {
        self.users
            .followed_author(viewer, author_id, recipes_limit)
            .await
    }
}

#[derive(Clone)]
pub struct RelationService {
    links: Arc<dyn RelationStore>,
    targets: Arc<dyn RelationTargets>,
}

impl RelationService {
    /// Creates a new RelationService
    ///
    /// # Arguments
    /// * `links` - Link storage, the relation repository in production
    /// * `targets` - Recipe and author lookup
    pub fn new(links: Arc<dyn RelationStore>, targets: Arc<dyn RelationTargets>) -> Self {
        Self { links, targets }
    }

    /// Adds or removes the `kind` link from `user_id` to `target_id`.
    ///
    /// # Arguments
    /// * `user_id` - The acting user
    /// * `target_id` - Recipe id for favorites and the cart, author id for subscriptions
    /// * `recipes_limit` - Only shapes the subscription response
    ///
    /// # Returns
    /// `Added` with the target on a successful add, `Removed` otherwise
    ///
    /// # Errors
    /// - `NotFound` when the target recipe or author does not exist
    /// - `BadRequest` when subscribing to oneself, adding an existing link
    ///   or removing a missing one
    pub async fn toggle(
        &self,
        user_id: i32,
        target_id: i32,
        kind: RelationKind,
        action: RelationAction,
        recipes_limit: Option<usize>,
    ) -> AppResult<RelationOutcome> {
        let recipe = if kind.targets_recipe() {
            Some(self.targets.recipe(target_id).await?)
        } else {
            self.targets.ensure_author(target_id).await?;
            None
        };

        match action {
            RelationAction::Add => {
                check_not_self(kind, user_id, target_id)?;
                if self.links.exists(kind, user_id, target_id).await? {
                    return Err(already_present(kind));
                }
                self.links
                    .insert(kind, user_id, target_id)
                    .await
                    .map_err(|e| match e {
                        AppError::Duplicate { .. } => already_present(kind),
                        other => other,
                    })?;
                tracing::info!(user_id, target_id, relation = %kind, "Relation added");

                let target = match recipe {
                    Some(recipe) => RelationTarget::Recipe(recipe),
                    None => RelationTarget::Author(
                        self.targets
                            .followed_author(user_id, target_id, recipes_limit)
                            .await?,
                    ),
                };
                Ok(RelationOutcome::Added(target))
            }
            RelationAction::Remove => {
                let deleted = self.links.delete(kind, user_id, target_id).await?;
                if deleted == 0 {
                    return Err(not_present(kind));
                }
                tracing::info!(user_id, target_id, relation = %kind, "Relation removed");
                Ok(RelationOutcome::Removed)
            }
        }
    }
}

fn check_not_self(kind: RelationKind, user_id: i32, target_id: i32) -> AppResult<()> {
    if kind == RelationKind::Subscription && user_id == target_id {
        return Err(AppError::bad_request("You cannot subscribe to yourself"));
    }
    Ok(())
}

fn already_present(kind: RelationKind) -> AppError {
    match kind {
        RelationKind::Subscription => AppError::bad_request("You are already subscribed to this author"),
        _ => AppError::bad_request(format!("Recipe is already added to {}", kind)),
    }
}

fn not_present(kind: RelationKind) -> AppError {
    match kind {
        RelationKind::Subscription => AppError::bad_request("You are not subscribed to this author"),
        _ => AppError::bad_request(format!("Recipe is not in {}", kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::services::UserProfile;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Links kept in a set. `racing_insert` makes `insert` fail the way a
    /// unique constraint does when another request wins the race.
    #[derive(Default)]
    struct InMemoryLinks {
        links: Mutex<HashSet<(RelationKind, i32, i32)>>,
        racing_insert: bool,
    }

    impl InMemoryLinks {
        fn with(self, kind: RelationKind, user_id: i32, target_id: i32) -> Self {
            self.links.lock().unwrap().insert((kind, user_id, target_id));
            self
        }

        fn contains(&self, kind: RelationKind, user_id: i32, target_id: i32) -> bool {
            self.links.lock().unwrap().contains(&(kind, user_id, target_id))
        }
    }

    #[async_trait]
    impl RelationStore for InMemoryLinks {
        async fn exists(&self, kind: RelationKind, user_id: i32, target_id: i32) -> AppResult<bool> {
            Ok(self.contains(kind, user_id, target_id))
        }

        async fn insert(&self, kind: RelationKind, user_id: i32, target_id: i32) -> AppResult<()> {
            if self.racing_insert {
                return Err(AppError::Duplicate {
                    entity: kind.entity().to_string(),
                    field: "user_id".to_string(),
                    value: user_id.to_string(),
                });
            }
            self.links.lock().unwrap().insert((kind, user_id, target_id));
            Ok(())
        }

        async fn delete(&self, kind: RelationKind, user_id: i32, target_id: i32) -> AppResult<usize> {
            let removed = self.links.lock().unwrap().remove(&(kind, user_id, target_id));
            Ok(usize::from(removed))
        }
    }

    /// Recipes 1 and 2 by author 10; users 1, 2 and 10 exist.
    struct FixedTargets;

    const RECIPES: [i32; 2] = [1, 2];
    const USERS: [i32; 3] = [1, 2, 10];

    fn recipe(id: i32) -> Recipe {
        Recipe {
            id,
            author_id: 10,
            name: format!("Recipe {}", id),
            image: None,
            description: "Tasty".to_string(),
            cooking_time: 10,
            pub_date: jiff::Timestamp::UNIX_EPOCH.into(),
        }
    }

    fn user(id: i32) -> User {
        User {
            id,
            email: format!("user{}@example.com", id),
            username: format!("user{}", id),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            password: "hash".to_string(),
            avatar: None,
            created_at: jiff::Timestamp::UNIX_EPOCH.into(),
            updated_at: jiff::Timestamp::UNIX_EPOCH.into(),
        }
    }

    #[async_trait]
    impl RelationTargets for FixedTargets {
        async fn recipe(&self, recipe_id: i32) -> AppResult<Recipe> {
            if RECIPES.contains(&recipe_id) {
                Ok(recipe(recipe_id))
            } else {
                Err(AppError::not_found("recipe", "id", recipe_id))
            }
        }

        async fn ensure_author(&self, author_id: i32) -> AppResult<()> {
            if USERS.contains(&author_id) {
                Ok(())
            } else {
                Err(AppError::not_found("user", "id", author_id))
            }
        }

        async fn followed_author(
            &self,
            _viewer: i32,
            author_id: i32,
            recipes_limit: Option<usize>,
        ) -> AppResult<FollowedAuthor> {
            let mut recipes: Vec<Recipe> = RECIPES.iter().map(|id| recipe(*id)).collect();
            let recipes_count = recipes.len();
            if let Some(limit) = recipes_limit {
                recipes.truncate(limit);
            }
            Ok(FollowedAuthor {
                profile: UserProfile {
                    user: user(author_id),
                    is_subscribed: true,
                },
                recipes,
                recipes_count,
            })
        }
    }

    fn service(links: InMemoryLinks) -> (RelationService, Arc<InMemoryLinks>) {
        let links = Arc::new(links);
        let service = RelationService::new(links.clone(), Arc::new(FixedTargets));
        (service, links)
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::BadRequest { message } => message,
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_self_subscription_rejected() {
        assert!(check_not_self(RelationKind::Subscription, 3, 3).is_err());
        assert!(check_not_self(RelationKind::Subscription, 3, 4).is_ok());
        // A user may favorite a recipe whose id equals their own
        assert!(check_not_self(RelationKind::Favorite, 3, 3).is_ok());
    }

    #[test]
    fn test_already_added_messages() {
        assert_eq!(
            message(already_present(RelationKind::Favorite)),
            "Recipe is already added to favorites"
        );
        assert_eq!(
            message(already_present(RelationKind::ShoppingCart)),
            "Recipe is already added to shopping cart"
        );
        assert!(message(already_present(RelationKind::Subscription)).contains("already subscribed"));
    }

    #[test]
    fn test_not_present_messages() {
        assert_eq!(
            message(not_present(RelationKind::ShoppingCart)),
            "Recipe is not in shopping cart"
        );
        assert!(message(not_present(RelationKind::Subscription)).contains("not subscribed"));
    }

    #[tokio::test]
    async fn test_add_recipe_returns_it() {
        let (service, links) = service(InMemoryLinks::default());

        let outcome = service
            .toggle(1, 2, RelationKind::ShoppingCart, RelationAction::Add, None)
            .await
            .unwrap();

        match outcome {
            RelationOutcome::Added(RelationTarget::Recipe(recipe)) => assert_eq!(recipe.id, 2),
            other => panic!("Expected added recipe, got {:?}", other),
        }
        assert!(links.contains(RelationKind::ShoppingCart, 1, 2));
        assert!(!links.contains(RelationKind::Favorite, 1, 2));
    }

    #[tokio::test]
    async fn test_missing_target_is_not_found() {
        let (service, links) = service(InMemoryLinks::default());

        for action in [RelationAction::Add, RelationAction::Remove] {
            let err = service
                .toggle(1, 99, RelationKind::Favorite, action, None)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound { .. }), "got {:?}", err);

            let err = service
                .toggle(1, 99, RelationKind::Subscription, action, None)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound { .. }), "got {:?}", err);
        }
        assert!(links.links.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_adding_existing_link_is_rejected() {
        let (service, _) = service(InMemoryLinks::default().with(RelationKind::Favorite, 1, 1));

        let err = service
            .toggle(1, 1, RelationKind::Favorite, RelationAction::Add, None)
            .await
            .unwrap_err();
        assert_eq!(message(err), "Recipe is already added to favorites");
    }

    #[tokio::test]
    async fn test_duplicate_on_insert_maps_to_already_added() {
        let (service, _) = service(InMemoryLinks {
            racing_insert: true,
            ..Default::default()
        });

        let err = service
            .toggle(1, 10, RelationKind::Subscription, RelationAction::Add, None)
            .await
            .unwrap_err();
        assert_eq!(message(err), "You are already subscribed to this author");
    }

    #[tokio::test]
    async fn test_remove_existing_then_missing() {
        let (service, links) =
            service(InMemoryLinks::default().with(RelationKind::ShoppingCart, 2, 1));

        let outcome = service
            .toggle(2, 1, RelationKind::ShoppingCart, RelationAction::Remove, None)
            .await
            .unwrap();
        assert!(matches!(outcome, RelationOutcome::Removed));
        assert!(!links.contains(RelationKind::ShoppingCart, 2, 1));

        let err = service
            .toggle(2, 1, RelationKind::ShoppingCart, RelationAction::Remove, None)
            .await
            .unwrap_err();
        assert_eq!(message(err), "Recipe is not in shopping cart");
    }

    #[tokio::test]
    async fn test_subscribe_to_self_is_rejected() {
        let (service, links) = service(InMemoryLinks::default());

        let err = service
            .toggle(2, 2, RelationKind::Subscription, RelationAction::Add, None)
            .await
            .unwrap_err();
        assert_eq!(message(err), "You cannot subscribe to yourself");
        assert!(!links.contains(RelationKind::Subscription, 2, 2));
    }

    #[tokio::test]
    async fn test_subscribe_returns_author_with_limited_recipes() {
        let (service, links) = service(InMemoryLinks::default());

        let outcome = service
            .toggle(1, 10, RelationKind::Subscription, RelationAction::Add, Some(1))
            .await
            .unwrap();

        match outcome {
            RelationOutcome::Added(RelationTarget::Author(author)) => {
                assert_eq!(author.profile.user.id, 10);
                assert!(author.profile.is_subscribed);
                assert_eq!(author.recipes.len(), 1);
                assert_eq!(author.recipes_count, 2);
            }
            other => panic!("Expected added author, got {:?}", other),
        }
        assert!(links.contains(RelationKind::Subscription, 1, 10));
    }
}
