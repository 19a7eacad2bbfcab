//! User, avatar, password and subscription DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::dto::RecipeShortResponse;
use crate::services::{FollowedAuthor, Registration, UserProfile};

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"), length(max = 254))]
    #[schema(format = "email", max_length = 254)]
    pub email: String,
    /// Letters, digits, `.`, `_` and `-`, starting with a letter
    #[validate(length(min = 2, max = 21, message = "Username must be between 2 and 21 characters"))]
    #[schema(min_length = 2, max_length = 21, example = "chef.anna")]
    pub username: String,
    #[validate(length(min = 1, max = 150, message = "First name must be between 1 and 150 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150, message = "Last name must be between 1 and 150 characters"))]
    pub last_name: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    #[schema(format = "password", min_length = 8, max_length = 128)]
    pub password: String,
}

impl From<RegisterRequest> for Registration {
    fn from(request: RegisterRequest) -> Self {
        Self {
            email: request.email,
            username: request.username,
            first_name: request.first_name,
            last_name: request.last_name,
            password: request.password,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetPasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    #[schema(format = "password")]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    #[schema(format = "password", min_length = 8, max_length = 128)]
    pub new_password: String,
}

/// The avatar is stored as given, typically a URL or data URI.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AvatarRequest {
    #[validate(length(min = 1, message = "Avatar must not be empty"))]
    pub avatar: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct RecipesLimitParams {
    /// Maximum number of recipes embedded per author
    #[validate(range(min = 0, max = 100))]
    pub recipes_limit: Option<u32>,
}

impl RecipesLimitParams {
    pub fn limit(&self) -> Option<usize> {
        self.recipes_limit.map(|n| n as usize)
    }
}

// ============================================================================
// Response DTOs
// ============================================================================

/// A user as seen by the caller; the password hash is never exposed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the caller follows this user
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl From<UserProfile> for UserResponse {
    fn from(profile: UserProfile) -> Self {
        let user = profile.user;
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed: profile.is_subscribed,
            avatar: user.avatar,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvatarResponse {
    pub avatar: Option<String>,
}

/// A followed author with their newest recipes.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeShortResponse>,
    pub recipes_count: usize,
}

impl From<FollowedAuthor> for SubscriptionResponse {
    fn from(followed: FollowedAuthor) -> Self {
        Self {
            user: followed.profile.into(),
            recipes: followed.recipes.into_iter().map(Into::into).collect(),
            recipes_count: followed.recipes_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn user() -> User {
        User {
            id: 3,
            email: "anna@example.com".to_string(),
            username: "anna".to_string(),
            first_name: "Anna".to_string(),
            last_name: "Smith".to_string(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            avatar: None,
            created_at: jiff::Timestamp::UNIX_EPOCH.into(),
            updated_at: jiff::Timestamp::UNIX_EPOCH.into(),
        }
    }

    #[test]
    fn test_user_response_hides_password() {
        let response = UserResponse::from(UserProfile {
            user: user(),
            is_subscribed: true,
        });
        let json = serde_json::to_value(&response).unwrap();

        assert!(json.get("password").is_none());
        assert_eq!(json["is_subscribed"], true);
        assert_eq!(json["avatar"], serde_json::Value::Null);
    }

    #[test]
    fn test_subscription_response_is_flat() {
        let response = SubscriptionResponse::from(FollowedAuthor {
            profile: UserProfile {
                user: user(),
                is_subscribed: true,
            },
            recipes: vec![],
            recipes_count: 4,
        });
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["username"], "anna");
        assert_eq!(json["recipes_count"], 4);
        assert!(json["recipes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_register_request_validation() {
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            username: "anna".to_string(),
            first_name: "Anna".to_string(),
            last_name: "Smith".to_string(),
            password: "short".to_string(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("username"));
    }
}
