//! User model
//!
//! The User entity plus its two public shapes: the card shown wherever a user
//! appears (recipe author, user lists) and the body returned on registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered user in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique)
    pub email: String,
    /// Username (unique)
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build the public card for this user as seen by a viewer.
    pub fn card(&self, is_subscribed: bool) -> UserCard {
        UserCard {
            email: self.email.clone(),
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_subscribed,
        }
    }

    /// Check if the user authored the given content
    pub fn owns(&self, author_id: i64) -> bool {
        self.id == author_id
    }
}

/// Public user representation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserCard {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the viewer follows this user (false for anonymous viewers)
    pub is_subscribed: bool,
}

/// Response body for a successful registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisteredUser {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for RegisteredUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Plaintext password (will be hashed)
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 7,
            email: "chef@example.com".to_string(),
            username: "chef".to_string(),
            first_name: "Julia".to_string(),
            last_name: "Child".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_card_carries_subscription_flag() {
        let user = sample_user();
        let card = user.card(true);

        assert_eq!(card.id, 7);
        assert_eq!(card.username, "chef");
        assert!(card.is_subscribed);
        assert!(!user.card(false).is_subscribed);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "chef@example.com");
    }

    #[test]
    fn test_owns() {
        let user = sample_user();
        assert!(user.owns(7));
        assert!(!user.owns(8));
    }

    #[test]
    fn test_registered_user_from_user() {
        let registered = RegisteredUser::from(&sample_user());
        let json = serde_json::to_value(&registered).unwrap();

        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 5);
        assert!(json.get("is_subscribed").is_none());
    }
}
