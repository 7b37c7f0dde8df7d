//! User service
//!
//! Implements business logic for user management:
//! - Registration with field validation and argon2 hashing
//! - Profile lookup and listing as user cards
//! - Password change
//! - Token authentication for the auth middleware

use crate::db::repositories::{SubscriptionRepository, TokenRepository, UserRepository};
use crate::models::{CreateUserInput, ListParams, PagedResult, User, UserCard};
use crate::services::password::{check_password_policy, hash_password, verify_password};
use anyhow::Context;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Maximum email length
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum username and name length
pub const MAX_NAME_LENGTH: usize = 150;

/// Username reserved for the `/users/me/` route
const RESERVED_USERNAME: &str = "me";

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (unknown token)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// User not found
    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    token_repo: Arc<dyn TokenRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        token_repo: Arc<dyn TokenRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            subscription_repo,
        }
    }

    /// Register a new user
    ///
    /// # Errors
    ///
    /// - `ValidationError` if any field breaks the user field rules
    /// - `UserExists` if username or email is already taken
    /// - `InternalError` for database errors
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        validate_registration(&input)?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let user = User {
            id: 0,
            email: input.email,
            username: input.username,
            first_name: input.first_name,
            last_name: input.last_name,
            password_hash,
            created_at: Utc::now(),
        };

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, username = %created.username, "User registered");
        Ok(created)
    }

    /// Get a user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)
    }

    /// Build a user's card as seen by `viewer`
    pub async fn card_for(
        &self,
        viewer: Option<&User>,
        user: &User,
    ) -> Result<UserCard, UserServiceError> {
        let is_subscribed = match viewer {
            Some(viewer) if viewer.id != user.id => self
                .subscription_repo
                .exists(viewer.id, user.id)
                .await
                .context("Failed to check subscription")?,
            _ => false,
        };
        Ok(user.card(is_subscribed))
    }

    /// Get a user's card by ID
    pub async fn get_card(
        &self,
        viewer: Option<&User>,
        id: i64,
    ) -> Result<UserCard, UserServiceError> {
        let user = self.get_by_id(id).await?;
        self.card_for(viewer, &user).await
    }

    /// List users as cards, ordered by ID
    pub async fn list(
        &self,
        viewer: Option<&User>,
        params: &ListParams,
    ) -> Result<PagedResult<UserCard>, UserServiceError> {
        let (users, total) = self
            .user_repo
            .list(params)
            .await
            .context("Failed to list users")?;

        let mut cards = Vec::with_capacity(users.len());
        for user in &users {
            cards.push(self.card_for(viewer, user).await?);
        }

        Ok(PagedResult::new(cards, total, params))
    }

    /// Change a user's password after verifying the current one
    pub async fn set_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        let valid = verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::ValidationError(
                "current_password: Incorrect password".to_string(),
            ));
        }

        if let Some(reason) = check_password_policy(new_password) {
            return Err(UserServiceError::ValidationError(format!(
                "new_password: {}",
                reason
            )));
        }

        let password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update_password(user.id, &password_hash)
            .await
            .context("Failed to update password")?;

        tracing::info!(user_id = user.id, "Password changed");
        Ok(())
    }

    /// Resolve an API token to its user
    pub async fn authenticate(&self, token: &str) -> Result<User, UserServiceError> {
        let stored = self
            .token_repo
            .get(token)
            .await
            .context("Failed to look up token")?
            .ok_or_else(|| UserServiceError::AuthenticationError("Invalid token".to_string()))?;

        self.user_repo
            .get_by_id(stored.user_id)
            .await
            .context("Failed to load token owner")?
            .ok_or_else(|| UserServiceError::AuthenticationError("Invalid token".to_string()))
    }
}

/// Validate registration fields
fn validate_registration(input: &CreateUserInput) -> Result<(), UserServiceError> {
    let email = input.email.trim();
    if email.is_empty() {
        return Err(UserServiceError::ValidationError(
            "email: This field may not be blank".to_string(),
        ));
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "email: Ensure this field has no more than {} characters",
            MAX_EMAIL_LENGTH
        )));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => {}
        _ => {
            return Err(UserServiceError::ValidationError(
                "email: Enter a valid email address".to_string(),
            ))
        }
    }

    let username = input.username.as_str();
    if username.is_empty() {
        return Err(UserServiceError::ValidationError(
            "username: This field may not be blank".to_string(),
        ));
    }
    if username.chars().count() > MAX_NAME_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "username: Ensure this field has no more than {} characters",
            MAX_NAME_LENGTH
        )));
    }
    if !USERNAME_PATTERN.is_match(username) {
        return Err(UserServiceError::ValidationError(
            "username: Only letters, digits and @/./+/-/_ are allowed".to_string(),
        ));
    }
    if username.eq_ignore_ascii_case(RESERVED_USERNAME) {
        return Err(UserServiceError::ValidationError(format!(
            "username: '{}' is reserved",
            username
        )));
    }

    for (field, value) in [("first_name", &input.first_name), ("last_name", &input.last_name)] {
        if value.trim().is_empty() {
            return Err(UserServiceError::ValidationError(format!(
                "{}: This field may not be blank",
                field
            )));
        }
        if value.chars().count() > MAX_NAME_LENGTH {
            return Err(UserServiceError::ValidationError(format!(
                "{}: Ensure this field has no more than {} characters",
                field, MAX_NAME_LENGTH
            )));
        }
    }

    if let Some(reason) = check_password_policy(&input.password) {
        return Err(UserServiceError::ValidationError(format!(
            "password: {}",
            reason
        )));
    }

    Ok(())
}
