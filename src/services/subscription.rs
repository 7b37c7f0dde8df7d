//! Subscription service
//!
//! Following authors and listing followed authors with their newest recipes.

use crate::db::repositories::{RecipeRepository, SubscriptionRepository, UserRepository};
use crate::models::{ListParams, PagedResult, SubscriptionCard, User};
use crate::services::image::ImageStore;
use crate::services::recipe::short_recipe;
use anyhow::Context;
use std::sync::Arc;

/// Error types for subscription operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionServiceError {
    #[error("You cannot subscribe to yourself")]
    SelfSubscription,

    #[error("Already subscribed to this author")]
    AlreadySubscribed,

    #[error("Not subscribed to this author")]
    NotSubscribed,

    #[error("Author not found")]
    AuthorNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Subscription service
pub struct SubscriptionService {
    subscription_repo: Arc<dyn SubscriptionRepository>,
    user_repo: Arc<dyn UserRepository>,
    recipe_repo: Arc<dyn RecipeRepository>,
    images: Arc<ImageStore>,
}

impl SubscriptionService {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository>,
        user_repo: Arc<dyn UserRepository>,
        recipe_repo: Arc<dyn RecipeRepository>,
        images: Arc<ImageStore>,
    ) -> Self {
        Self {
            subscription_repo,
            user_repo,
            recipe_repo,
            images,
        }
    }

    /// Follow an author and return the author's card.
    ///
    /// Self-subscription is rejected before the store is touched.
    pub async fn subscribe(
        &self,
        user: &User,
        author_id: i64,
        recipes_limit: Option<i64>,
    ) -> Result<SubscriptionCard, SubscriptionServiceError> {
        let author = self.load_author(author_id).await?;
        if user.id == author.id {
            return Err(SubscriptionServiceError::SelfSubscription);
        }

        let added = self.subscription_repo.add(user.id, author.id).await?;
        if !added {
            return Err(SubscriptionServiceError::AlreadySubscribed);
        }

        tracing::info!(user_id = user.id, author_id, "Subscribed");
        self.card(&author, recipes_limit).await
    }

    /// Stop following an author
    pub async fn unsubscribe(
        &self,
        user: &User,
        author_id: i64,
    ) -> Result<(), SubscriptionServiceError> {
        let author = self.load_author(author_id).await?;

        let removed = self.subscription_repo.remove(user.id, author.id).await?;
        if !removed {
            return Err(SubscriptionServiceError::NotSubscribed);
        }

        tracing::info!(user_id = user.id, author_id, "Unsubscribed");
        Ok(())
    }

    /// Authors the user follows, in subscription order
    pub async fn list_subscriptions(
        &self,
        user: &User,
        params: &ListParams,
        recipes_limit: Option<i64>,
    ) -> Result<PagedResult<SubscriptionCard>, SubscriptionServiceError> {
        let (authors, total) = self
            .subscription_repo
            .list_authors(user.id, params)
            .await
            .context("Failed to list subscriptions")?;

        let mut cards = Vec::with_capacity(authors.len());
        for author in &authors {
            cards.push(self.card(author, recipes_limit).await?);
        }

        Ok(PagedResult::new(cards, total, params))
    }

    async fn load_author(&self, author_id: i64) -> Result<User, SubscriptionServiceError> {
        self.user_repo
            .get_by_id(author_id)
            .await
            .context("Failed to get author")?
            .ok_or(SubscriptionServiceError::AuthorNotFound)
    }

    /// Card for an author the viewer follows
    async fn card(
        &self,
        author: &User,
        recipes_limit: Option<i64>,
    ) -> Result<SubscriptionCard, SubscriptionServiceError> {
        let limit = recipes_limit.map(|l| l.max(0));
        let recipes = self
            .recipe_repo
            .list_by_author(author.id, limit)
            .await
            .context("Failed to list author recipes")?;
        let recipes_count = self
            .recipe_repo
            .count_by_author(author.id)
            .await
            .context("Failed to count author recipes")?;

        Ok(SubscriptionCard {
            author: author.card(true),
            recipes: recipes
                .iter()
                .map(|r| short_recipe(r, &self.images))
                .collect(),
            recipes_count,
        })
    }
}
