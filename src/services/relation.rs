//! Favorite and shopping cart toggles

use crate::db::repositories::{RecipeRelationRepository, RecipeRepository};
use crate::models::{Recipe, RecipeListKind, ShortRecipe, User};
use crate::services::image::ImageStore;
use crate::services::recipe::short_recipe;
use anyhow::Context;
use std::sync::Arc;

/// Error types for favorite/cart operations
#[derive(Debug, thiserror::Error)]
pub enum RelationServiceError {
    /// The recipe is already on the list
    #[error("Recipe is already in {0}")]
    AlreadyAdded(RecipeListKind),

    /// The recipe is not on the list
    #[error("Recipe is not in {0}")]
    NotInList(RecipeListKind),

    #[error("Recipe not found")]
    RecipeNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Adds and removes recipes on a user's favorites and shopping cart
pub struct RelationService {
    relation_repo: Arc<dyn RecipeRelationRepository>,
    recipe_repo: Arc<dyn RecipeRepository>,
    images: Arc<ImageStore>,
}

impl RelationService {
    pub fn new(
        relation_repo: Arc<dyn RecipeRelationRepository>,
        recipe_repo: Arc<dyn RecipeRepository>,
        images: Arc<ImageStore>,
    ) -> Self {
        Self {
            relation_repo,
            recipe_repo,
            images,
        }
    }

    /// Put a recipe on the user's list and return its short form
    pub async fn add(
        &self,
        kind: RecipeListKind,
        user: &User,
        recipe_id: i64,
    ) -> Result<ShortRecipe, RelationServiceError> {
        let recipe = self.load(recipe_id).await?;

        let added = self.relation_repo.add(kind, user.id, recipe.id).await?;
        if !added {
            return Err(RelationServiceError::AlreadyAdded(kind));
        }

        tracing::debug!(user_id = user.id, recipe_id, list = %kind, "Recipe added");
        Ok(short_recipe(&recipe, &self.images))
    }

    /// Take a recipe off the user's list
    pub async fn remove(
        &self,
        kind: RecipeListKind,
        user: &User,
        recipe_id: i64,
    ) -> Result<(), RelationServiceError> {
        let recipe = self.load(recipe_id).await?;

        let removed = self.relation_repo.remove(kind, user.id, recipe.id).await?;
        if !removed {
            return Err(RelationServiceError::NotInList(kind));
        }

        tracing::debug!(user_id = user.id, recipe_id, list = %kind, "Recipe removed");
        Ok(())
    }

    async fn load(&self, recipe_id: i64) -> Result<Recipe, RelationServiceError> {
        self.recipe_repo
            .get_by_id(recipe_id)
            .await
            .context("Failed to get recipe")?
            .ok_or(RelationServiceError::RecipeNotFound)
    }
}
