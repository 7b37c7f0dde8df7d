//! Recipe service
//!
//! Implements business logic for recipe management:
//! - Draft validation (ingredient and tag sets, amount and time bounds)
//! - Create/update with image decoding and a single write transaction
//! - Author-only update and delete
//! - Detail and list representations for a viewer

use crate::config::RecipeConfig;
use crate::db::repositories::{
    IngredientRepository, RecipeRelationRepository, RecipeRepository, SubscriptionRepository,
    TagRepository, UserRepository,
};
use crate::models::{
    ListParams, NewRecipe, PagedResult, Recipe, RecipeDetail, RecipeDraft, RecipeFilter,
    RecipeListKind, RecipePatch, ShortRecipe, User,
};
use crate::services::image::{ImageError, ImageStore};
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

/// Maximum recipe name length in characters
pub const MAX_RECIPE_NAME_LENGTH: usize = 200;

/// Error types for recipe service operations
#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    /// Validation error (invalid draft or image)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Recipe not found
    #[error("Recipe not found")]
    NotFound,

    /// The user is not the recipe's author
    #[error("Only the author can modify this recipe")]
    Forbidden,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<ImageError> for RecipeServiceError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::InternalError(e) => RecipeServiceError::InternalError(e),
            other => RecipeServiceError::ValidationError(format!("image: {}", other)),
        }
    }
}

/// Check a draft against the authoring rules.
///
/// Does not touch the store; unknown ingredient or tag IDs are checked
/// separately by the service.
pub fn validate_draft(draft: &RecipeDraft, limits: &RecipeConfig) -> Result<(), RecipeServiceError> {
    if draft.ingredients.is_empty() {
        return Err(RecipeServiceError::ValidationError(
            "ingredients: At least one ingredient is required".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(draft.ingredients.len());
    for item in &draft.ingredients {
        if !seen.insert(item.id) {
            return Err(RecipeServiceError::ValidationError(format!(
                "ingredients: Ingredient {} is listed more than once",
                item.id
            )));
        }
        if item.amount <= 0 || item.amount < limits.amount_min || item.amount > limits.amount_max {
            return Err(RecipeServiceError::ValidationError(format!(
                "ingredients: Amount must be between {} and {}",
                limits.amount_min.max(1),
                limits.amount_max
            )));
        }
    }

    if draft.tags.is_empty() {
        return Err(RecipeServiceError::ValidationError(
            "tags: At least one tag is required".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(draft.tags.len());
    for tag_id in &draft.tags {
        if !seen.insert(*tag_id) {
            return Err(RecipeServiceError::ValidationError(format!(
                "tags: Tag {} is listed more than once",
                tag_id
            )));
        }
    }

    if draft.cooking_time < limits.cooking_time_min || draft.cooking_time > limits.cooking_time_max
    {
        return Err(RecipeServiceError::ValidationError(format!(
            "cooking_time: Cooking time must be between {} and {} minutes",
            limits.cooking_time_min, limits.cooking_time_max
        )));
    }

    if draft.name.trim().is_empty() {
        return Err(RecipeServiceError::ValidationError(
            "name: This field may not be blank".to_string(),
        ));
    }
    if draft.name.chars().count() > MAX_RECIPE_NAME_LENGTH {
        return Err(RecipeServiceError::ValidationError(format!(
            "name: Ensure this field has no more than {} characters",
            MAX_RECIPE_NAME_LENGTH
        )));
    }

    if draft.text.trim().is_empty() {
        return Err(RecipeServiceError::ValidationError(
            "text: This field may not be blank".to_string(),
        ));
    }

    Ok(())
}

/// Compact representation used by relation responses and author cards
pub fn short_recipe(recipe: &Recipe, images: &ImageStore) -> ShortRecipe {
    ShortRecipe {
        id: recipe.id,
        name: recipe.name.clone(),
        image: images.public_url(&recipe.image),
        cooking_time: recipe.cooking_time,
    }
}

/// Recipe service for authoring and reading recipes
pub struct RecipeService {
    recipe_repo: Arc<dyn RecipeRepository>,
    ingredient_repo: Arc<dyn IngredientRepository>,
    tag_repo: Arc<dyn TagRepository>,
    user_repo: Arc<dyn UserRepository>,
    relation_repo: Arc<dyn RecipeRelationRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    images: Arc<ImageStore>,
    limits: RecipeConfig,
}

impl RecipeService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        recipe_repo: Arc<dyn RecipeRepository>,
        ingredient_repo: Arc<dyn IngredientRepository>,
        tag_repo: Arc<dyn TagRepository>,
        user_repo: Arc<dyn UserRepository>,
        relation_repo: Arc<dyn RecipeRelationRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        images: Arc<ImageStore>,
        limits: RecipeConfig,
    ) -> Self {
        Self {
            recipe_repo,
            ingredient_repo,
            tag_repo,
            user_repo,
            relation_repo,
            subscription_repo,
            images,
            limits,
        }
    }

    /// Create a recipe authored by `author`
    ///
    /// # Errors
    ///
    /// - `ValidationError` for an invalid draft, unknown ingredient or tag
    ///   IDs, or a missing or bad image
    /// - `InternalError` for database or filesystem errors
    pub async fn create_recipe(
        &self,
        author: &User,
        draft: RecipeDraft,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        validate_draft(&draft, &self.limits)?;
        self.ensure_references_exist(&draft).await?;

        let image_uri = draft
            .image
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| {
                RecipeServiceError::ValidationError("image: This field is required".to_string())
            })?;
        let image = self.images.store(image_uri).await?;

        let new_recipe = NewRecipe {
            author_id: author.id,
            name: draft.name,
            text: draft.text,
            image,
            cooking_time: draft.cooking_time,
            ingredients: draft.ingredients,
            tags: draft.tags,
        };

        let recipe = match self.recipe_repo.create(&new_recipe).await {
            Ok(recipe) => recipe,
            Err(e) => {
                self.images.remove(&new_recipe.image).await;
                return Err(e.context("Failed to create recipe").into());
            }
        };

        tracing::info!(recipe_id = recipe.id, author_id = author.id, "Recipe created");
        self.detail(Some(author), &recipe).await
    }

    /// Update a recipe. Only its author may do this.
    ///
    /// Ingredients and tags are replaced; omitted fields keep their stored
    /// value. A rejected update leaves the stored recipe untouched.
    pub async fn update_recipe(
        &self,
        user: &User,
        id: i64,
        patch: RecipePatch,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let current = self.load(id).await?;
        if !user.owns(current.author_id) {
            return Err(RecipeServiceError::Forbidden);
        }

        let draft = patch.merge_into_draft(&current);
        validate_draft(&draft, &self.limits)?;
        self.ensure_references_exist(&draft).await?;

        let replacement = match draft.image.as_deref().filter(|uri| !uri.trim().is_empty()) {
            Some(uri) => Some(self.images.store(uri).await?),
            None => None,
        };
        let image = replacement
            .clone()
            .unwrap_or_else(|| current.image.clone());

        let new_recipe = NewRecipe {
            author_id: current.author_id,
            name: draft.name,
            text: draft.text,
            image,
            cooking_time: draft.cooking_time,
            ingredients: draft.ingredients,
            tags: draft.tags,
        };

        let recipe = match self.recipe_repo.update(id, &new_recipe).await {
            Ok(recipe) => recipe,
            Err(e) => {
                if let Some(path) = &replacement {
                    self.images.remove(path).await;
                }
                return Err(e.context("Failed to update recipe").into());
            }
        };

        tracing::info!(recipe_id = id, "Recipe updated");
        self.detail(Some(user), &recipe).await
    }

    /// Delete a recipe. Only its author may do this.
    pub async fn delete_recipe(&self, user: &User, id: i64) -> Result<(), RecipeServiceError> {
        let recipe = self.load(id).await?;
        if !user.owns(recipe.author_id) {
            return Err(RecipeServiceError::Forbidden);
        }

        let deleted = self
            .recipe_repo
            .delete(id)
            .await
            .context("Failed to delete recipe")?;
        if !deleted {
            return Err(RecipeServiceError::NotFound);
        }

        tracing::info!(recipe_id = id, "Recipe deleted");
        Ok(())
    }

    /// Get a recipe as seen by `viewer`
    pub async fn get_recipe(
        &self,
        viewer: Option<&User>,
        id: i64,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let recipe = self.load(id).await?;
        self.detail(viewer, &recipe).await
    }

    /// List recipes newest first, as seen by `viewer`
    pub async fn list_recipes(
        &self,
        viewer: Option<&User>,
        filter: &RecipeFilter,
        params: &ListParams,
    ) -> Result<PagedResult<RecipeDetail>, RecipeServiceError> {
        let (recipes, total) = self
            .recipe_repo
            .list(filter, viewer.map(|u| u.id), params)
            .await
            .context("Failed to list recipes")?;

        let mut items = Vec::with_capacity(recipes.len());
        for recipe in &recipes {
            items.push(self.detail(viewer, recipe).await?);
        }

        Ok(PagedResult::new(items, total, params))
    }

    async fn load(&self, id: i64) -> Result<Recipe, RecipeServiceError> {
        self.recipe_repo
            .get_by_id(id)
            .await
            .context("Failed to get recipe")?
            .ok_or(RecipeServiceError::NotFound)
    }

    async fn ensure_references_exist(&self, draft: &RecipeDraft) -> Result<(), RecipeServiceError> {
        for item in &draft.ingredients {
            let exists = self
                .ingredient_repo
                .get_by_id(item.id)
                .await
                .context("Failed to look up ingredient")?
                .is_some();
            if !exists {
                return Err(RecipeServiceError::ValidationError(format!(
                    "ingredients: Ingredient {} does not exist",
                    item.id
                )));
            }
        }

        for tag_id in &draft.tags {
            let exists = self
                .tag_repo
                .get_by_id(*tag_id)
                .await
                .context("Failed to look up tag")?
                .is_some();
            if !exists {
                return Err(RecipeServiceError::ValidationError(format!(
                    "tags: Tag {} does not exist",
                    tag_id
                )));
            }
        }

        Ok(())
    }

    async fn detail(
        &self,
        viewer: Option<&User>,
        recipe: &Recipe,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let tags = self
            .tag_repo
            .get_by_recipe_id(recipe.id)
            .await
            .context("Failed to load recipe tags")?;

        let ingredients = self
            .ingredient_repo
            .get_by_recipe_id(recipe.id)
            .await
            .context("Failed to load recipe ingredients")?;

        let author = self
            .user_repo
            .get_by_id(recipe.author_id)
            .await
            .context("Failed to load recipe author")?
            .ok_or_else(|| anyhow::anyhow!("Recipe {} has no author", recipe.id))?;

        let (is_subscribed, is_favorited, is_in_shopping_cart) = match viewer {
            Some(viewer) => {
                let is_subscribed = viewer.id != author.id
                    && self
                        .subscription_repo
                        .exists(viewer.id, author.id)
                        .await
                        .context("Failed to check subscription")?;
                let is_favorited = self
                    .relation_repo
                    .contains(RecipeListKind::Favorite, viewer.id, recipe.id)
                    .await?;
                let is_in_shopping_cart = self
                    .relation_repo
                    .contains(RecipeListKind::ShoppingCart, viewer.id, recipe.id)
                    .await?;
                (is_subscribed, is_favorited, is_in_shopping_cart)
            }
            None => (false, false, false),
        };

        Ok(RecipeDetail {
            id: recipe.id,
            tags,
            author: author.card(is_subscribed),
            ingredients,
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name.clone(),
            image: self.images.public_url(&recipe.image),
            text: recipe.text.clone(),
            cooking_time: recipe.cooking_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;
    use crate::db::repositories::{
        SqlxIngredientRepository, SqlxRecipeRelationRepository, SqlxRecipeRepository,
        SqlxSubscriptionRepository, SqlxTagRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{CreateIngredientInput, CreateTagInput, IngredientAmount};
    use chrono::Utc;
    use proptest::prelude::*;
    use tempfile::TempDir;

    const IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    struct Fixture {
        media: TempDir,
        pool: DynDatabasePool,
        service: RecipeService,
        author: User,
        other: User,
        salt: i64,
        sugar: i64,
        breakfast: i64,
        dinner: i64,
    }

    async fn create_user(pool: &DynDatabasePool, username: &str) -> User {
        SqlxUserRepository::new(pool.clone())
            .create(&User {
                id: 0,
                email: format!("{}@example.com", username),
                username: username.to_string(),
                first_name: "F".to_string(),
                last_name: "L".to_string(),
                password_hash: "hash".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let media = TempDir::new().unwrap();
        let images = Arc::new(ImageStore::new(MediaConfig {
            root: media.path().to_path_buf(),
            ..MediaConfig::default()
        }));

        let ingredients = SqlxIngredientRepository::new(pool.clone());
        let mut ingredient_ids = Vec::new();
        for name in ["Salt", "Sugar"] {
            let created = ingredients
                .insert_if_absent(&CreateIngredientInput {
                    name: name.to_string(),
                    measurement_unit: "g".to_string(),
                })
                .await
                .unwrap()
                .unwrap();
            ingredient_ids.push(created.id);
        }

        let tags = SqlxTagRepository::new(pool.clone());
        let mut tag_ids = Vec::new();
        for slug in ["breakfast", "dinner"] {
            let created = tags
                .insert_if_absent(&CreateTagInput {
                    name: slug.to_string(),
                    color: "#E26C2D".to_string(),
                    slug: slug.to_string(),
                })
                .await
                .unwrap()
                .unwrap();
            tag_ids.push(created.id);
        }

        let service = RecipeService::new(
            SqlxRecipeRepository::boxed(pool.clone()),
            SqlxIngredientRepository::boxed(pool.clone()),
            SqlxTagRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            SqlxRecipeRelationRepository::boxed(pool.clone()),
            SqlxSubscriptionRepository::boxed(pool.clone()),
            images,
            RecipeConfig::default(),
        );

        Fixture {
            author: create_user(&pool, "author").await,
            other: create_user(&pool, "other").await,
            media,
            pool,
            service,
            salt: ingredient_ids[0],
            sugar: ingredient_ids[1],
            breakfast: tag_ids[0],
            dinner: tag_ids[1],
        }
    }

    fn draft(ingredients: Vec<(i64, i64)>, tags: Vec<i64>) -> RecipeDraft {
        RecipeDraft {
            ingredients: ingredients
                .into_iter()
                .map(|(id, amount)| IngredientAmount { id, amount })
                .collect(),
            tags,
            image: Some(IMAGE.to_string()),
            name: "Pancakes".to_string(),
            text: "Whisk and fry".to_string(),
            cooking_time: 20,
        }
    }

    fn patch(ingredients: Vec<(i64, i64)>, tags: Vec<i64>) -> RecipePatch {
        RecipePatch {
            ingredients: ingredients
                .into_iter()
                .map(|(id, amount)| IngredientAmount { id, amount })
                .collect(),
            tags,
            image: None,
            name: None,
            text: None,
            cooking_time: None,
        }
    }

    fn assert_validation<T: std::fmt::Debug>(result: Result<T, RecipeServiceError>) {
        assert!(
            matches!(result, Err(RecipeServiceError::ValidationError(_))),
            "expected validation error, got {:?}",
            result
        );
    }

    #[test]
    fn test_validate_draft_rules() {
        let limits = RecipeConfig::default();
        assert!(validate_draft(&draft(vec![(1, 5)], vec![1]), &limits).is_ok());

        assert_validation(validate_draft(&draft(vec![], vec![1]), &limits));
        assert_validation(validate_draft(&draft(vec![(1, 5), (1, 7)], vec![1]), &limits));
        assert_validation(validate_draft(&draft(vec![(1, 0)], vec![1]), &limits));
        assert_validation(validate_draft(&draft(vec![(1, -3)], vec![1]), &limits));
        assert_validation(validate_draft(&draft(vec![(1, 32_001)], vec![1]), &limits));
        assert_validation(validate_draft(&draft(vec![(1, 5)], vec![]), &limits));
        assert_validation(validate_draft(&draft(vec![(1, 5)], vec![2, 2]), &limits));

        let mut slow = draft(vec![(1, 5)], vec![1]);
        slow.cooking_time = 0;
        assert_validation(validate_draft(&slow, &limits));
        slow.cooking_time = 32_001;
        assert_validation(validate_draft(&slow, &limits));

        let mut unnamed = draft(vec![(1, 5)], vec![1]);
        unnamed.name = "   ".to_string();
        assert_validation(validate_draft(&unnamed, &limits));
        unnamed.name = "n".repeat(201);
        assert_validation(validate_draft(&unnamed, &limits));
        unnamed.name = "n".repeat(200);
        assert!(validate_draft(&unnamed, &limits).is_ok());

        let mut blank = draft(vec![(1, 5)], vec![1]);
        blank.text = String::new();
        assert_validation(validate_draft(&blank, &limits));
    }

    #[test]
    fn test_validate_draft_honours_configured_bounds() {
        let limits = RecipeConfig {
            cooking_time_max: 60,
            amount_max: 10,
            ..RecipeConfig::default()
        };
        let mut long = draft(vec![(1, 5)], vec![1]);
        long.cooking_time = 61;
        assert_validation(validate_draft(&long, &limits));
        assert_validation(validate_draft(&draft(vec![(1, 11)], vec![1]), &limits));
        assert!(validate_draft(&draft(vec![(1, 10)], vec![1]), &limits).is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Drafts with distinct IDs and in-range values are accepted; repeating
        /// any ingredient makes them invalid.
        #[test]
        fn prop_duplicate_ingredients_rejected(
            ids in proptest::collection::hash_set(1i64..1000, 1..8),
            amount in 1i64..=32_000,
            cooking_time in 1i64..=32_000,
            dup_index in any::<proptest::sample::Index>(),
        ) {
            let limits = RecipeConfig::default();
            let ids: Vec<i64> = ids.into_iter().collect();
            let mut candidate = draft(ids.iter().map(|id| (*id, amount)).collect(), vec![1, 2]);
            candidate.cooking_time = cooking_time;
            prop_assert!(validate_draft(&candidate, &limits).is_ok());

            let repeated = ids[dup_index.index(ids.len())];
            candidate.ingredients.push(IngredientAmount { id: repeated, amount });
            prop_assert!(validate_draft(&candidate, &limits).is_err());
        }

        /// Amounts outside the bounds are always rejected.
        #[test]
        fn prop_out_of_range_amount_rejected(
            amount in prop_oneof![i64::MIN..1i64, 32_001i64..i64::MAX],
        ) {
            let limits = RecipeConfig::default();
            prop_assert!(validate_draft(&draft(vec![(1, amount)], vec![1]), &limits).is_err());
        }
    }

    #[tokio::test]
    async fn test_create_recipe_detail() {
        let f = setup().await;

        let detail = f
            .service
            .create_recipe(&f.author, draft(vec![(f.sugar, 50), (f.salt, 5)], vec![f.dinner]))
            .await
            .unwrap();

        assert_eq!(detail.name, "Pancakes");
        assert_eq!(detail.author.username, "author");
        assert!(!detail.author.is_subscribed);
        assert!(!detail.is_favorited);
        assert!(!detail.is_in_shopping_cart);
        assert!(detail.image.starts_with("/media/recipes/images/"));
        assert_eq!(detail.tags.len(), 1);
        assert_eq!(detail.tags[0].slug, "dinner");

        let names: Vec<&str> = detail.ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Salt", "Sugar"]);
        assert_eq!(detail.ingredients[0].amount, 5);
    }

    #[tokio::test]
    async fn test_create_requires_image() {
        let f = setup().await;
        let mut no_image = draft(vec![(f.salt, 5)], vec![f.breakfast]);
        no_image.image = None;
        assert_validation(f.service.create_recipe(&f.author, no_image).await);

        let mut bad_image = draft(vec![(f.salt, 5)], vec![f.breakfast]);
        bad_image.image = Some("data:text/plain;base64,AAEC".to_string());
        assert_validation(f.service.create_recipe(&f.author, bad_image).await);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_references() {
        let f = setup().await;

        assert_validation(
            f.service
                .create_recipe(&f.author, draft(vec![(999, 5)], vec![f.breakfast]))
                .await,
        );
        assert_validation(
            f.service
                .create_recipe(&f.author, draft(vec![(f.salt, 5)], vec![999]))
                .await,
        );

        let page = f
            .service
            .list_recipes(None, &RecipeFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_update_by_author_keeps_omitted_fields() {
        let f = setup().await;
        let created = f
            .service
            .create_recipe(&f.author, draft(vec![(f.salt, 5)], vec![f.breakfast]))
            .await
            .unwrap();

        let mut changes = patch(vec![(f.sugar, 100)], vec![f.dinner, f.breakfast]);
        changes.cooking_time = Some(45);

        let updated = f
            .service
            .update_recipe(&f.author, created.id, changes)
            .await
            .unwrap();

        assert_eq!(updated.name, "Pancakes");
        assert_eq!(updated.cooking_time, 45);
        assert_eq!(updated.image, created.image);
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.ingredients[0].name, "Sugar");
        assert_eq!(updated.tags.len(), 2);
    }

    #[tokio::test]
    async fn test_update_replaces_image_when_given() {
        let f = setup().await;
        let created = f
            .service
            .create_recipe(&f.author, draft(vec![(f.salt, 5)], vec![f.breakfast]))
            .await
            .unwrap();

        let mut changes = patch(vec![(f.salt, 5)], vec![f.breakfast]);
        changes.image = Some(IMAGE.to_string());
        let updated = f
            .service
            .update_recipe(&f.author, created.id, changes)
            .await
            .unwrap();

        assert_ne!(updated.image, created.image);
    }

    #[tokio::test]
    async fn test_rejected_update_keeps_previous_ingredients() {
        let f = setup().await;
        let created = f
            .service
            .create_recipe(&f.author, draft(vec![(f.salt, 5)], vec![f.breakfast]))
            .await
            .unwrap();

        assert_validation(
            f.service
                .update_recipe(&f.author, created.id, patch(vec![], vec![f.breakfast]))
                .await,
        );
        assert_validation(
            f.service
                .update_recipe(&f.author, created.id, patch(vec![(f.salt, 1), (f.salt, 2)], vec![f.breakfast]))
                .await,
        );

        let reloaded = f.service.get_recipe(None, created.id).await.unwrap();
        assert_eq!(reloaded.ingredients, created.ingredients);
    }

    fn stored_images(media: &TempDir) -> usize {
        std::fs::read_dir(media.path().join(crate::services::image::RECIPE_IMAGE_DIR))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_failed_create_removes_image() {
        let f = setup().await;
        f.pool
            .execute(
                "CREATE TRIGGER reject_recipes BEFORE INSERT ON recipes \
                 BEGIN SELECT RAISE(ABORT, 'recipes are read-only'); END",
            )
            .await
            .unwrap();

        let result = f
            .service
            .create_recipe(&f.author, draft(vec![(f.salt, 5)], vec![f.breakfast]))
            .await;

        assert!(matches!(result, Err(RecipeServiceError::InternalError(_))));
        assert_eq!(stored_images(&f.media), 0);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_recipe_and_removes_new_image() {
        let f = setup().await;
        let created = f
            .service
            .create_recipe(&f.author, draft(vec![(f.salt, 5)], vec![f.breakfast]))
            .await
            .unwrap();
        assert_eq!(stored_images(&f.media), 1);

        f.pool
            .execute(
                "CREATE TRIGGER reject_recipe_tags BEFORE INSERT ON recipe_tags \
                 BEGIN SELECT RAISE(ABORT, 'tags are read-only'); END",
            )
            .await
            .unwrap();

        let mut changes = patch(vec![(f.sugar, 100)], vec![f.dinner]);
        changes.image = Some(IMAGE.to_string());
        changes.name = Some("Renamed".to_string());
        let result = f.service.update_recipe(&f.author, created.id, changes).await;

        assert!(matches!(result, Err(RecipeServiceError::InternalError(_))));
        assert_eq!(stored_images(&f.media), 1);

        let reloaded = f.service.get_recipe(None, created.id).await.unwrap();
        assert_eq!(reloaded.name, "Pancakes");
        assert_eq!(reloaded.image, created.image);
        assert_eq!(reloaded.ingredients, created.ingredients);
        assert_eq!(reloaded.tags, created.tags);
    }

    #[tokio::test]
    async fn test_update_and_delete_require_author() {
        let f = setup().await;
        let created = f
            .service
            .create_recipe(&f.author, draft(vec![(f.salt, 5)], vec![f.breakfast]))
            .await
            .unwrap();

        assert!(matches!(
            f.service
                .update_recipe(&f.other, created.id, patch(vec![(f.salt, 5)], vec![f.breakfast]))
                .await,
            Err(RecipeServiceError::Forbidden)
        ));
        assert!(matches!(
            f.service.delete_recipe(&f.other, created.id).await,
            Err(RecipeServiceError::Forbidden)
        ));
        assert!(matches!(
            f.service.delete_recipe(&f.author, 999).await,
            Err(RecipeServiceError::NotFound)
        ));

        f.service.delete_recipe(&f.author, created.id).await.unwrap();
        assert!(matches!(
            f.service.get_recipe(None, created.id).await,
            Err(RecipeServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_detail_flags_follow_viewer() {
        let f = setup().await;
        let created = f
            .service
            .create_recipe(&f.author, draft(vec![(f.salt, 5)], vec![f.breakfast]))
            .await
            .unwrap();

        let relations = SqlxRecipeRelationRepository::new(f.pool.clone());
        relations
            .add(RecipeListKind::Favorite, f.other.id, created.id)
            .await
            .unwrap();
        SqlxSubscriptionRepository::new(f.pool.clone())
            .add(f.other.id, f.author.id)
            .await
            .unwrap();

        let seen_by_other = f.service.get_recipe(Some(&f.other), created.id).await.unwrap();
        assert!(seen_by_other.is_favorited);
        assert!(!seen_by_other.is_in_shopping_cart);
        assert!(seen_by_other.author.is_subscribed);

        let anonymous = f.service.get_recipe(None, created.id).await.unwrap();
        assert!(!anonymous.is_favorited);
        assert!(!anonymous.author.is_subscribed);
    }

    #[tokio::test]
    async fn test_list_recipes_with_filters() {
        let f = setup().await;
        let first = f
            .service
            .create_recipe(&f.author, draft(vec![(f.salt, 5)], vec![f.breakfast]))
            .await
            .unwrap();
        let second = f
            .service
            .create_recipe(&f.other, draft(vec![(f.sugar, 5)], vec![f.dinner]))
            .await
            .unwrap();

        let all = f
            .service
            .list_recipes(None, &RecipeFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].id, second.id);
        assert_eq!(all.items[1].id, first.id);

        let by_tag = RecipeFilter {
            tags: vec!["breakfast".to_string()],
            ..RecipeFilter::default()
        };
        let page = f
            .service
            .list_recipes(None, &by_tag, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, first.id);

        SqlxRecipeRelationRepository::new(f.pool.clone())
            .add(RecipeListKind::ShoppingCart, f.author.id, second.id)
            .await
            .unwrap();
        let in_cart = RecipeFilter {
            is_in_shopping_cart: true,
            ..RecipeFilter::default()
        };
        let page = f
            .service
            .list_recipes(Some(&f.author), &in_cart, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items[0].is_in_shopping_cart);

        // Ignored for anonymous viewers.
        let page = f
            .service
            .list_recipes(None, &in_cart, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }
}
