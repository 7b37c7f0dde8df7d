//! Catalog service
//!
//! Read access to the tag and ingredient reference data, plus the bulk import
//! used by the `load-catalog` binary.

use crate::db::repositories::{IngredientRepository, TagRepository};
use crate::models::{CreateIngredientInput, CreateTagInput, Ingredient, Tag};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern is valid"));

static COLOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("color pattern is valid"));

/// Error types for catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Tag not found")]
    TagNotFound,

    #[error("Ingredient not found")]
    IngredientNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Tag and ingredient catalog
pub struct CatalogService {
    tag_repo: Arc<dyn TagRepository>,
    ingredient_repo: Arc<dyn IngredientRepository>,
}

impl CatalogService {
    pub fn new(
        tag_repo: Arc<dyn TagRepository>,
        ingredient_repo: Arc<dyn IngredientRepository>,
    ) -> Self {
        Self {
            tag_repo,
            ingredient_repo,
        }
    }

    /// All tags ordered by name
    pub async fn list_tags(&self) -> Result<Vec<Tag>, CatalogServiceError> {
        Ok(self.tag_repo.list().await.context("Failed to list tags")?)
    }

    pub async fn get_tag(&self, id: i64) -> Result<Tag, CatalogServiceError> {
        self.tag_repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or(CatalogServiceError::TagNotFound)
    }

    /// Case-insensitive name prefix search. A blank prefix lists everything.
    pub async fn search_ingredients(
        &self,
        name_prefix: Option<&str>,
    ) -> Result<Vec<Ingredient>, CatalogServiceError> {
        let prefix = name_prefix.map(str::trim).filter(|p| !p.is_empty());
        Ok(self
            .ingredient_repo
            .search(prefix)
            .await
            .context("Failed to search ingredients")?)
    }

    pub async fn get_ingredient(&self, id: i64) -> Result<Ingredient, CatalogServiceError> {
        self.ingredient_repo
            .get_by_id(id)
            .await
            .context("Failed to get ingredient")?
            .ok_or(CatalogServiceError::IngredientNotFound)
    }

    /// Load ingredients, skipping (name, unit) pairs already in the catalog
    pub async fn import_ingredients(
        &self,
        items: &[CreateIngredientInput],
    ) -> Result<ImportSummary, CatalogServiceError> {
        for item in items {
            if item.name.trim().is_empty() || item.measurement_unit.trim().is_empty() {
                return Err(CatalogServiceError::ValidationError(format!(
                    "Ingredient {:?} needs a name and a measurement unit",
                    item.name
                )));
            }
        }

        let mut summary = ImportSummary::default();
        for item in items {
            let inserted = self
                .ingredient_repo
                .insert_if_absent(item)
                .await
                .with_context(|| format!("Failed to import ingredient '{}'", item.name))?;
            match inserted {
                Some(_) => summary.inserted += 1,
                None => summary.skipped += 1,
            }
        }

        tracing::info!(
            inserted = summary.inserted,
            skipped = summary.skipped,
            "Ingredients imported"
        );
        Ok(summary)
    }

    /// Load tags, skipping names or slugs already in the catalog
    pub async fn import_tags(
        &self,
        items: &[CreateTagInput],
    ) -> Result<ImportSummary, CatalogServiceError> {
        for item in items {
            validate_tag(item)?;
        }

        let mut summary = ImportSummary::default();
        for item in items {
            let inserted = self
                .tag_repo
                .insert_if_absent(item)
                .await
                .with_context(|| format!("Failed to import tag '{}'", item.slug))?;
            match inserted {
                Some(_) => summary.inserted += 1,
                None => summary.skipped += 1,
            }
        }

        tracing::info!(
            inserted = summary.inserted,
            skipped = summary.skipped,
            "Tags imported"
        );
        Ok(summary)
    }
}

fn validate_tag(tag: &CreateTagInput) -> Result<(), CatalogServiceError> {
    if tag.name.trim().is_empty() {
        return Err(CatalogServiceError::ValidationError(
            "Tag name cannot be empty".to_string(),
        ));
    }
    if !SLUG_PATTERN.is_match(&tag.slug) {
        return Err(CatalogServiceError::ValidationError(format!(
            "Invalid tag slug '{}'",
            tag.slug
        )));
    }
    if !COLOR_PATTERN.is_match(&tag.color) {
        return Err(CatalogServiceError::ValidationError(format!(
            "Invalid tag color '{}'",
            tag.color
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxIngredientRepository, SqlxTagRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> CatalogService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        CatalogService::new(
            SqlxTagRepository::boxed(pool.clone()),
            SqlxIngredientRepository::boxed(pool),
        )
    }

    fn tag(name: &str, slug: &str) -> CreateTagInput {
        CreateTagInput {
            name: name.to_string(),
            color: "#E26C2D".to_string(),
            slug: slug.to_string(),
        }
    }

    fn ingredient(name: &str, unit: &str) -> CreateIngredientInput {
        CreateIngredientInput {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        }
    }

    #[tokio::test]
    async fn test_import_tags_skips_existing() {
        let service = setup_test_service().await;

        let first = service
            .import_tags(&[tag("Breakfast", "breakfast"), tag("Lunch", "lunch")])
            .await
            .unwrap();
        assert_eq!(first, ImportSummary { inserted: 2, skipped: 0 });

        let second = service
            .import_tags(&[tag("Lunch", "lunch"), tag("Dinner", "dinner")])
            .await
            .unwrap();
        assert_eq!(second, ImportSummary { inserted: 1, skipped: 1 });

        let names: Vec<String> = service
            .list_tags()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Breakfast", "Dinner", "Lunch"]);
    }

    #[tokio::test]
    async fn test_import_tags_rejects_bad_slug() {
        let service = setup_test_service().await;

        let result = service.import_tags(&[tag("Ok", "ok"), tag("Bad", "bad slug!")]).await;
        assert!(matches!(result, Err(CatalogServiceError::ValidationError(_))));
        // Validation runs before anything is written.
        assert!(service.list_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_tags_rejects_bad_color() {
        let service = setup_test_service().await;
        let mut bad = tag("Lunch", "lunch");
        bad.color = "green".to_string();
        assert!(matches!(
            service.import_tags(&[bad]).await,
            Err(CatalogServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_get_tag() {
        let service = setup_test_service().await;
        service.import_tags(&[tag("Lunch", "lunch")]).await.unwrap();
        let id = service.list_tags().await.unwrap()[0].id;

        assert_eq!(service.get_tag(id).await.unwrap().slug, "lunch");
        assert!(matches!(
            service.get_tag(id + 100).await,
            Err(CatalogServiceError::TagNotFound)
        ));
    }

    #[tokio::test]
    async fn test_ingredient_import_and_search() {
        let service = setup_test_service().await;

        let summary = service
            .import_ingredients(&[
                ingredient("Salt", "g"),
                ingredient("Sugar", "g"),
                ingredient("Milk", "ml"),
                ingredient("Salt", "g"),
                ingredient("Salt", "pinch"),
            ])
            .await
            .unwrap();
        assert_eq!(summary, ImportSummary { inserted: 4, skipped: 1 });

        let found = service.search_ingredients(Some("s")).await.unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|i| i.name.starts_with('S')));

        assert_eq!(service.search_ingredients(Some("  ")).await.unwrap().len(), 4);
        assert_eq!(service.search_ingredients(None).await.unwrap().len(), 4);

        let milk = &service.search_ingredients(Some("MI")).await.unwrap()[0];
        assert_eq!(service.get_ingredient(milk.id).await.unwrap().measurement_unit, "ml");
        assert!(matches!(
            service.get_ingredient(999).await,
            Err(CatalogServiceError::IngredientNotFound)
        ));
    }

    #[tokio::test]
    async fn test_import_ingredient_requires_unit() {
        let service = setup_test_service().await;
        assert!(matches!(
            service.import_ingredients(&[ingredient("Salt", "")]).await,
            Err(CatalogServiceError::ValidationError(_))
        ));
    }
}
