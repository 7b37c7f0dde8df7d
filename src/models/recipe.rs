//! Recipe model
//!
//! A recipe is an aggregate: the header row plus its ingredient rows and tag
//! links. This module defines:
//! - `Recipe`: the stored header
//! - `RecipeDraft` / `RecipePatch`: author input for create and update
//! - `NewRecipe`: validated input handed to the repository
//! - `RecipeFilter`: list filters
//! - `RecipeDetail` / `ShortRecipe`: API representations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{IngredientAmount, RecipeIngredient, Tag, UserCard};

/// Stored recipe header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    /// Recipe name (at most 200 characters)
    pub name: String,
    /// Cooking instructions
    pub text: String,
    /// Image path relative to the media root
    pub image: String,
    /// Cooking time in minutes
    pub cooking_time: i64,
    pub created_at: DateTime<Utc>,
}

/// Author input for creating a recipe.
///
/// `image` is a `data:image/<ext>;base64,...` URI. It is optional here so the
/// same shape can carry a merged update; creation requires it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeDraft {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i64>,
    #[serde(default)]
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
}

/// Author input for updating a recipe.
///
/// Ingredients and tags are always replaced; the remaining fields keep their
/// stored value when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipePatch {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub cooking_time: Option<i64>,
}

impl RecipePatch {
    /// Merge the patch over a stored recipe into a full draft
    pub fn merge_into_draft(self, current: &Recipe) -> RecipeDraft {
        RecipeDraft {
            ingredients: self.ingredients,
            tags: self.tags,
            image: self.image,
            name: self.name.unwrap_or_else(|| current.name.clone()),
            text: self.text.unwrap_or_else(|| current.text.clone()),
            cooking_time: self.cooking_time.unwrap_or(current.cooking_time),
        }
    }
}

/// Validated recipe contents ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub author_id: i64,
    pub name: String,
    pub text: String,
    /// Stored image path relative to the media root
    pub image: String,
    pub cooking_time: i64,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i64>,
}

/// Filters for the recipe list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Only recipes by this author
    pub author: Option<i64>,
    /// Only recipes carrying any of these tag slugs
    pub tags: Vec<String>,
    /// Only recipes the viewer has favorited
    pub is_favorited: bool,
    /// Only recipes in the viewer's shopping cart
    pub is_in_shopping_cart: bool,
}

/// Full recipe representation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeDetail {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserCard,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    /// Public image URL
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

/// Compact recipe representation used in relation responses and author cards
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortRecipe {
    pub id: i64,
    pub name: String,
    /// Public image URL
    pub image: String,
    pub cooking_time: i64,
}
