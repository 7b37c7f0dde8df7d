//! Ingredient model

use serde::{Deserialize, Serialize};

/// Catalog ingredient, unique on (name, measurement_unit)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// Input for importing an ingredient into the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateIngredientInput {
    pub name: String,
    pub measurement_unit: String,
}

/// An (ingredient id, amount) pair as submitted by a recipe author
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    /// Catalog ingredient ID
    pub id: i64,
    pub amount: i64,
}

/// Ingredient row of a stored recipe, joined with the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeIngredient {
    /// Catalog ingredient ID
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}
