//! Tag model
//!
//! Tags are static reference data attached to recipes (breakfast, lunch, ...).
//! The slug is what clients filter recipe lists by.

use serde::{Deserialize, Serialize};

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Hex color such as `#E26C2D`
    pub color: String,
    /// URL-friendly slug
    pub slug: String,
}

/// Input for importing a tag into the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTagInput {
    pub name: String,
    pub color: String,
    pub slug: String,
}
