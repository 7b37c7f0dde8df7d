//! User-to-recipe relation lists

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which per-user recipe list a relation belongs to.
///
/// Favorites and the shopping cart share the same (user, recipe) shape and
/// uniqueness rule; only the backing table and messages differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeListKind {
    Favorite,
    ShoppingCart,
}

impl RecipeListKind {
    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            RecipeListKind::Favorite => "favorites",
            RecipeListKind::ShoppingCart => "shopping_carts",
        }
    }

    /// Human readable list name used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            RecipeListKind::Favorite => "favorites",
            RecipeListKind::ShoppingCart => "shopping cart",
        }
    }
}

impl fmt::Display for RecipeListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_distinct() {
        assert_eq!(RecipeListKind::Favorite.table(), "favorites");
        assert_eq!(RecipeListKind::ShoppingCart.table(), "shopping_carts");
    }

    #[test]
    fn test_display() {
        assert_eq!(RecipeListKind::ShoppingCart.to_string(), "shopping cart");
    }
}
