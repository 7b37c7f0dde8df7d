//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for a specific entity.

pub mod ingredient;
pub mod recipe;
pub mod relation;
pub mod subscription;
pub mod tag;
pub mod token;
pub mod user;

pub use ingredient::{IngredientRepository, SqlxIngredientRepository};
pub use recipe::{RecipeRepository, SqlxRecipeRepository};
pub use relation::{RecipeRelationRepository, SqlxRecipeRelationRepository};
pub use subscription::{SqlxSubscriptionRepository, SubscriptionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use token::{SqlxTokenRepository, TokenRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Check whether a repository error was caused by a UNIQUE constraint.
///
/// Relation inserts rely on the store's unique keys, so a duplicate shows up
/// here rather than as an application-level check.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Positional bind value for queries assembled at runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BindValue {
    Int(i64),
    Text(String),
}

/// Placeholder list `?, ?, ?` for an IN clause
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
