//! Shopping list export
//!
//! Sums the ingredient rows of every recipe in a user's cart, grouped by
//! (name, measurement unit), and renders one `name - total unit` line per
//! group.

use crate::db::repositories::RecipeRelationRepository;
use crate::models::{CartIngredientRow, ShoppingListItem, User};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// File name offered for the downloaded list
pub const SHOPPING_LIST_FILENAME: &str = "Shopping_cart.txt";

/// Group rows by (name, unit) and sum their amounts.
///
/// Output is sorted by name ignoring case, then unit.
pub fn aggregate(rows: impl IntoIterator<Item = CartIngredientRow>) -> Vec<ShoppingListItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_insert(0) += row.amount;
    }

    let mut items: Vec<ShoppingListItem> = totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingListItem {
            name,
            measurement_unit,
            total,
        })
        .collect();
    // Stable sort keeps the map's byte order among case-insensitive ties.
    items.sort_by_cached_key(|item| item.name.to_lowercase());
    items
}

/// Render items as newline-terminated text lines
pub fn render(items: &[ShoppingListItem]) -> String {
    let mut out = String::new();
    for item in items {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{} - {} {}", item.name, item.total, item.measurement_unit);
    }
    out
}

/// Builds a user's shopping list from their cart
pub struct ShoppingListService {
    relation_repo: Arc<dyn RecipeRelationRepository>,
}

impl ShoppingListService {
    pub fn new(relation_repo: Arc<dyn RecipeRelationRepository>) -> Self {
        Self { relation_repo }
    }

    /// Aggregated list items for the user's cart
    pub async fn items(&self, user: &User) -> Result<Vec<ShoppingListItem>> {
        let rows = self
            .relation_repo
            .cart_ingredient_rows(user.id)
            .await
            .context("Failed to load shopping cart")?;
        Ok(aggregate(rows))
    }

    /// Rendered text for the user's cart. An empty cart gives an empty string.
    pub async fn build_shopping_list(&self, user: &User) -> Result<String> {
        let items = self.items(user).await?;
        tracing::debug!(user_id = user.id, lines = items.len(), "Shopping list built");
        Ok(render(&items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxRecipeRelationRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::RecipeListKind;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn row(name: &str, unit: &str, amount: i64) -> CartIngredientRow {
        CartIngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn test_aggregate_sums_matching_rows() {
        let items = aggregate(vec![row("Salt", "g", 5), row("Salt", "g", 10)]);
        assert_eq!(render(&items), "Salt - 15 g\n");
    }

    #[test]
    fn test_aggregate_keeps_units_apart_and_sorts() {
        let items = aggregate(vec![
            row("Sugar", "g", 100),
            row("Milk", "ml", 200),
            row("Salt", "pinch", 1),
            row("Salt", "g", 5),
            row("Milk", "ml", 50),
        ]);

        assert_eq!(
            render(&items),
            "Milk - 250 ml\nSalt - 5 g\nSalt - 1 pinch\nSugar - 100 g\n"
        );
    }

    #[test]
    fn test_aggregate_sorts_ignoring_case() {
        let items = aggregate(vec![
            row("banana", "pcs", 2),
            row("Apple", "pcs", 1),
            row("яблоко", "g", 300),
            row("Банан", "g", 100),
            row("apple", "pcs", 4),
        ]);

        assert_eq!(
            render(&items),
            "Apple - 1 pcs\napple - 4 pcs\nbanana - 2 pcs\nБанан - 100 g\nяблоко - 300 g\n"
        );
    }

    #[test]
    fn test_empty_cart_renders_empty() {
        assert_eq!(render(&aggregate(Vec::new())), "");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Every total equals the sum of the matching rows, and each
        /// (name, unit) pair appears exactly once in sorted order.
        #[test]
        fn prop_totals_match_row_sums(
            rows in proptest::collection::vec(
                ("[a-c]{1,2}", prop_oneof![Just("g"), Just("ml")], 1i64..=32_000),
                0..40,
            ),
        ) {
            let rows: Vec<CartIngredientRow> = rows
                .into_iter()
                .map(|(name, unit, amount)| row(&name, unit, amount))
                .collect();

            let mut expected: HashMap<(String, String), i64> = HashMap::new();
            for r in &rows {
                *expected.entry((r.name.clone(), r.measurement_unit.clone())).or_insert(0) += r.amount;
            }

            let items = aggregate(rows);
            prop_assert_eq!(items.len(), expected.len());
            for item in &items {
                let key = (item.name.clone(), item.measurement_unit.clone());
                prop_assert_eq!(Some(&item.total), expected.get(&key));
            }

            let keys: Vec<(&str, &str)> = items
                .iter()
                .map(|i| (i.name.as_str(), i.measurement_unit.as_str()))
                .collect();
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(keys, sorted);
        }
    }

    #[tokio::test]
    async fn test_build_shopping_list_from_cart() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let sqlite = pool.sqlite().unwrap();
        for statement in [
            "INSERT INTO users (email, username, first_name, last_name, password_hash) VALUES ('a@x.io', 'a', 'A', 'A', 'h')",
            "INSERT INTO ingredients (name, measurement_unit) VALUES ('Salt', 'g')",
            "INSERT INTO ingredients (name, measurement_unit) VALUES ('Flour', 'g')",
            "INSERT INTO recipes (author_id, name, text, cooking_time) VALUES (1, 'Bread', 'T', 60)",
            "INSERT INTO recipes (author_id, name, text, cooking_time) VALUES (1, 'Soup', 'T', 30)",
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (1, 1, 5)",
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (1, 2, 500)",
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (2, 1, 10)",
        ] {
            sqlx::query(statement).execute(sqlite).await.unwrap();
        }

        let relations = SqlxRecipeRelationRepository::boxed(pool.clone());
        let service = ShoppingListService::new(relations.clone());

        let user = User {
            id: 1,
            email: "a@x.io".to_string(),
            username: "a".to_string(),
            first_name: "A".to_string(),
            last_name: "A".to_string(),
            password_hash: "h".to_string(),
            created_at: chrono::Utc::now(),
        };

        assert_eq!(service.build_shopping_list(&user).await.unwrap(), "");

        relations.add(RecipeListKind::ShoppingCart, 1, 1).await.unwrap();
        relations.add(RecipeListKind::ShoppingCart, 1, 2).await.unwrap();

        assert_eq!(
            service.build_shopping_list(&user).await.unwrap(),
            "Flour - 500 g\nSalt - 15 g\n"
        );
    }
}
