//! Subscription model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ShortRecipe, UserCard};

/// A user following an author. `user_id != author_id` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Author card shown in the subscriptions list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionCard {
    #[serde(flatten)]
    pub author: UserCard,
    /// The author's newest recipes, truncated to `recipes_limit` when given
    pub recipes: Vec<ShortRecipe>,
    /// Total number of recipes by the author
    pub recipes_count: i64,
}
