//! Data models
//!
//! This module contains the data structures used throughout the Foodgram backend:
//! - Database entities (User, AuthToken, Tag, Ingredient, Recipe, Subscription)
//! - Service inputs (drafts, patches, filters)
//! - API representations (user cards, recipe views, subscription cards)

mod ingredient;
mod pagination;
mod recipe;
mod relation;
mod shopping_list;
mod subscription;
mod tag;
mod token;
mod user;

pub use ingredient::{CreateIngredientInput, Ingredient, IngredientAmount, RecipeIngredient};
pub use pagination::{ListParams, PagedResult};
pub use recipe::{
    NewRecipe, Recipe, RecipeDetail, RecipeDraft, RecipeFilter, RecipePatch, ShortRecipe,
};
pub use relation::RecipeListKind;
pub use shopping_list::{CartIngredientRow, ShoppingListItem};
pub use subscription::{Subscription, SubscriptionCard};
pub use tag::{CreateTagInput, Tag};
pub use token::AuthToken;
pub use user::{CreateUserInput, RegisteredUser, User, UserCard};
