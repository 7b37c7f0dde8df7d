//! Services layer - Business logic
//!
//! This module contains the business logic of the Foodgram backend.
//! Services are responsible for:
//! - Implementing business rules (recipe validation, relation toggles)
//! - Coordinating between repositories
//! - Handling validation and error cases

pub mod catalog;
pub mod image;
pub mod password;
pub mod recipe;
pub mod relation;
pub mod shopping_list;
pub mod subscription;
pub mod user;

pub use catalog::{CatalogService, CatalogServiceError, ImportSummary};
pub use image::{ImageError, ImageStore};
pub use password::{hash_password, verify_password};
pub use recipe::{validate_draft, RecipeService, RecipeServiceError};
pub use relation::{RelationService, RelationServiceError};
pub use shopping_list::{ShoppingListService, SHOPPING_LIST_FILENAME};
pub use subscription::{SubscriptionService, SubscriptionServiceError};
pub use user::{UserService, UserServiceError};
