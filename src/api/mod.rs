//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints of the Foodgram backend,
//! mounted under `/api`:
//! - User and subscription endpoints
//! - Tag and ingredient catalog endpoints
//! - Recipe, favorite and shopping cart endpoints
//!
//! Uploaded recipe images are served read-only under the media URL.

pub mod common;
pub mod ingredients;
pub mod middleware;
pub mod recipes;
pub mod tags;
pub mod users;


use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::repositories::{
    SqlxIngredientRepository, SqlxRecipeRelationRepository, SqlxRecipeRepository,
    SqlxSubscriptionRepository, SqlxTagRepository, SqlxTokenRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    CatalogService, ImageStore, RecipeService, RelationService, ShoppingListService,
    SubscriptionService, UserService,
};

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};

/// Wire repositories and services into the shared state
pub fn build_state(pool: DynDatabasePool, config: Config) -> AppState {
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let token_repo = SqlxTokenRepository::boxed(pool.clone());
    let tag_repo = SqlxTagRepository::boxed(pool.clone());
    let ingredient_repo = SqlxIngredientRepository::boxed(pool.clone());
    let recipe_repo = SqlxRecipeRepository::boxed(pool.clone());
    let relation_repo = SqlxRecipeRelationRepository::boxed(pool.clone());
    let subscription_repo = SqlxSubscriptionRepository::boxed(pool.clone());

    let images = Arc::new(ImageStore::new(config.media.clone()));

    let user_service = Arc::new(UserService::new(
        user_repo.clone(),
        token_repo,
        subscription_repo.clone(),
    ));
    let catalog_service = Arc::new(CatalogService::new(tag_repo.clone(), ingredient_repo.clone()));
    let recipe_service = Arc::new(RecipeService::new(
        recipe_repo.clone(),
        ingredient_repo,
        tag_repo,
        user_repo.clone(),
        relation_repo.clone(),
        subscription_repo.clone(),
        images.clone(),
        config.recipes.clone(),
    ));
    let relation_service = Arc::new(RelationService::new(
        relation_repo.clone(),
        recipe_repo.clone(),
        images.clone(),
    ));
    let subscription_service = Arc::new(SubscriptionService::new(
        subscription_repo,
        user_repo,
        recipe_repo,
        images,
    ));
    let shopping_list_service = Arc::new(ShoppingListService::new(relation_repo));

    AppState {
        config: Arc::new(config),
        user_service,
        catalog_service,
        recipe_service,
        relation_service,
        subscription_service,
        shopping_list_service,
    }
}

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need a valid token)
    let protected_routes = Router::new()
        .merge(users::protected_router())
        .merge(recipes::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes (the viewer is optional)
    Router::new()
        .merge(users::public_router())
        .merge(tags::router())
        .merge(ingredients::router())
        .merge(recipes::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ))
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors_origin = state.config.server.cors_origin.as_str();
    let allow_origin = if cors_origin == "*" {
        AllowOrigin::any()
    } else {
        match cors_origin.parse::<HeaderValue>() {
            Ok(origin) => AllowOrigin::exact(origin),
            Err(_) => {
                tracing::warn!("Invalid CORS origin '{}', allowing any origin", cors_origin);
                AllowOrigin::any()
            }
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let mut router = Router::new().nest("/api", build_api_router(state.clone()));

    let media_prefix = state.config.media.url.trim_end_matches('/');
    if media_prefix.starts_with('/') {
        router = router.nest_service(media_prefix, ServeDir::new(&state.config.media.root));
    } else {
        tracing::warn!(
            "Media URL '{}' is not a local path, media files are not served",
            state.config.media.url
        );
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
