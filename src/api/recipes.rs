//! Recipe API endpoints
//!
//! Handles HTTP requests for recipes:
//! - GET /api/recipes/ - List recipes (filters: author, tags, is_favorited, is_in_shopping_cart)
//! - POST /api/recipes/ - Create recipe
//! - GET/PATCH/DELETE /api/recipes/{id}/ - Read, update or delete a recipe
//! - POST/DELETE /api/recipes/{id}/favorite/ - Favorites
//! - POST/DELETE /api/recipes/{id}/shopping_cart/ - Shopping cart
//! - GET /api/recipes/download_shopping_cart/ - Shopping list as text

use axum::{
    extract::{OriginalUri, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{deserialize_flag, repeated, IdPath, JsonBody, Page, QueryParams};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{
    ListParams, RecipeDetail, RecipeDraft, RecipeFilter, RecipeListKind, RecipePatch, ShortRecipe,
    User,
};
use crate::services::SHOPPING_LIST_FILENAME;

/// Routes open to anonymous users
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/recipes/", get(list_recipes))
        .route("/recipes/{id}/", get(get_recipe))
}

/// Routes that need a valid token
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/recipes/", post(create_recipe))
        .route("/recipes/{id}/", patch(update_recipe).delete(delete_recipe))
        .route("/recipes/{id}/favorite/", post(add_favorite).delete(remove_favorite))
        .route(
            "/recipes/{id}/shopping_cart/",
            post(add_to_cart).delete(remove_from_cart),
        )
        .route("/recipes/download_shopping_cart/", get(download_shopping_cart))
}

/// Query parameters for the recipe list. `tags` repeats, so it is read
/// from the raw pairs instead.
#[derive(Debug, Default, Deserialize)]
pub struct ListRecipesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Only recipes by this author
    pub author: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_favorited: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_in_shopping_cart: bool,
}

/// Build the list filter from the typed query and the repeated `tags` keys
fn recipe_filter(query: &ListRecipesQuery, pairs: &[(String, String)]) -> RecipeFilter {
    RecipeFilter {
        author: query.author,
        tags: repeated(pairs, "tags")
            .into_iter()
            .filter(|slug| !slug.is_empty())
            .collect(),
        is_favorited: query.is_favorited,
        is_in_shopping_cart: query.is_in_shopping_cart,
    }
}

/// GET /api/recipes/ - Newest recipes first
async fn list_recipes(
    State(state): State<AppState>,
    viewer: MaybeUser,
    OriginalUri(uri): OriginalUri,
    QueryParams(query): QueryParams<ListRecipesQuery>,
    QueryParams(pairs): QueryParams<Vec<(String, String)>>,
) -> Result<Json<Page<RecipeDetail>>, ApiError> {
    let filter = recipe_filter(&query, &pairs);
    let params = ListParams::new(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(state.config.recipes.page_size),
    );

    let result = state
        .recipe_service
        .list_recipes(viewer.user(), &filter, &params)
        .await?;
    Ok(Json(Page::from_result(result, &uri)))
}

/// POST /api/recipes/ - Create a recipe
async fn create_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonBody(draft): JsonBody<RecipeDraft>,
) -> Result<(StatusCode, Json<RecipeDetail>), ApiError> {
    let recipe = state.recipe_service.create_recipe(&user, draft).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// GET /api/recipes/{id}/
async fn get_recipe(
    State(state): State<AppState>,
    viewer: MaybeUser,
    IdPath(id): IdPath,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = state.recipe_service.get_recipe(viewer.user(), id).await?;
    Ok(Json(recipe))
}

/// PATCH /api/recipes/{id}/ - Author only
async fn update_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(id): IdPath,
    JsonBody(patch): JsonBody<RecipePatch>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = state.recipe_service.update_recipe(&user, id, patch).await?;
    Ok(Json(recipe))
}

/// DELETE /api/recipes/{id}/ - Author only
async fn delete_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    state.recipe_service.delete_recipe(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_list(
    state: &AppState,
    kind: RecipeListKind,
    user: &User,
    recipe_id: i64,
) -> Result<(StatusCode, Json<ShortRecipe>), ApiError> {
    let short = state.relation_service.add(kind, user, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(short)))
}

async fn remove_from_list(
    state: &AppState,
    kind: RecipeListKind,
    user: &User,
    recipe_id: i64,
) -> Result<StatusCode, ApiError> {
    state.relation_service.remove(kind, user, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipes/{id}/favorite/
async fn add_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(id): IdPath,
) -> Result<(StatusCode, Json<ShortRecipe>), ApiError> {
    add_to_list(&state, RecipeListKind::Favorite, &user, id).await
}

/// DELETE /api/recipes/{id}/favorite/
async fn remove_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    remove_from_list(&state, RecipeListKind::Favorite, &user, id).await
}

/// POST /api/recipes/{id}/shopping_cart/
async fn add_to_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(id): IdPath,
) -> Result<(StatusCode, Json<ShortRecipe>), ApiError> {
    add_to_list(&state, RecipeListKind::ShoppingCart, &user, id).await
}

/// DELETE /api/recipes/{id}/shopping_cart/
async fn remove_from_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    remove_from_list(&state, RecipeListKind::ShoppingCart, &user, id).await
}

/// GET /api/recipes/download_shopping_cart/ - Plain text attachment
async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Response, ApiError> {
    let body = state.shopping_list_service.build_shopping_list(&user).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", SHOPPING_LIST_FILENAME),
            ),
        ],
        body,
    )
        .into_response())
}
