//! Ingredient API endpoints
//!
//! - GET /api/ingredients/?name=<prefix> - Search the catalog (not paginated)
//! - GET /api/ingredients/{id}/ - One ingredient

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{IdPath, QueryParams};
use crate::api::middleware::{ApiError, AppState};
use crate::models::Ingredient;

/// Query parameters for the ingredient search
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Case-insensitive name prefix
    #[serde(default)]
    pub name: Option<String>,
}

/// Build the ingredients router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingredients/", get(search_ingredients))
        .route("/ingredients/{id}/", get(get_ingredient))
}

/// GET /api/ingredients/
async fn search_ingredients(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SearchQuery>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let found = state
        .catalog_service
        .search_ingredients(query.name.as_deref())
        .await?;
    Ok(Json(found))
}

/// GET /api/ingredients/{id}/
async fn get_ingredient(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<Ingredient>, ApiError> {
    Ok(Json(state.catalog_service.get_ingredient(id).await?))
}
