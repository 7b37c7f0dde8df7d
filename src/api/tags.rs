//! Tag API endpoints
//!
//! - GET /api/tags/ - All tags (not paginated)
//! - GET /api/tags/{id}/ - One tag

use axum::{extract::State, routing::get, Json, Router};

use crate::api::common::IdPath;
use crate::api::middleware::{ApiError, AppState};
use crate::models::Tag;

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags/", get(list_tags))
        .route("/tags/{id}/", get(get_tag))
}

/// GET /api/tags/
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.catalog_service.list_tags().await?))
}

/// GET /api/tags/{id}/
async fn get_tag(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.catalog_service.get_tag(id).await?))
}
