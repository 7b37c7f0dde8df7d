//! User API endpoints
//!
//! Handles HTTP requests for users and subscriptions:
//! - GET /api/users/ - List users
//! - POST /api/users/ - Register
//! - GET /api/users/me/ - Current user
//! - GET /api/users/{id}/ - User profile
//! - POST /api/users/set_password/ - Change password
//! - GET /api/users/subscriptions/ - Followed authors
//! - POST/DELETE /api/users/{id}/subscribe/ - Follow or unfollow an author

use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{IdPath, JsonBody, ListQuery, Page, QueryParams};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{CreateUserInput, RegisteredUser, SubscriptionCard, UserCard};

/// Request body for a password change
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: String,
    pub current_password: String,
}

/// Routes open to anonymous users
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users).post(register))
        .route("/users/{id}/", get(get_user))
}

/// Routes that need a valid token
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/users/me/", get(me))
        .route("/users/set_password/", post(set_password))
        .route("/users/subscriptions/", get(list_subscriptions))
        .route("/users/{id}/subscribe/", post(subscribe).delete(unsubscribe))
}

/// GET /api/users/ - Paginated user cards
async fn list_users(
    State(state): State<AppState>,
    viewer: MaybeUser,
    OriginalUri(uri): OriginalUri,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Page<UserCard>>, ApiError> {
    let params = query.list_params(state.config.recipes.page_size);

    let result = state.user_service.list(viewer.user(), &params).await?;
    Ok(Json(Page::from_result(result, &uri)))
}

/// POST /api/users/ - Register a new user
async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateUserInput>,
) -> Result<(StatusCode, Json<RegisteredUser>), ApiError> {
    let user = state.user_service.register(input).await?;
    Ok((StatusCode::CREATED, Json(RegisteredUser::from(&user))))
}

/// GET /api/users/{id}/ - User card
async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeUser,
    IdPath(id): IdPath,
) -> Result<Json<UserCard>, ApiError> {
    let card = state.user_service.get_card(viewer.user(), id).await?;
    Ok(Json(card))
}

/// GET /api/users/me/ - The current user's card
async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<UserCard>, ApiError> {
    let card = state.user_service.card_for(Some(&user), &user).await?;
    Ok(Json(card))
}

/// POST /api/users/set_password/ - Change the current user's password
async fn set_password(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonBody(body): JsonBody<SetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .user_service
        .set_password(&user, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/subscriptions/ - Authors the current user follows
async fn list_subscriptions(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    OriginalUri(uri): OriginalUri,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Page<SubscriptionCard>>, ApiError> {
    let params = query.list_params(state.config.recipes.page_size);

    let result = state
        .subscription_service
        .list_subscriptions(&user, &params, query.recipes_limit)
        .await?;
    Ok(Json(Page::from_result(result, &uri)))
}

/// POST /api/users/{id}/subscribe/ - Follow an author
async fn subscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(author_id): IdPath,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<(StatusCode, Json<SubscriptionCard>), ApiError> {
    let card = state
        .subscription_service
        .subscribe(&user, author_id, query.recipes_limit)
        .await?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// DELETE /api/users/{id}/subscribe/ - Unfollow an author
async fn unsubscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    IdPath(author_id): IdPath,
) -> Result<StatusCode, ApiError> {
    state
        .subscription_service
        .unsubscribe(&user, author_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
