//! API middleware
//!
//! Contains:
//! - Application state shared by handlers
//! - The JSON error type and service error mapping
//! - Token authentication (required and optional)

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::Config;
use crate::models::User;
use crate::services::{
    CatalogService, CatalogServiceError, RecipeService, RecipeServiceError, RelationService,
    RelationServiceError, ShoppingListService, SubscriptionService, SubscriptionServiceError,
    UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub catalog_service: Arc<CatalogService>,
    pub recipe_service: Arc<RecipeService>,
    pub relation_service: Arc<RelationService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub shopping_list_service: Arc<ShoppingListService>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The request's user, if a valid token was sent
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Log the underlying error and hide it from the client
    pub fn internal_error(err: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {:#}", err);
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    /// Validation error whose message is `field: reason`, with the field
    /// split out into details
    fn field_error(message: String) -> Self {
        match message.split_once(": ") {
            Some((field, reason))
                if !field.is_empty() && field.chars().all(|c| c.is_ascii_lowercase() || c == '_') =>
            {
                let mut details = serde_json::Map::new();
                details.insert(field.to_string(), serde_json::json!([reason]));
                Self::with_details(
                    "VALIDATION_ERROR",
                    message.clone(),
                    serde_json::Value::Object(details),
                )
            }
            _ => Self::validation_error(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal_error(err)
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => Self::unauthorized(msg),
            UserServiceError::ValidationError(msg) => Self::field_error(msg),
            UserServiceError::UserExists(msg) => Self::validation_error(msg),
            UserServiceError::NotFound => Self::not_found("User not found"),
            UserServiceError::InternalError(e) => Self::internal_error(e),
        }
    }
}

impl From<CatalogServiceError> for ApiError {
    fn from(err: CatalogServiceError) -> Self {
        match err {
            CatalogServiceError::ValidationError(msg) => Self::validation_error(msg),
            CatalogServiceError::TagNotFound | CatalogServiceError::IngredientNotFound => {
                Self::not_found(err.to_string())
            }
            CatalogServiceError::InternalError(e) => Self::internal_error(e),
        }
    }
}

impl From<RecipeServiceError> for ApiError {
    fn from(err: RecipeServiceError) -> Self {
        match err {
            RecipeServiceError::ValidationError(msg) => Self::field_error(msg),
            RecipeServiceError::NotFound => Self::not_found("Recipe not found"),
            RecipeServiceError::Forbidden => Self::forbidden(err.to_string()),
            RecipeServiceError::InternalError(e) => Self::internal_error(e),
        }
    }
}

impl From<RelationServiceError> for ApiError {
    fn from(err: RelationServiceError) -> Self {
        match err {
            RelationServiceError::AlreadyAdded(_) => Self::validation_error(err.to_string()),
            RelationServiceError::NotInList(_) | RelationServiceError::RecipeNotFound => {
                Self::not_found(err.to_string())
            }
            RelationServiceError::InternalError(e) => Self::internal_error(e),
        }
    }
}

impl From<SubscriptionServiceError> for ApiError {
    fn from(err: SubscriptionServiceError) -> Self {
        match err {
            SubscriptionServiceError::SelfSubscription
            | SubscriptionServiceError::AlreadySubscribed => Self::validation_error(err.to_string()),
            SubscriptionServiceError::NotSubscribed | SubscriptionServiceError::AuthorNotFound => {
                Self::not_found(err.to_string())
            }
            SubscriptionServiceError::InternalError(e) => Self::internal_error(e),
        }
    }
}

/// Extract the API token from the Authorization header.
///
/// Both `Token <key>` and `Bearer <key>` are accepted.
fn extract_token(request: &Request) -> Option<String> {
    let auth_str = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;

    let (scheme, key) = auth_str.trim().split_once(' ')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(key.to_string())
    } else {
        None
    }
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))?;

    let user = state.user_service.authenticate(&token).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
///
/// Anonymous requests and unknown tokens pass through without a user.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(&request) {
        match state.user_service.authenticate(&token).await {
            Ok(user) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Err(UserServiceError::AuthenticationError(_)) => {}
            Err(e) => tracing::warn!("Token lookup failed: {}", e),
        }
    }
    next.run(request).await
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|au| au.0.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(value: &str) -> Request {
        Request::builder()
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_token_schemes() {
        assert_eq!(extract_token(&request_with("Token abc")).as_deref(), Some("abc"));
        assert_eq!(extract_token(&request_with("Bearer abc")).as_deref(), Some("abc"));
        assert_eq!(extract_token(&request_with("token  abc ")).as_deref(), Some("abc"));
        assert_eq!(extract_token(&request_with("Basic abc")), None);
        assert_eq!(extract_token(&request_with("Token ")), None);
        assert_eq!(extract_token(&request_with("abc")), None);

        let anonymous = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_token(&anonymous), None);
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::forbidden("x"), StatusCode::FORBIDDEN),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::validation_error("x"), StatusCode::BAD_REQUEST),
            (ApiError::new("SOMETHING_ELSE", "x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_field_error_details() {
        let err = ApiError::from(RecipeServiceError::ValidationError(
            "cooking_time: Cooking time must be between 1 and 32000 minutes".to_string(),
        ));
        assert_eq!(err.error.code, "VALIDATION_ERROR");
        let details = err.error.details.unwrap();
        assert!(details["cooking_time"].is_array());

        let plain = ApiError::from(RecipeServiceError::ValidationError("Bad input".to_string()));
        assert!(plain.error.details.is_none());
    }

    #[test]
    fn test_relation_errors() {
        use crate::models::RecipeListKind;

        let dup = ApiError::from(RelationServiceError::AlreadyAdded(RecipeListKind::Favorite));
        assert_eq!(dup.error.code, "VALIDATION_ERROR");
        assert_eq!(dup.error.message, "Recipe is already in favorites");

        let missing = ApiError::from(RelationServiceError::NotInList(RecipeListKind::ShoppingCart));
        assert_eq!(missing.error.code, "NOT_FOUND");
    }
}
