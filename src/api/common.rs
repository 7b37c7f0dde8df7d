//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints:
//! query parameter types, pagination envelopes and extractors that report
//! failures in the API error format.

use axum::{
    extract::{
        rejection::JsonRejection, FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::{request::Parts, Uri},
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::api::middleware::ApiError;
use crate::models::{ListParams, PagedResult};

// ============================================================================
// Query Types
// ============================================================================

/// Pagination and author-card query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Page size; clamped by `ListParams`
    pub limit: Option<u32>,
    /// Recipes shown per author card (subscriptions only)
    pub recipes_limit: Option<i64>,
}

impl ListQuery {
    /// Page parameters, falling back to the configured page size
    pub fn list_params(&self, default_page_size: u32) -> ListParams {
        ListParams::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(default_page_size),
        )
    }
}

/// Boolean query flag: `1` or `true` (any case) turn it on
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false))
}

/// Every value of a possibly repeated query key, in order
pub fn repeated(pairs: &[(String, String)], key: &str) -> Vec<String> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .collect()
}

/// Re-encode query pairs, replacing `key` with `value` (or dropping it when `None`)
fn query_with(pairs: &[(String, String)], key: &str, value: Option<String>) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(pairs.len() + 1);
    let mut replaced = false;
    for (k, v) in pairs {
        if k == key {
            if replaced {
                continue;
            }
            replaced = true;
            if let Some(value) = &value {
                parts.push(encode_pair(k, value));
            }
        } else {
            parts.push(encode_pair(k, v));
        }
    }
    if !replaced {
        if let Some(value) = &value {
            parts.push(encode_pair(key, value));
        }
    }
    parts.join("&")
}

fn encode_pair(key: &str, value: &str) -> String {
    format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
}

// ============================================================================
// Pagination Envelope
// ============================================================================

/// Paginated list response
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap a page, linking neighbours relative to the request URI
    pub fn from_result(result: PagedResult<T>, uri: &Uri) -> Self {
        let pairs = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();
        let link = |page: Option<u32>| {
            let qs = query_with(&pairs, "page", page.map(|p| p.to_string()));
            if qs.is_empty() {
                uri.path().to_string()
            } else {
                format!("{}?{}", uri.path(), qs)
            }
        };

        let next = result.has_next().then(|| link(Some(result.page + 1)));
        let previous = result.has_prev().then(|| {
            // Page 1 is the default, so its link carries no page parameter.
            if result.page == 2 {
                link(None)
            } else {
                link(Some(result.page - 1))
            }
        });

        Self {
            count: result.total,
            next,
            previous,
            results: result.items,
        }
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// Integer path ID; anything else is reported as not found
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found("Not found"))?;
        raw.parse::<i64>()
            .map(IdPath)
            .map_err(|_| ApiError::not_found("Not found"))
    }
}

/// Query string whose rejections use the API error format
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|rejection| ApiError::validation_error(rejection.body_text()))
    }
}

/// JSON body whose rejections use the API error format
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|rejection: JsonRejection| ApiError::validation_error(rejection.body_text()))
    }
}
