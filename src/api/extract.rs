//! Request extractors that reject with [`ApiError`] bodies instead of axum's
//! plain-text defaults.

use axum::{
    extract::{FromRequest, FromRequestParts, OriginalUri, Path, Query, Request},
    http::{request::Parts, StatusCode, Uri},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};

use super::error::{request_path, ApiError};
use crate::models::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub const USER_ID_HEADER: &str = "X-User-ID";

fn original_uri<'a>(extensions: &'a axum::http::Extensions, fallback: &'a Uri) -> &'a Uri {
    extensions
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri)
        .unwrap_or(fallback)
}

fn parts_path(parts: &Parts) -> String {
    request_path(original_uri(&parts.extensions, &parts.uri))
}

/// The caller's identity, a positive integer from the `X-User-ID` header.
///
/// The header is trusted as already authenticated upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts
            .headers
            .get(USER_ID_HEADER)
            .filter(|value| !value.is_empty())
        else {
            tracing::warn!("Missing {} header", USER_ID_HEADER);
            return Err(ApiError::identity(
                StatusCode::UNAUTHORIZED,
                "X-User-ID header is required",
                parts_path(parts),
            ));
        };

        // A header that is present but does not parse is 400, never 401.
        match value.to_str().ok().and_then(|s| s.trim().parse::<i64>().ok()) {
            Some(id) if id > 0 => Ok(CallerId(id)),
            _ => {
                tracing::warn!("Invalid {} header: {:?}", USER_ID_HEADER, value);
                Err(ApiError::identity(
                    StatusCode::BAD_REQUEST,
                    "Invalid user ID format",
                    parts_path(parts),
                ))
            }
        }
    }
}

/// A positive feature id taken from the `{id}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for FeatureId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i64>::from_request_parts(parts, state).await {
            Ok(Path(id)) if id > 0 => Ok(FeatureId(id)),
            Ok(Path(_)) => Err(ApiError::validation(
                vec!["path -> feature_id: must be a positive integer".to_string()],
                parts_path(parts),
            )),
            Err(rejection) => Err(ApiError::validation(
                vec![format!("path -> feature_id: {}", rejection.body_text())],
                parts_path(parts),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPageQuery {
    page: Option<i64>,
    page_size: Option<i64>,
}

/// `?page=&page_size=` with range checks. Out-of-range values are rejected
/// here rather than clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub page_size: u32,
}

impl<S: Send + Sync> FromRequestParts<S> for PageQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(raw) = Query::<RawPageQuery>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::validation(
                    vec![format!("query: {}", rejection.body_text())],
                    parts_path(parts),
                )
            })?;

        let mut errors = Vec::new();

        let page = match raw.page {
            None => 1,
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or_else(|_| {
                errors.push(format!("query -> page: must be at most {}", u32::MAX));
                1
            }),
            Some(_) => {
                errors.push("query -> page: must be greater than or equal to 1".to_string());
                1
            }
        };

        let page_size = match raw.page_size {
            None => DEFAULT_PAGE_SIZE,
            Some(s) if (1..=i64::from(MAX_PAGE_SIZE)).contains(&s) => s as u32,
            Some(_) => {
                errors.push(format!(
                    "query -> page_size: must be between 1 and {}",
                    MAX_PAGE_SIZE
                ));
                DEFAULT_PAGE_SIZE
            }
        };

        if errors.is_empty() {
            Ok(PageQuery { page, page_size })
        } else {
            Err(ApiError::validation(errors, parts_path(parts)))
        }
    }
}

/// JSON body whose parse failures become 422 validation errors.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let path = request_path(original_uri(req.extensions(), req.uri()));

        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(ApiError::validation(
                vec![format!("body: {}", rejection.body_text())],
                path,
            )),
        }
    }
}
