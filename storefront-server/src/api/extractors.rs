//! Custom Axum extractors.
//!
//! Provides:
//! - `AuthUser`: verifies the `Authorization: Bearer` user token.
//! - `ValidQuery<T>` / `ValidJson<T>`: `Query` and `Json` whose rejections
//!   are rendered as `PARAM_VALUE_ILLEGAL` envelopes.
//!
//! Token verification is delegated to [`storefront_sdk::signature`].

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::de::DeserializeOwned;
use storefront_sdk::objects::ResponseCode;
use storefront_sdk::signature::{BEARER_PREFIX, verify_user_token};

use super::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// AuthUser
// ---------------------------------------------------------------------------

/// The id of the logged-in user.
///
/// # Header format
///
/// ```text
/// Authorization: Bearer {user_id}.{unix_timestamp}.{base64_signature}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(BEARER_PREFIX))
            .ok_or_else(|| ApiError::code(ResponseCode::UnLogin))?;

        let auth = state.config.auth.read().await;
        let user_id = verify_user_token(token.trim(), auth.secret_bytes(), auth.token_ttl_secs)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected user token");
                ApiError::code(ResponseCode::UnLogin)
            })?;
        drop(auth);

        Ok(AuthUser(user_id))
    }
}

// ---------------------------------------------------------------------------
// ValidQuery / ValidJson
// ---------------------------------------------------------------------------

pub struct ValidQuery<T>(pub T);

impl<T: DeserializeOwned + Send> FromRequestParts<AppState> for ValidQuery<T> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected query string");
                ApiError::code(ResponseCode::ParamValueIllegal)
            })?;
        Ok(ValidQuery(value))
    }
}

pub struct ValidJson<T>(pub T);

impl<T: DeserializeOwned + Send> FromRequest<AppState> for ValidJson<T> {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e, "Rejected JSON body");
            ApiError::code(ResponseCode::ParamValueIllegal)
        })?;
        Ok(ValidJson(value))
    }
}
