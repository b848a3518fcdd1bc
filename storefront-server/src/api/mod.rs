//! HTTP API.
//!
//! Every JSON endpoint answers HTTP 200 with an [`Envelope`]; failures carry
//! a non-zero `errno`.

pub mod extractors;
pub mod order;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use storefront_core::payment::GatewayError;
use storefront_core::services::{BusinessError, ServiceError};
use storefront_sdk::objects::{Envelope, ResponseCode};

/// Errors returned by API handlers and extractors.
#[derive(Debug)]
pub enum ApiError {
    /// A rule violation reported to the caller as-is.
    Business(BusinessError),
    /// A database query failed.
    Database(sqlx::Error),
    /// A payment gateway call failed.
    Gateway(GatewayError),
}

impl ApiError {
    pub fn code(code: ResponseCode) -> Self {
        Self::Business(BusinessError::new(code))
    }

    pub fn with_message(code: ResponseCode, message: impl Into<String>) -> Self {
        Self::Business(BusinessError::with_message(code, message))
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Business(e) => Self::Business(e),
            ServiceError::Database(e) => Self::Database(e),
            ServiceError::Gateway(e) => Self::Gateway(e),
        }
    }
}

impl From<BusinessError> for ApiError {
    fn from(err: BusinessError) -> Self {
        Self::Business(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = match self {
            ApiError::Business(e) => Envelope::fail(e.code, e.message),
            ApiError::Database(e) => {
                tracing::error!(error = %e, "Order API database error");
                Envelope::fail(
                    ResponseCode::SystemError,
                    ResponseCode::SystemError.message(),
                )
            }
            ApiError::Gateway(e) => {
                tracing::error!(error = %e, "Order API gateway error");
                Envelope::fail(
                    ResponseCode::SystemError,
                    ResponseCode::SystemError.message(),
                )
            }
        };
        Json(envelope).into_response()
    }
}
