//! Payment gateway notifications.
//!
//! These endpoints are unauthenticated; each body is verified with the
//! gateway's signature before anything is read from it. The answer is the
//! gateway's own acknowledgement format: a failure acknowledgement makes the
//! gateway retry later.

use std::collections::BTreeMap;

use axum::{
    Form,
    body::Bytes,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use storefront_core::payment::{alipay, wechat};
use storefront_core::services::{PaymentOutcome, ServiceError};

use crate::state::AppState;

const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// `POST /wx-notify`: WeChat Pay notification (XML).
pub(super) async fn wx_notify(State(state): State<AppState>, body: Bytes) -> Response {
    let Ok(body) = std::str::from_utf8(&body) else {
        tracing::warn!("WeChat notification is not valid UTF-8");
        return xml(StatusCode::BAD_REQUEST, wechat::ACK_FAIL);
    };
    let gateway = state.wechat_gateway().await;
    let result = state.services().wechat_notify(body, &gateway).await;
    match ack_status("WeChat", result) {
        StatusCode::OK => xml(StatusCode::OK, wechat::ACK_SUCCESS),
        status => xml(status, wechat::ACK_FAIL),
    }
}

/// `POST /alipay-notify`: Alipay notification (form-encoded).
pub(super) async fn alipay_notify(
    State(state): State<AppState>,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> Response {
    let Form(params) = match form {
        Ok(form) => form,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed Alipay notification");
            return text(StatusCode::BAD_REQUEST, alipay::ACK_FAIL);
        }
    };
    let gateway = state.alipay_gateway().await;
    let result = state.services().alipay_notify(&params, &gateway).await;
    match ack_status("Alipay", result) {
        StatusCode::OK => text(StatusCode::OK, alipay::ACK_SUCCESS),
        status => text(status, alipay::ACK_FAIL),
    }
}

/// Map a reconciliation result to the HTTP status of the acknowledgement.
///
/// Notifications that can never succeed (bad signature, unknown order,
/// amount mismatch) get 400; storage failures get 500.
fn ack_status(gateway: &str, result: Result<PaymentOutcome, ServiceError>) -> StatusCode {
    match result {
        Ok(PaymentOutcome::Paid { order_id }) => {
            tracing::info!(order_id, gateway, "Order paid");
            StatusCode::OK
        }
        Ok(PaymentOutcome::AlreadyPaid { order_id }) => {
            tracing::info!(order_id, gateway, "Duplicate payment notification");
            StatusCode::OK
        }
        Err(ServiceError::Gateway(e)) => {
            tracing::warn!(error = %e, gateway, "Payment notification rejected");
            StatusCode::BAD_REQUEST
        }
        Err(ServiceError::Business(e)) => {
            tracing::warn!(error = %e, gateway, "Payment notification could not be applied");
            StatusCode::BAD_REQUEST
        }
        Err(ServiceError::Database(e)) => {
            tracing::error!(error = %e, gateway, "Payment notification processing failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn xml(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response()
}

fn text(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response()
}
