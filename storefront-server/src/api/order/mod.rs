//! Order API handlers.
//!
//! Called by the storefront frontend with a user bearer token, except for
//! the two payment notifications which are verified by gateway signature.
//!
//! # Endpoints
//!
//! - `GET  /detail`         – order with its goods
//! - `GET  /list`           – paginated orders for a show type
//! - `POST /submit`         – create an order from the cart
//! - `POST /refund`         – request a refund of a paid order
//! - `POST /delete`         – delete a closed order
//! - `POST /confirm`        – confirm receipt
//! - `POST /cancel`         – cancel an unpaid order
//! - `GET  /h5pay`          – redirect to WeChat checkout
//! - `GET  /h5alipay`       – redirect to Alipay checkout
//! - `POST /wx-notify`      – WeChat payment notification
//! - `POST /alipay-notify`  – Alipay payment notification

use axum::{
    Router,
    routing::{get, post},
};
use storefront_sdk::objects::ResponseCode;

use super::ApiError;
use crate::state::AppState;

mod cancel;
mod confirm;
mod delete;
mod detail;
mod list;
mod notify;
mod pay;
mod refund;
mod submit;

/// Build the order API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/detail", get(detail::detail))
        .route("/list", get(list::list))
        .route("/submit", post(submit::submit))
        .route("/refund", post(refund::refund))
        .route("/delete", post(delete::delete))
        .route("/confirm", post(confirm::confirm))
        .route("/cancel", post(cancel::cancel))
        .route("/h5pay", get(pay::h5pay))
        .route("/h5alipay", get(pay::h5alipay))
        .route("/wx-notify", post(notify::wx_notify))
        .route("/alipay-notify", post(notify::alipay_notify))
}

/// A missing order id is `PARAM_ILLEGAL`, a non-positive one
/// `PARAM_VALUE_ILLEGAL`.
fn require_order_id(order_id: Option<i64>) -> Result<i64, ApiError> {
    match order_id {
        None => Err(ApiError::code(ResponseCode::ParamIllegal)),
        Some(id) if id <= 0 => Err(ApiError::code(ResponseCode::ParamValueIllegal)),
        Some(id) => Ok(id),
    }
}
