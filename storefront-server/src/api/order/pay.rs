use axum::{extract::State, response::Redirect};
use storefront_sdk::objects::OrderIdQuery;

use super::require_order_id;
use crate::api::ApiError;
use crate::api::extractors::{AuthUser, ValidQuery};
use crate::state::AppState;

/// `GET /h5pay?orderId=`: redirect to the WeChat hosted checkout page.
pub(super) async fn h5pay(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidQuery(query): ValidQuery<OrderIdQuery>,
) -> Result<Redirect, ApiError> {
    let order_id = require_order_id(query.order_id)?;
    let gateway = state.wechat_gateway().await;
    let url = state
        .services()
        .wechat_h5_pay(user_id, order_id, &gateway)
        .await?;
    Ok(Redirect::to(url.as_str()))
}

/// `GET /h5alipay?orderId=`: redirect to the Alipay hosted checkout page.
pub(super) async fn h5alipay(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidQuery(query): ValidQuery<OrderIdQuery>,
) -> Result<Redirect, ApiError> {
    let order_id = require_order_id(query.order_id)?;
    let gateway = state.alipay_gateway().await;
    let url = state
        .services()
        .alipay_h5_pay(user_id, order_id, &gateway)
        .await?;
    Ok(Redirect::to(url.as_str()))
}
