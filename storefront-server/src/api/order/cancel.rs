use axum::{Json, extract::State};
use storefront_sdk::objects::{Envelope, OrderIdBody};

use super::require_order_id;
use crate::api::ApiError;
use crate::api::extractors::{AuthUser, ValidJson};
use crate::state::AppState;

/// `POST /cancel`: cancel an unpaid order.
///
/// Stock is restored and a used coupon is released in the same transaction.
pub(super) async fn cancel(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(body): ValidJson<OrderIdBody>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let order_id = require_order_id(body.order_id)?;
    state.services().cancel(user_id, order_id).await?;
    Ok(Json(Envelope::ok_empty()))
}
