use axum::{Json, extract::State};
use storefront_sdk::objects::{Envelope, OrderIdBody};

use super::require_order_id;
use crate::api::ApiError;
use crate::api::extractors::{AuthUser, ValidJson};
use crate::state::AppState;

/// `POST /refund`: request a refund of a paid order.
///
/// The order moves to refund-requested and an admin notice is queued.
pub(super) async fn refund(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(body): ValidJson<OrderIdBody>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let order_id = require_order_id(body.order_id)?;
    state.services().refund(user_id, order_id).await?;
    Ok(Json(Envelope::ok_empty()))
}
