use axum::{Json, extract::State};
use storefront_sdk::objects::{Envelope, OrderDetail, OrderIdQuery};

use super::require_order_id;
use crate::api::ApiError;
use crate::api::extractors::{AuthUser, ValidQuery};
use crate::state::AppState;

/// `GET /detail?orderId=`: an order of the user with its goods.
pub(super) async fn detail(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidQuery(query): ValidQuery<OrderIdQuery>,
) -> Result<Json<Envelope<OrderDetail>>, ApiError> {
    let order_id = require_order_id(query.order_id)?;
    let detail = state.services().detail(user_id, order_id).await?;
    Ok(Json(Envelope::ok(detail)))
}
