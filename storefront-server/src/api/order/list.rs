use axum::{Json, extract::State};
use storefront_sdk::objects::{Envelope, ListOrdersQuery, OrderListItem, Paginated};

use crate::api::ApiError;
use crate::api::extractors::{AuthUser, ValidQuery};
use crate::state::AppState;

/// `GET /list`: one page of the user's orders for a show type.
pub(super) async fn list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidQuery(query): ValidQuery<ListOrdersQuery>,
) -> Result<Json<Envelope<Paginated<OrderListItem>>>, ApiError> {
    let page = state.services().list(user_id, query).await?;
    Ok(Json(Envelope::ok(page)))
}
