use axum::{Json, extract::State};
use storefront_core::lock::SubmitLocks;
use storefront_sdk::objects::{Envelope, ResponseCode, SubmitOrder, SubmitResult};

use crate::api::ApiError;
use crate::api::extractors::{AuthUser, ValidJson};
use crate::state::AppState;

/// `POST /submit`: create an order from the cart.
///
/// Identical submissions of one user are serialized by a keyed lock; a
/// request arriving while the lock is held is refused with `FAIL`. The lock
/// is released when this handler returns.
pub(super) async fn submit(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(body): ValidJson<SubmitOrder>,
) -> Result<Json<Envelope<SubmitResult>>, ApiError> {
    let mall = state.config.mall.read().await.clone();

    let key = SubmitLocks::submit_key(user_id, &body);
    let Some(_guard) = state.submit_locks.try_acquire(key, mall.submit_lock_ttl) else {
        tracing::info!(user_id, "Duplicate order submission refused");
        return Err(ApiError::with_message(
            ResponseCode::Fail,
            "duplicate request",
        ));
    };

    let result = state.services().submit(user_id, &body, &mall).await?;
    Ok(Json(Envelope::ok(result)))
}
