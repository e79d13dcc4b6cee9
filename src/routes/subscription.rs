use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::UserIdentity,
    models::{common::SuccessResponse, subscription::SubscriptionStatusData},
};

/// GET /api/v1/users/{user_id}/subscription
#[instrument(skip(state, identity))]
pub async fn get_subscription_status(
    State(state): State<AppState>,
    identity: UserIdentity,
    Path(user_id): Path<Uuid>,
) -> Result<Json<SuccessResponse<SubscriptionStatusData>>> {
    if identity.user_id != user_id {
        return Err(ApiError::Forbidden(
            "Cannot read another user's subscription".to_string(),
        ));
    }

    let subscription_status = state.subscription_service.get_status(user_id).await?;

    Ok(Json(SuccessResponse::new(SubscriptionStatusData {
        subscription_status,
    })))
}
