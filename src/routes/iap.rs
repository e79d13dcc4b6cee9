use axum::{extract::State, Json};
use tracing::instrument;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::UserIdentity,
    models::iap::{VerifyReceiptRequest, VerifyReceiptResponse},
};

/// POST /api/v1/iap/verify
///
/// Verifies the store receipt and, when valid, flips the caller's
/// subscription flag. Safe to replay for the same transaction.
#[instrument(skip(state, request), fields(transaction_id = %request.transaction_id))]
pub async fn verify_receipt(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<VerifyReceiptRequest>,
) -> Result<Json<VerifyReceiptResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let verification = state
        .iap_service
        .verify_receipt(
            request.platform,
            &request.receipt,
            &request.product_id,
            &request.transaction_id,
        )
        .await?;

    state
        .subscription_service
        .activate(identity.user_id, &verification)
        .await?;

    Ok(Json(VerifyReceiptResponse { success: true }))
}
