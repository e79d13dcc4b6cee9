use axum::{extract::State, Json};
use tracing::instrument;

use crate::{
    app_state::AppState,
    error::Result,
    middleware::UserIdentity,
    models::commitment::{CreateCommitmentRequest, CreateCommitmentResponse},
};

/// POST /api/v1/commitments
#[instrument(skip(state, request))]
pub async fn create_commitment(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<CreateCommitmentRequest>,
) -> Result<Json<CreateCommitmentResponse>> {
    let created = state
        .commitment_service
        .create(identity.user_id, &request)
        .await?;

    Ok(Json(CreateCommitmentResponse {
        success: true,
        commitment_id: created.commitment_id,
        book_id: created.book_id,
    }))
}
