use axum::Json;
use tracing::instrument;

use crate::{
    error::Result,
    middleware::UserIdentity,
    models::{auth::MeData, common::SuccessResponse},
};

/// GET /api/v1/auth/me
#[instrument(skip(identity))]
pub async fn get_me(identity: UserIdentity) -> Result<Json<SuccessResponse<MeData>>> {
    Ok(Json(SuccessResponse::new(MeData {
        user_id: identity.user_id,
    })))
}
