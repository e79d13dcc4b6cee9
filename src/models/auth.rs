use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response data for GET /auth/me
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeData {
    pub user_id: Uuid,
}
