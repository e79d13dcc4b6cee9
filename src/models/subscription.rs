use serde::{Deserialize, Serialize};

use super::common::SubscriptionStatus;

/// Response data for GET /users/{user_id}/subscription
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusData {
    pub subscription_status: SubscriptionStatus,
}
