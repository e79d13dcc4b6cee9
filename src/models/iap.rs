use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{IAPPlatform, SubscriptionStatus};

/// IAP Verify Request
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReceiptRequest {
    #[validate(length(min = 10, max = 100000))]
    pub receipt: String,
    #[validate(length(min = 1, max = 100))]
    pub product_id: String,
    #[validate(length(min = 1, max = 255))]
    pub transaction_id: String,
    #[serde(default)]
    pub platform: IAPPlatform,
}

/// IAP Verify Response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReceiptResponse {
    pub success: bool,
}

/// Internal structure for IAP verification result
#[derive(Debug, Clone)]
pub struct IAPVerification {
    pub transaction_id: String,
    pub original_transaction_id: Option<String>,
    pub product_id: String,
    pub expires_at: Option<time::OffsetDateTime>,
    pub platform: IAPPlatform,
    pub subscription_status: SubscriptionStatus,
}
