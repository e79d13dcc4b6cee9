use crate::{
    config::IAPConfig,
    error::{ApiError, Result},
    models::{
        common::{IAPPlatform, SubscriptionPlan, SubscriptionStatus},
        iap::IAPVerification,
    },
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

const APPLE_PRODUCTION_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";
const APPLE_SANDBOX_URL: &str = "https://sandbox.itunes.apple.com/verifyReceipt";

/// Apple status returned when a sandbox receipt is sent to production
const STATUS_SANDBOX_RECEIPT: i32 = 21007;

/// Days after expiry during which a renewing subscription still counts as active
const GRACE_PERIOD_DAYS: i64 = 7;

pub struct IAPService {
    config: IAPConfig,
    http_client: reqwest::Client,
    production_url: String,
    sandbox_url: String,
}

#[derive(Debug, Deserialize)]
struct AppleReceiptResponse {
    status: i32,
    receipt: Option<AppleReceipt>,
    latest_receipt_info: Option<Vec<AppleTransaction>>,
}

#[derive(Debug, Deserialize)]
struct AppleReceipt {
    #[serde(default)]
    in_app: Vec<AppleTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
struct AppleTransaction {
    transaction_id: String,
    original_transaction_id: Option<String>,
    product_id: String,
    expires_date_ms: Option<String>,
    #[serde(default)]
    cancellation_date_ms: Option<String>,
}

impl IAPService {
    pub fn new(config: &IAPConfig) -> Self {
        Self::with_endpoints(config, APPLE_PRODUCTION_URL, APPLE_SANDBOX_URL)
    }

    /// Build a service pointed at custom verifyReceipt endpoints
    pub fn with_endpoints(
        config: &IAPConfig,
        production_url: impl Into<String>,
        sandbox_url: impl Into<String>,
    ) -> Self {
        Self {
            config: config.clone(),
            http_client: reqwest::Client::new(),
            production_url: production_url.into(),
            sandbox_url: sandbox_url.into(),
        }
    }

    /// Verify that `receipt` proves `transaction_id` for `product_id`
    #[instrument(skip(self, receipt), fields(receipt_hash = %self.hash_receipt(receipt)))]
    pub async fn verify_receipt(
        &self,
        platform: IAPPlatform,
        receipt: &str,
        product_id: &str,
        transaction_id: &str,
    ) -> Result<IAPVerification> {
        if SubscriptionPlan::from_product_id(&self.config.product_id_prefix, product_id).is_none()
        {
            return Err(ApiError::InvalidReceipt(format!(
                "Unknown product: {}",
                product_id
            )));
        }

        match platform {
            IAPPlatform::Apple => {
                self.verify_apple_receipt(receipt, product_id, transaction_id)
                    .await
            }
            IAPPlatform::Google => {
                warn!("Google IAP verification requested but not supported");
                Err(ApiError::InvalidReceipt(
                    "Google IAP verification is not supported".to_string(),
                ))
            }
        }
    }

    async fn verify_apple_receipt(
        &self,
        receipt: &str,
        product_id: &str,
        transaction_id: &str,
    ) -> Result<IAPVerification> {
        let primary = match self.config.apple_environment.as_str() {
            "production" => self.production_url.as_str(),
            _ => self.sandbox_url.as_str(),
        };

        let mut apple_response = self.post_receipt(primary, receipt).await?;

        // TestFlight and review builds send sandbox receipts to production
        if apple_response.status == STATUS_SANDBOX_RECEIPT && primary != self.sandbox_url {
            info!("Sandbox receipt sent to production, retrying against sandbox");
            apple_response = self.post_receipt(&self.sandbox_url, receipt).await?;
        }

        if apple_response.status != 0 {
            return Err(ApiError::InvalidReceipt(format!(
                "Invalid receipt status: {}",
                apple_response.status
            )));
        }

        let transaction = Self::find_transaction(&apple_response, transaction_id).ok_or_else(
            || {
                ApiError::InvalidReceipt(format!(
                    "Transaction {} not found in receipt",
                    transaction_id
                ))
            },
        )?;

        if transaction.product_id != product_id {
            return Err(ApiError::InvalidReceipt(format!(
                "Product mismatch: receipt has {}, request claims {}",
                transaction.product_id, product_id
            )));
        }

        let expires_at = transaction
            .expires_date_ms
            .as_deref()
            .and_then(parse_epoch_ms);
        let cancelled_at = transaction
            .cancellation_date_ms
            .as_deref()
            .and_then(parse_epoch_ms);

        let subscription_status = Self::determine_subscription_status(
            expires_at,
            cancelled_at,
            time::OffsetDateTime::now_utc(),
        );

        info!(
            transaction_id = %transaction.transaction_id,
            product_id = %transaction.product_id,
            status = ?subscription_status,
            "Verified Apple IAP receipt"
        );

        Ok(IAPVerification {
            transaction_id: transaction.transaction_id,
            original_transaction_id: transaction.original_transaction_id,
            product_id: transaction.product_id,
            expires_at,
            platform: IAPPlatform::Apple,
            subscription_status,
        })
    }

    async fn post_receipt(&self, endpoint: &str, receipt: &str) -> Result<AppleReceiptResponse> {
        let request_body = serde_json::json!({
            "receipt-data": receipt,
            "password": self.config.apple_shared_secret,
            "exclude-old-transactions": true,
        });

        let response = self
            .http_client
            .post(endpoint)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("Failed to reach verifyReceipt: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "verifyReceipt returned HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("Invalid verifyReceipt response: {}", e)))
    }

    fn find_transaction(
        response: &AppleReceiptResponse,
        transaction_id: &str,
    ) -> Option<AppleTransaction> {
        let latest = response.latest_receipt_info.iter().flatten();
        let in_app = response.receipt.iter().flat_map(|r| r.in_app.iter());

        latest
            .chain(in_app)
            .find(|t| t.transaction_id == transaction_id)
            .cloned()
    }

    /// Derive the user-facing subscription flag from Apple receipt dates
    fn determine_subscription_status(
        expires_at: Option<time::OffsetDateTime>,
        cancelled_at: Option<time::OffsetDateTime>,
        now: time::OffsetDateTime,
    ) -> SubscriptionStatus {
        if cancelled_at.is_some() {
            return SubscriptionStatus::Inactive;
        }

        match expires_at {
            Some(expires) if expires + time::Duration::days(GRACE_PERIOD_DAYS) > now => {
                SubscriptionStatus::Active
            }
            Some(_) => SubscriptionStatus::Inactive,
            // Non-expiring purchase
            None => SubscriptionStatus::Active,
        }
    }

    /// Fingerprint a receipt for logs without recording the receipt itself
    pub fn hash_receipt(&self, receipt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(receipt.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

fn parse_epoch_ms(ms: &str) -> Option<time::OffsetDateTime> {
    let ts_ms = ms.parse::<i64>().ok()?;
    time::OffsetDateTime::from_unix_timestamp(ts_ms / 1000).ok()
}
