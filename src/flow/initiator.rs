//! Starts a native subscription purchase for a plan.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::error::FlowError;
use super::store::{Platform, PurchaseStore};
use crate::models::common::SubscriptionPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseErrorCode {
    PlatformNotSupported,
    ConnectionFailed,
    ProductNotFound,
    UserCancelled,
    PurchaseFailed,
}

impl PurchaseErrorCode {
    pub(crate) fn from_error(err: &FlowError) -> Self {
        match err {
            FlowError::PlatformNotSupported => Self::PlatformNotSupported,
            FlowError::StoreConnection(_) => Self::ConnectionFailed,
            FlowError::ProductNotFound(_) => Self::ProductNotFound,
            FlowError::UserCancelled => Self::UserCancelled,
            _ => Self::PurchaseFailed,
        }
    }
}

/// Outcome of presenting the purchase sheet.
///
/// `success` only means the sheet was shown; the purchase itself resolves
/// asynchronously through the store's update stream. `transaction_id` is
/// known only once the store has resolved the purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResult {
    pub success: bool,
    pub product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PurchaseErrorCode>,
}

pub struct PurchaseInitiator {
    store: Arc<dyn PurchaseStore>,
    product_id_prefix: String,
}

impl PurchaseInitiator {
    pub fn new(store: Arc<dyn PurchaseStore>, product_id_prefix: impl Into<String>) -> Self {
        Self {
            store,
            product_id_prefix: product_id_prefix.into(),
        }
    }

    pub fn product_id(&self, plan: SubscriptionPlan) -> String {
        plan.product_id(&self.product_id_prefix)
    }

    /// Present the purchase sheet for `plan`, returning the product id requested
    #[instrument(skip(self), fields(plan = plan.as_str()))]
    pub async fn begin(&self, plan: SubscriptionPlan) -> Result<String, FlowError> {
        if self.store.platform() != Platform::Ios {
            return Err(FlowError::PlatformNotSupported);
        }

        let product_id = self.product_id(plan);

        let products = self.store.list_purchasable_products().await?;
        if !products.iter().any(|p| p.product_id == product_id) {
            warn!(
                product_id = %product_id,
                available = products.len(),
                "Product missing from store catalog"
            );
            return Err(FlowError::ProductNotFound(product_id));
        }

        self.store.initiate_purchase(&product_id).await?;
        info!(product_id = %product_id, "Purchase sheet presented");

        Ok(product_id)
    }

    pub async fn purchase_subscription(&self, plan: SubscriptionPlan) -> PurchaseResult {
        match self.begin(plan).await {
            Ok(product_id) => PurchaseResult {
                success: true,
                product_id,
                transaction_id: None,
                error: None,
            },
            Err(err) => PurchaseResult {
                success: false,
                product_id: self.product_id(plan),
                transaction_id: None,
                error: Some(PurchaseErrorCode::from_error(&err)),
            },
        }
    }
}
