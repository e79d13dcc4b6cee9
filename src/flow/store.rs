//! Contract with the platform in-app purchase store.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
    Web,
}

/// A purchasable item from the store's catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub product_id: String,
    pub title: String,
    pub price: String,
}

/// Resolution code delivered with a purchase update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Ok,
    UserCanceled,
    /// Awaiting approval (e.g. Ask to Buy); the final resolution comes later
    Deferred,
    Error(i32),
}

impl ResponseCode {
    /// Map the store SDK's numeric response code
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::UserCanceled,
            3 => Self::Deferred,
            other => Self::Error(other),
        }
    }
}

/// A store transaction awaiting (or past) acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTransaction {
    pub product_id: String,
    pub transaction_id: String,
    /// Opaque receipt for server-side verification
    pub receipt: String,
    pub acknowledged: bool,
}

/// One asynchronous resolution from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseUpdate {
    pub response_code: ResponseCode,
    pub results: Vec<StoreTransaction>,
}

#[async_trait]
pub trait PurchaseStore: Send + Sync {
    fn platform(&self) -> Platform;

    /// Products the store currently offers
    async fn list_purchasable_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Present the native purchase sheet; the outcome arrives as a [`PurchaseUpdate`]
    async fn initiate_purchase(&self, product_id: &str) -> Result<(), StoreError>;

    /// Tell the store the transaction is handled so it stops redelivering it
    async fn finish_transaction(
        &self,
        transaction: &StoreTransaction,
        acknowledge: bool,
    ) -> Result<(), StoreError>;

    /// Hand out the purchase update stream; later calls return `None`
    fn take_purchase_updates(&self) -> Option<mpsc::UnboundedReceiver<PurchaseUpdate>>;
}
