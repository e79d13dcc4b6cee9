use crate::{
    error::{ApiError, Result},
    models::{common::SubscriptionStatus, iap::IAPVerification},
};
use sea_orm::{
    entity::*, query::*, sea_query::OnConflict, DatabaseConnection, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct SubscriptionService {
    db: Arc<DatabaseConnection>,
}

impl SubscriptionService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Read the user's current subscription flag
    #[instrument(skip(self))]
    pub async fn get_status(&self, user_id: Uuid) -> Result<SubscriptionStatus> {
        let user = entity::users::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))?;

        Ok(user.subscription_status)
    }

    /// Record a verified store transaction and set the user's subscription active
    ///
    /// Only an active receipt is recorded; an expired or cancelled one is
    /// rejected without touching the user. The flag is never lowered here.
    /// Replaying the same transaction for the same user is a no-op success.
    /// A transaction already bound to another user is a conflict.
    #[instrument(skip(self, verification), fields(transaction_id = %verification.transaction_id))]
    pub async fn activate(
        &self,
        user_id: Uuid,
        verification: &IAPVerification,
    ) -> Result<SubscriptionStatus> {
        if verification.subscription_status != SubscriptionStatus::Active {
            warn!(
                user_id = %user_id,
                status = ?verification.subscription_status,
                expires_at = ?verification.expires_at,
                "Receipt does not grant an active subscription"
            );
            return Err(ApiError::InvalidReceipt(format!(
                "Subscription for transaction {} is not active",
                verification.transaction_id
            )));
        }

        let txn = self.db.begin().await?;

        let user = entity::users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))?;

        let record = entity::iap_transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            transaction_id: Set(verification.transaction_id.clone()),
            original_transaction_id: Set(verification.original_transaction_id.clone()),
            product_id: Set(verification.product_id.clone()),
            platform: Set(verification.platform.as_str().to_string()),
            expires_at: Set(verification.expires_at),
            verified_at: Set(time::OffsetDateTime::now_utc()),
        };

        entity::iap_transactions::Entity::insert(record)
            .on_conflict(
                OnConflict::column(entity::iap_transactions::Column::TransactionId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let persisted = entity::iap_transactions::Entity::find()
            .filter(
                entity::iap_transactions::Column::TransactionId.eq(verification.transaction_id.as_str()),
            )
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow::anyhow!(
                    "Failed to read transaction {} after insert",
                    verification.transaction_id
                ))
            })?;

        if persisted.user_id != user_id {
            txn.rollback().await?;
            return Err(ApiError::Conflict(format!(
                "Transaction {} belongs to another account",
                verification.transaction_id
            )));
        }

        if user.subscription_status != SubscriptionStatus::Active {
            let mut active: entity::users::ActiveModel = user.into();
            active.subscription_status = Set(SubscriptionStatus::Active);
            active.update(&txn).await?;
        }

        txn.commit().await?;

        info!(user_id = %user_id, "Subscription activated from receipt");

        Ok(SubscriptionStatus::Active)
    }
}
