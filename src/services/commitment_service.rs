use crate::{
    error::{ApiError, Result},
    models::{
        commitment::{BookInput, CommitmentErrorCode, CreateCommitmentRequest},
        common::{Currency, SubscriptionStatus},
    },
};
use entity::sea_orm_active_enums::CommitmentStatus;
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, TransactionTrait};
use std::sync::Arc;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Longest accepted commitment window
const MAX_DEADLINE_DAYS: i64 = 365;

/// Upper bound for target pages when the book's length is unknown
const MAX_TARGET_PAGES: i32 = 10_000;

/// Commitment input after validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCommitment {
    pub book: BookInput,
    pub deadline: OffsetDateTime,
    pub pledge_amount: i32,
    pub currency: Currency,
    pub target_pages: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedCommitment {
    pub commitment_id: Uuid,
    pub book_id: Uuid,
}

pub struct CommitmentService {
    db: Arc<DatabaseConnection>,
}

impl CommitmentService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a commitment for a subscribed user
    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        user_id: Uuid,
        request: &CreateCommitmentRequest,
    ) -> Result<CreatedCommitment> {
        let validated = validate_request(request, OffsetDateTime::now_utc())?;

        let txn = self.db.begin().await?;

        let user = entity::users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))?;

        if user.subscription_status != SubscriptionStatus::Active {
            txn.rollback().await?;
            return Err(ApiError::rejected(
                CommitmentErrorCode::SubscriptionRequired,
                "An active subscription is required to create a commitment",
            ));
        }

        let book_id = match Self::find_book(&txn, &validated.book).await? {
            Some(existing) => existing.id,
            None => {
                let book_id = Uuid::new_v4();
                let book = entity::books::ActiveModel {
                    id: Set(book_id),
                    external_id: Set(validated.book.external_id.clone()),
                    title: Set(validated.book.title.clone()),
                    author: Set(validated.book.author.clone()),
                    cover_url: Set(validated.book.cover_url.clone()),
                    total_pages: Set(validated.book.total_pages),
                    created_at: Set(OffsetDateTime::now_utc()),
                };
                entity::books::Entity::insert(book)
                    .exec_without_returning(&txn)
                    .await?;
                book_id
            }
        };

        let now = OffsetDateTime::now_utc();
        let commitment_id = Uuid::new_v4();
        let commitment = entity::commitments::ActiveModel {
            id: Set(commitment_id),
            user_id: Set(user_id),
            book_id: Set(book_id),
            deadline: Set(validated.deadline),
            pledge_amount: Set(validated.pledge_amount),
            currency: Set(validated.currency.code().to_string()),
            target_pages: Set(validated.target_pages),
            status: Set(CommitmentStatus::InProgress),
            created_at: Set(now),
            updated_at: Set(now),
        };
        entity::commitments::Entity::insert(commitment)
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;

        info!(
            user_id = %user_id,
            commitment_id = %commitment_id,
            book_id = %book_id,
            pledge = validated.pledge_amount,
            currency = validated.currency.code(),
            "Created commitment"
        );

        Ok(CreatedCommitment {
            commitment_id,
            book_id,
        })
    }

    async fn find_book<C: ConnectionTrait>(
        conn: &C,
        book: &BookInput,
    ) -> Result<Option<entity::books::Model>> {
        let Some(external_id) = book.external_id.as_deref() else {
            return Ok(None);
        };

        Ok(entity::books::Entity::find()
            .filter(entity::books::Column::ExternalId.eq(external_id))
            .one(conn)
            .await?)
    }
}

/// Check a commitment request against the creation rules
pub fn validate_request(
    request: &CreateCommitmentRequest,
    now: OffsetDateTime,
) -> Result<ValidatedCommitment> {
    let mut missing = Vec::new();
    if request.book.is_none() {
        missing.push("book");
    }
    if request.deadline.is_none() {
        missing.push("deadline");
    }
    if request.pledge_amount.is_none() {
        missing.push("pledgeAmount");
    }
    if request.currency.is_none() {
        missing.push("currency");
    }
    if request.target_pages.is_none() {
        missing.push("targetPages");
    }

    let (Some(book), Some(deadline), Some(pledge_amount), Some(currency), Some(target_pages)) = (
        request.book.as_ref(),
        request.deadline.as_deref(),
        request.pledge_amount,
        request.currency.as_deref(),
        request.target_pages,
    ) else {
        return Err(ApiError::rejected(
            CommitmentErrorCode::MissingFields,
            format!("Missing required fields: {}", missing.join(", ")),
        ));
    };

    book.validate().map_err(|e| {
        ApiError::rejected(CommitmentErrorCode::InvalidBook, format!("Invalid book: {}", e))
    })?;

    let deadline = OffsetDateTime::parse(deadline, &Rfc3339).map_err(|e| {
        ApiError::rejected(
            CommitmentErrorCode::InvalidDeadline,
            format!("Deadline is not an ISO 8601 timestamp: {}", e),
        )
    })?;
    if deadline <= now {
        return Err(ApiError::rejected(
            CommitmentErrorCode::InvalidDeadline,
            "Deadline must be in the future",
        ));
    }
    if deadline > now + time::Duration::days(MAX_DEADLINE_DAYS) {
        return Err(ApiError::rejected(
            CommitmentErrorCode::InvalidDeadline,
            format!("Deadline must be within {} days", MAX_DEADLINE_DAYS),
        ));
    }

    let currency = Currency::from_code(currency).ok_or_else(|| {
        ApiError::rejected(
            CommitmentErrorCode::UnsupportedCurrency,
            format!("Unsupported currency: {}", currency),
        )
    })?;

    if !currency.accepts_pledge(pledge_amount) {
        let (min, max) = currency.pledge_bounds();
        return Err(ApiError::rejected(
            CommitmentErrorCode::InvalidPledgeAmount,
            format!(
                "Pledge must be between {} and {} {}",
                min,
                max,
                currency.code()
            ),
        ));
    }

    let page_limit = book.total_pages.unwrap_or(MAX_TARGET_PAGES);
    if target_pages < 1 || target_pages > page_limit {
        return Err(ApiError::rejected(
            CommitmentErrorCode::InvalidTargetPages,
            format!("Target pages must be between 1 and {}", page_limit),
        ));
    }

    Ok(ValidatedCommitment {
        book: book.clone(),
        deadline,
        pledge_amount,
        currency,
        target_pages,
    })
}
