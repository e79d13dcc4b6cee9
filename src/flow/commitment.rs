//! Creates the user's reading commitment once the subscription is active.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use super::backend::{Backend, CommitmentCreated};
use super::error::{BackendError, FlowError};
use super::retry::{retry_with_backoff, RetryPolicy};
use crate::models::commitment::{BookInput, CreateCommitmentRequest};

/// Commitment details gathered during onboarding; any field may still be unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentDraft {
    pub book: Option<BookInput>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
    pub pledge_amount: Option<i32>,
    pub currency: Option<String>,
    pub target_pages: Option<i32>,
}

/// A draft with every required field present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommitment {
    pub book: BookInput,
    pub deadline: OffsetDateTime,
    pub pledge_amount: i32,
    pub currency: String,
    pub target_pages: i32,
}

impl CommitmentDraft {
    /// Names of the required fields that are still unset
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.book.is_none() {
            missing.push("book");
        }
        if self.deadline.is_none() {
            missing.push("deadline");
        }
        if self.pledge_amount.is_none() {
            missing.push("pledgeAmount");
        }
        if self.currency.as_deref().map_or(true, str::is_empty) {
            missing.push("currency");
        }
        if self.target_pages.is_none() {
            missing.push("targetPages");
        }
        missing
    }

    pub fn validate(&self) -> Result<NewCommitment, FlowError> {
        match (
            &self.book,
            self.deadline,
            self.pledge_amount,
            &self.currency,
            self.target_pages,
        ) {
            (Some(book), Some(deadline), Some(pledge_amount), Some(currency), Some(target_pages))
                if !currency.is_empty() =>
            {
                Ok(NewCommitment {
                    book: book.clone(),
                    deadline,
                    pledge_amount,
                    currency: currency.clone(),
                    target_pages,
                })
            }
            _ => Err(FlowError::MissingData(self.missing_fields())),
        }
    }
}

impl NewCommitment {
    pub fn to_request(&self) -> Result<CreateCommitmentRequest, FlowError> {
        let deadline = self
            .deadline
            .format(&Rfc3339)
            .map_err(|e| FlowError::CommitmentFailed(format!("unformattable deadline: {}", e)))?;

        Ok(CreateCommitmentRequest {
            book: Some(self.book.clone()),
            deadline: Some(deadline),
            pledge_amount: Some(self.pledge_amount),
            currency: Some(self.currency.clone()),
            target_pages: Some(self.target_pages),
        })
    }
}

pub struct CommitmentCreator {
    backend: Arc<dyn Backend>,
    retry: RetryPolicy,
}

impl CommitmentCreator {
    pub fn new(backend: Arc<dyn Backend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: &CommitmentDraft) -> Result<CommitmentCreated, FlowError> {
        let request = draft.validate()?.to_request()?;
        let request = &request;

        let created = retry_with_backoff(self.retry, BackendError::is_worker, |attempt| async move {
            debug!(attempt, "Creating commitment");
            self.backend.create_commitment(request).await
        })
        .await
        .map_err(|e| match e {
            BackendError::Rejected { code, message, .. } => {
                FlowError::CommitmentRejected { code, message }
            }
            BackendError::Worker { .. } => FlowError::CommitmentFailed(e.to_string()),
            other => FlowError::Backend(other),
        })?;

        info!(
            commitment_id = %created.commitment_id,
            book_id = %created.book_id,
            "Commitment created"
        );
        Ok(created)
    }
}
