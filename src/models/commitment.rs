use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Book selected for a commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    /// Catalog id from the book search provider (e.g. Google Books volume id)
    #[validate(length(min = 1, max = 128))]
    pub external_id: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(min = 1, max = 300))]
    pub author: String,
    #[validate(url)]
    pub cover_url: Option<String>,
    #[validate(range(min = 1))]
    pub total_pages: Option<i32>,
}

/// POST /api/v1/commitments request
///
/// Every field is optional on the wire so that missing input is reported as
/// `MISSING_FIELDS` instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommitmentRequest {
    pub book: Option<BookInput>,
    /// ISO 8601 / RFC 3339 timestamp
    pub deadline: Option<String>,
    pub pledge_amount: Option<i32>,
    pub currency: Option<String>,
    pub target_pages: Option<i32>,
}

/// POST /api/v1/commitments response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommitmentResponse {
    pub success: bool,
    pub commitment_id: Uuid,
    pub book_id: Uuid,
}

/// Validation failures reported by the commitment endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitmentErrorCode {
    MissingFields,
    InvalidBook,
    InvalidDeadline,
    InvalidPledgeAmount,
    UnsupportedCurrency,
    InvalidTargetPages,
    SubscriptionRequired,
}

impl CommitmentErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingFields => "MISSING_FIELDS",
            Self::InvalidBook => "INVALID_BOOK",
            Self::InvalidDeadline => "INVALID_DEADLINE",
            Self::InvalidPledgeAmount => "INVALID_PLEDGE_AMOUNT",
            Self::UnsupportedCurrency => "UNSUPPORTED_CURRENCY",
            Self::InvalidTargetPages => "INVALID_TARGET_PAGES",
            Self::SubscriptionRequired => "SUBSCRIPTION_REQUIRED",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "MISSING_FIELDS" => Some(Self::MissingFields),
            "INVALID_BOOK" => Some(Self::InvalidBook),
            "INVALID_DEADLINE" => Some(Self::InvalidDeadline),
            "INVALID_PLEDGE_AMOUNT" => Some(Self::InvalidPledgeAmount),
            "UNSUPPORTED_CURRENCY" => Some(Self::UnsupportedCurrency),
            "INVALID_TARGET_PAGES" => Some(Self::InvalidTargetPages),
            "SUBSCRIPTION_REQUIRED" => Some(Self::SubscriptionRequired),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommitmentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
