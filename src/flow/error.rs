//! Error taxonomy for the client purchase flow.

use super::messages::MessageKey;
use crate::models::commitment::CommitmentErrorCode;

/// Failures reported by the platform store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    ConnectionFailed(String),

    #[error("purchase cancelled by user")]
    UserCancelled,

    #[error("store request failed with code {code}: {message}")]
    Failed { code: i32, message: String },
}

/// Failures talking to the COMMIT API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Transport(String),

    /// Serverless worker failed (cold start, resource limit); safe to retry
    #[error("server worker error (status {status})")]
    Worker { status: u16 },

    #[error("request rejected ({code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("not authenticated")]
    Unauthorized,

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_worker(&self) -> bool {
        matches!(self, Self::Worker { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StagingError {
    #[error("staging store I/O failed: {0}")]
    Io(String),

    #[error("staged onboarding data is unreadable: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("in-app purchase is not supported on this platform")]
    PlatformNotSupported,

    #[error("purchase cancelled by user")]
    UserCancelled,

    #[error("could not connect to the store: {0}")]
    StoreConnection(String),

    #[error("product {0} is not available in the store")]
    ProductNotFound(String),

    #[error("purchase failed (code {code:?}): {message}")]
    PurchaseFailed { code: Option<i32>, message: String },

    #[error("receipt could not be verified: {0}")]
    ReceiptInvalid(String),

    #[error("subscription not confirmed after {attempts} checks")]
    ConfirmationTimeout { attempts: u32 },

    #[error("missing onboarding data: {}", .0.join(", "))]
    MissingData(Vec<&'static str>),

    #[error("commitment rejected ({code}): {message}")]
    CommitmentRejected { code: String, message: String },

    #[error("commitment creation failed: {0}")]
    CommitmentFailed(String),

    #[error("purchase flow already completed")]
    AlreadyCompleted,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Staging(#[from] StagingError),
}

impl From<StoreError> for FlowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConnectionFailed(msg) => Self::StoreConnection(msg),
            StoreError::UserCancelled => Self::UserCancelled,
            StoreError::Failed { code, message } => Self::PurchaseFailed {
                code: Some(code),
                message,
            },
        }
    }
}

impl FlowError {
    /// Cancellation is the only outcome that is never alerted or reported
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }

    /// Whether the UI should offer to try again
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::PlatformNotSupported | Self::UserCancelled | Self::AlreadyCompleted
        )
    }

    /// Stable identifier used for diagnostics tags
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlatformNotSupported => "PLATFORM_NOT_SUPPORTED",
            Self::UserCancelled => "USER_CANCELLED",
            Self::StoreConnection(_) => "CONNECTION_FAILED",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::PurchaseFailed { .. } => "PURCHASE_FAILED",
            Self::ReceiptInvalid(_) => "RECEIPT_INVALID",
            Self::ConfirmationTimeout { .. } => "CONFIRMATION_TIMEOUT",
            Self::MissingData(_) => "MISSING_DATA",
            Self::CommitmentRejected { .. } => "COMMITMENT_REJECTED",
            Self::CommitmentFailed(_) => "COMMITMENT_FAILED",
            Self::AlreadyCompleted => "ALREADY_COMPLETED",
            Self::Backend(_) => "BACKEND_ERROR",
            Self::Staging(_) => "STAGING_ERROR",
        }
    }

    /// Localized message to show for this error
    pub fn message_key(&self) -> MessageKey {
        match self {
            Self::PlatformNotSupported => MessageKey::PlatformNotSupported,
            Self::UserCancelled => MessageKey::Generic,
            Self::StoreConnection(_) => MessageKey::StoreUnavailable,
            Self::ProductNotFound(_) => MessageKey::ProductNotFound,
            Self::PurchaseFailed { .. } => MessageKey::PurchaseFailed,
            Self::ReceiptInvalid(_) => MessageKey::ReceiptInvalid,
            Self::ConfirmationTimeout { .. } => MessageKey::ConfirmationTimeout,
            Self::MissingData(_) => MessageKey::MissingData,
            Self::CommitmentRejected { code, .. } => CommitmentErrorCode::from_code(code)
                .map(MessageKey::for_commitment_error)
                .unwrap_or(MessageKey::CommitmentCreationFailed),
            Self::CommitmentFailed(_) => MessageKey::CommitmentCreationFailed,
            Self::AlreadyCompleted => MessageKey::Generic,
            Self::Backend(BackendError::Transport(_)) => MessageKey::NetworkError,
            Self::Backend(_) | Self::Staging(_) => MessageKey::Generic,
        }
    }
}
