//! Client-side subscription purchase and commitment flow.
//!
//! A purchase is confirmed by polling the server for an active subscription
//! rather than trusting the store callback alone. The commitment is created
//! only after that confirmation.

pub mod backend;
pub mod commitment;
pub mod confirmation;
pub mod diagnostics;
pub mod error;
pub mod initiator;
pub mod listener;
pub mod machine;
pub mod messages;
pub mod poll;
pub mod retry;
pub mod service;
pub mod settings;
pub mod staging;
pub mod store;

pub use backend::{Backend, CommitmentCreated, HttpBackend};
pub use commitment::{CommitmentCreator, CommitmentDraft, NewCommitment};
pub use confirmation::ConfirmationPoller;
pub use diagnostics::{DiagnosticContext, Diagnostics, SentryDiagnostics};
pub use error::{BackendError, FlowError, StagingError, StoreError};
pub use initiator::{PurchaseErrorCode, PurchaseInitiator, PurchaseResult};
pub use listener::{ListenerRegistration, PurchaseEvent, PurchaseListener};
pub use machine::{FlowOutcome, FlowState, Presenter, SubscriptionFlow, TimeoutChoice};
pub use messages::{Locale, MessageKey, Messages, TimeoutPrompt, UserMessage};
pub use poll::{poll_until, PollOutcome, PollPolicy};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use service::PurchaseService;
pub use settings::FlowSettings;
pub use staging::{FileStagingStore, MemoryStagingStore, OnboardingData, StagingStore};
pub use store::{Platform, Product, PurchaseStore, PurchaseUpdate, ResponseCode, StoreTransaction};
