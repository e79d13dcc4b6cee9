//! End-to-end subscription purchase and commitment flow.
//!
//! ```text
//! Idle -> Purchasing -> AwaitingVerification -> Verified -> CreatingCommitment -> Done
//! ```
//!
//! Any failure before `Done` returns the flow to `Idle`. `Done` is terminal.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast::error::RecvError, watch};
use tracing::{debug, info, instrument, warn};

use super::backend::CommitmentCreated;
use super::commitment::{CommitmentCreator, CommitmentDraft};
use super::confirmation::ConfirmationPoller;
use super::diagnostics::{DiagnosticContext, Diagnostics};
use super::error::FlowError;
use super::initiator::PurchaseInitiator;
use super::listener::{PurchaseEvent, PurchaseListener};
use super::messages::{Messages, TimeoutPrompt, UserMessage};
use super::staging::{OnboardingData, StagingStore};
use crate::models::common::SubscriptionPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Purchasing,
    AwaitingVerification,
    Verified,
    CreatingCommitment,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutChoice {
    Retry,
    Cancel,
}

/// UI surface the flow reports to
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn show_error(&self, message: &UserMessage);

    async fn choose_after_timeout(&self, prompt: &TimeoutPrompt) -> TimeoutChoice;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    Completed(CommitmentCreated),
    Cancelled,
}

/// Collaborators a [`SubscriptionFlow`] is assembled from
pub struct FlowComponents {
    pub initiator: PurchaseInitiator,
    pub listener: Arc<PurchaseListener>,
    pub poller: ConfirmationPoller,
    pub creator: CommitmentCreator,
    pub staging: Arc<dyn StagingStore>,
    pub diagnostics: Arc<dyn Diagnostics>,
    pub presenter: Arc<dyn Presenter>,
    pub messages: Messages,
}

/// A failure plus whether diagnostics already saw it
struct Failure {
    error: FlowError,
    captured: bool,
}

impl From<FlowError> for Failure {
    fn from(error: FlowError) -> Self {
        Self {
            error,
            captured: false,
        }
    }
}

pub struct SubscriptionFlow {
    initiator: PurchaseInitiator,
    listener: Arc<PurchaseListener>,
    poller: ConfirmationPoller,
    creator: CommitmentCreator,
    staging: Arc<dyn StagingStore>,
    diagnostics: Arc<dyn Diagnostics>,
    presenter: Arc<dyn Presenter>,
    messages: Messages,
    state: watch::Sender<FlowState>,
}

impl SubscriptionFlow {
    pub fn new(components: FlowComponents) -> Self {
        let (state, _) = watch::channel(FlowState::Idle);
        Self {
            initiator: components.initiator,
            listener: components.listener,
            poller: components.poller,
            creator: components.creator,
            staging: components.staging,
            diagnostics: components.diagnostics,
            presenter: components.presenter,
            messages: components.messages,
            state,
        }
    }

    pub fn state(&self) -> FlowState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<FlowState> {
        self.state.subscribe()
    }

    fn transition(&self, next: FlowState) -> Result<(), FlowError> {
        let current = self.state();
        if current == FlowState::Done {
            return Err(FlowError::AlreadyCompleted);
        }
        if current != next {
            debug!(from = ?current, to = ?next, "Flow state change");
            self.state.send_replace(next);
        }
        Ok(())
    }

    /// Purchase `plan` and create the commitment described by `draft`.
    ///
    /// Returns `Cancelled` when the user backs out, which is never an error.
    #[instrument(skip(self, draft), fields(plan = plan.as_str()))]
    pub async fn run(
        &self,
        plan: SubscriptionPlan,
        draft: CommitmentDraft,
    ) -> Result<FlowOutcome, FlowError> {
        if self.state() == FlowState::Done {
            return Err(FlowError::AlreadyCompleted);
        }

        let context = DiagnosticContext::at("subscription_flow")
            .product(self.initiator.product_id(plan));

        // Catch incomplete onboarding before anything is charged
        if let Err(e) = draft.validate() {
            return self.fail(e.into(), &context).await;
        }

        let staged = OnboardingData::new(plan, draft);
        if let Err(e) = self.staging.save(&staged).await {
            return self.fail(FlowError::from(e).into(), &context).await;
        }

        loop {
            match self.attempt_purchase(plan).await {
                Ok(()) => break,
                Err(Failure {
                    error: FlowError::ConfirmationTimeout { attempts },
                    ..
                }) => {
                    self.diagnostics.capture(
                        &FlowError::ConfirmationTimeout { attempts },
                        &self.with_user(&context),
                    );
                    self.transition(FlowState::Idle)?;

                    match self
                        .presenter
                        .choose_after_timeout(&self.messages.timeout_prompt())
                        .await
                    {
                        TimeoutChoice::Retry => {
                            info!(attempts, "Retrying purchase after confirmation timeout");
                        }
                        TimeoutChoice::Cancel => {
                            info!("Purchase abandoned after confirmation timeout");
                            return Ok(FlowOutcome::Cancelled);
                        }
                    }
                }
                Err(failure) => return self.fail(failure, &context).await,
            }
        }

        self.finish(&staged.commitment).await
    }

    /// Pick up a flow staged before the app was restarted.
    ///
    /// Completes the commitment if the subscription is already active.
    /// Returns `None` when nothing is staged or the purchase never went through.
    pub async fn resume(&self) -> Result<Option<FlowOutcome>, FlowError> {
        let Some(staged) = self.staging.load().await? else {
            return Ok(None);
        };

        match self.poller.is_active().await {
            Ok(true) => {
                info!(
                    plan = staged.selected_plan.as_str(),
                    "Resuming staged onboarding with active subscription"
                );
                self.transition(FlowState::Verified)?;
                self.finish(&staged.commitment).await.map(Some)
            }
            Ok(false) => {
                debug!("Staged onboarding found but subscription is not active");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Could not check subscription while resuming");
                Ok(None)
            }
        }
    }

    async fn attempt_purchase(&self, plan: SubscriptionPlan) -> Result<(), Failure> {
        self.transition(FlowState::Purchasing)?;

        // Subscribe before the sheet opens so no resolution is missed
        let mut events = self.listener.subscribe();
        let product_id = self.initiator.begin(plan).await?;
        self.diagnostics
            .breadcrumb("iap", &format!("purchase started for {}", product_id));

        self.transition(FlowState::AwaitingVerification)?;

        let confirmation = self.poller.wait_for_active();
        tokio::pin!(confirmation);

        loop {
            tokio::select! {
                result = &mut confirmation => {
                    result?;
                    break;
                }
                event = events.recv() => match event {
                    Ok(event) if !event.concerns(&product_id) => {
                        debug!(?event, product_id = %product_id, "Ignoring event from another purchase");
                    }
                    Ok(PurchaseEvent::Verified { transaction_id, .. }) => {
                        debug!(transaction_id = %transaction_id, "Receipt verified, waiting for server status");
                    }
                    Ok(PurchaseEvent::Cancelled { .. }) => {
                        return Err(FlowError::UserCancelled.into());
                    }
                    Ok(PurchaseEvent::Failed { error, .. }) => {
                        return Err(Failure { error, captured: true });
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed purchase events");
                    }
                    Err(RecvError::Closed) => {
                        (&mut confirmation).await?;
                        break;
                    }
                }
            }
        }

        self.transition(FlowState::Verified)?;
        Ok(())
    }

    async fn finish(&self, draft: &CommitmentDraft) -> Result<FlowOutcome, FlowError> {
        self.transition(FlowState::CreatingCommitment)?;

        match self.creator.create(draft).await {
            Ok(created) => {
                if let Err(e) = self.staging.clear().await {
                    warn!(error = %e, "Failed to clear staged onboarding data");
                }
                self.transition(FlowState::Done)?;
                Ok(FlowOutcome::Completed(created))
            }
            Err(e) => {
                self.fail(e.into(), &DiagnosticContext::at("commitment_creation"))
                    .await
            }
        }
    }

    fn with_user(&self, context: &DiagnosticContext) -> DiagnosticContext {
        match self.poller.user_id() {
            Some(user_id) => context.clone().user(user_id),
            None => context.clone(),
        }
    }

    async fn fail(
        &self,
        failure: Failure,
        context: &DiagnosticContext,
    ) -> Result<FlowOutcome, FlowError> {
        self.transition(FlowState::Idle)?;

        if failure.error.is_silent() {
            debug!("Purchase cancelled by user");
            return Ok(FlowOutcome::Cancelled);
        }

        if !failure.captured {
            self.diagnostics
                .capture(&failure.error, &self.with_user(context));
        }
        self.presenter
            .show_error(&self.messages.get(failure.error.message_key()))
            .await;

        Err(failure.error)
    }
}
