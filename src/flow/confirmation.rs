//! Confirms server-side subscription activation after a purchase.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::Backend;
use super::error::{BackendError, FlowError};
use super::poll::{poll_until, PollOutcome, PollPolicy};
use crate::models::common::SubscriptionStatus;

pub struct ConfirmationPoller {
    backend: Arc<dyn Backend>,
    policy: PollPolicy,
    user_id: Mutex<Option<Uuid>>,
}

impl ConfirmationPoller {
    pub fn new(backend: Arc<dyn Backend>, policy: PollPolicy) -> Self {
        Self {
            backend,
            policy,
            user_id: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// The signed-in user seen by the last status check
    pub fn user_id(&self) -> Option<Uuid> {
        *self.user_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Single status check for the signed-in user
    pub async fn is_active(&self) -> Result<bool, BackendError> {
        let user_id = self.backend.current_user_id().await?;
        *self.user_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(user_id);
        let status = self.backend.subscription_status(user_id).await?;
        Ok(status == SubscriptionStatus::Active)
    }

    /// Poll until the subscription reads `active`.
    ///
    /// Returns the attempt that observed activation. Probe failures count as
    /// "not yet" so a flaky network does not abort the wait.
    pub async fn wait_for_active(&self) -> Result<u32, FlowError> {
        let outcome = poll_until(self.policy, |attempt| async move {
            match self.is_active().await {
                Ok(true) => Some(()),
                Ok(false) => {
                    debug!(attempt, "Subscription not active yet");
                    None
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Subscription status check failed");
                    None
                }
            }
        })
        .await;

        match outcome {
            PollOutcome::Ready { attempts, .. } => {
                info!(attempts, "Subscription confirmed active");
                Ok(attempts)
            }
            PollOutcome::Exhausted { attempts } => {
                warn!(attempts, "Subscription confirmation timed out");
                Err(FlowError::ConfirmationTimeout { attempts })
            }
        }
    }
}
