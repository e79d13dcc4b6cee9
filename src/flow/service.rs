use std::sync::Arc;

use tokio::sync::broadcast;

use super::backend::{Backend, HttpBackend};
use super::commitment::CommitmentCreator;
use super::confirmation::ConfirmationPoller;
use super::diagnostics::Diagnostics;
use super::initiator::{PurchaseInitiator, PurchaseResult};
use super::listener::{ListenerRegistration, PurchaseEvent, PurchaseListener};
use super::machine::{FlowComponents, Presenter, SubscriptionFlow};
use super::messages::Messages;
use super::settings::FlowSettings;
use super::staging::{FileStagingStore, StagingStore};
use super::store::PurchaseStore;
use crate::models::common::SubscriptionPlan;

/// Application-scoped entry point to in-app purchases.
///
/// Owns the single store listener; flows created from it share that listener.
pub struct PurchaseService {
    settings: FlowSettings,
    store: Arc<dyn PurchaseStore>,
    backend: Arc<dyn Backend>,
    staging: Arc<dyn StagingStore>,
    diagnostics: Arc<dyn Diagnostics>,
    listener: Arc<PurchaseListener>,
    registration: ListenerRegistration,
}

impl PurchaseService {
    pub fn new(
        settings: FlowSettings,
        store: Arc<dyn PurchaseStore>,
        backend: Arc<dyn Backend>,
        staging: Arc<dyn StagingStore>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        let listener = Arc::new(PurchaseListener::new(
            store.clone(),
            backend.clone(),
            diagnostics.clone(),
        ));

        Self {
            settings,
            store,
            backend,
            staging,
            diagnostics,
            listener,
            registration: ListenerRegistration::new(),
        }
    }

    /// Talk to the API at `settings.api_base_url` and stage onboarding data
    /// under `settings.staging_dir`.
    ///
    /// The returned backend is where the session's access token goes.
    pub fn from_settings(
        settings: FlowSettings,
        store: Arc<dyn PurchaseStore>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> (Self, Arc<HttpBackend>) {
        let backend = Arc::new(HttpBackend::new(settings.api_base_url.clone()));
        let staging = Arc::new(FileStagingStore::new(settings.staging_dir.clone()));
        let service = Self::new(settings, store, backend.clone(), staging, diagnostics);
        (service, backend)
    }

    /// Begin consuming store updates. Safe to call repeatedly.
    pub fn start(&self) -> bool {
        self.registration.attach(self.listener.clone())
    }

    pub fn is_listening(&self) -> bool {
        self.registration.is_attached()
    }

    pub fn purchase_events(&self) -> broadcast::Receiver<PurchaseEvent> {
        self.listener.subscribe()
    }

    fn initiator(&self) -> PurchaseInitiator {
        PurchaseInitiator::new(self.store.clone(), self.settings.product_id_prefix.clone())
    }

    pub async fn purchase_subscription(&self, plan: SubscriptionPlan) -> PurchaseResult {
        self.initiator().purchase_subscription(plan).await
    }

    pub fn new_flow(&self, presenter: Arc<dyn Presenter>) -> SubscriptionFlow {
        SubscriptionFlow::new(FlowComponents {
            initiator: self.initiator(),
            listener: self.listener.clone(),
            poller: ConfirmationPoller::new(self.backend.clone(), self.settings.poll),
            creator: CommitmentCreator::new(self.backend.clone(), self.settings.retry),
            staging: self.staging.clone(),
            diagnostics: self.diagnostics.clone(),
            presenter,
            messages: Messages::new(self.settings.locale),
        })
    }
}
