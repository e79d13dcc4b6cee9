//! Handles asynchronous purchase resolutions delivered by the store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::backend::Backend;
use super::diagnostics::{DiagnosticContext, Diagnostics};
use super::error::FlowError;
use super::initiator::{PurchaseErrorCode, PurchaseResult};
use super::store::{PurchaseStore, PurchaseUpdate, ResponseCode, StoreTransaction};
use crate::models::{common::IAPPlatform, iap::VerifyReceiptRequest};

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseEvent {
    /// Receipt accepted by the server and the transaction acknowledged
    Verified {
        product_id: String,
        transaction_id: String,
    },
    /// The user closed the purchase sheet. The store does not always name the product.
    Cancelled { product_id: Option<String> },
    Failed {
        product_id: Option<String>,
        transaction_id: Option<String>,
        /// The same transaction already failed verification earlier in this session
        redelivered: bool,
        error: FlowError,
    },
}

impl PurchaseEvent {
    /// Whether this event resolves a purchase of `product_id` started now.
    ///
    /// Events naming another product, and repeat failures of a transaction
    /// left unacknowledged by an earlier attempt, belong to someone else.
    pub fn concerns(&self, product_id: &str) -> bool {
        let matches = |p: &Option<String>| p.as_deref().map_or(true, |p| p == product_id);
        match self {
            PurchaseEvent::Verified { product_id: p, .. } => p == product_id,
            PurchaseEvent::Cancelled { product_id: p } => matches(p),
            PurchaseEvent::Failed {
                product_id: p,
                redelivered,
                ..
            } => !redelivered && matches(p),
        }
    }

    /// Summarize the event for a purchase of `product_id`
    pub fn result_for(&self, product_id: &str) -> PurchaseResult {
        let named = |p: &Option<String>| p.clone().unwrap_or_else(|| product_id.to_string());
        match self {
            PurchaseEvent::Verified {
                product_id,
                transaction_id,
            } => PurchaseResult {
                success: true,
                product_id: product_id.clone(),
                transaction_id: Some(transaction_id.clone()),
                error: None,
            },
            PurchaseEvent::Cancelled { product_id } => PurchaseResult {
                success: false,
                product_id: named(product_id),
                transaction_id: None,
                error: Some(PurchaseErrorCode::UserCancelled),
            },
            PurchaseEvent::Failed {
                product_id,
                transaction_id,
                error,
                ..
            } => PurchaseResult {
                success: false,
                product_id: named(product_id),
                transaction_id: transaction_id.clone(),
                error: Some(PurchaseErrorCode::from_error(error)),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    Verifying,
    Acknowledged,
}

pub struct PurchaseListener {
    store: Arc<dyn PurchaseStore>,
    backend: Arc<dyn Backend>,
    diagnostics: Arc<dyn Diagnostics>,
    transactions: Mutex<HashMap<String, TransactionState>>,
    rejected: Mutex<HashSet<String>>,
    events: broadcast::Sender<PurchaseEvent>,
}

impl PurchaseListener {
    pub fn new(
        store: Arc<dyn PurchaseStore>,
        backend: Arc<dyn Backend>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            backend,
            diagnostics,
            transactions: Mutex::new(HashMap::new()),
            rejected: Mutex::new(HashSet::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PurchaseEvent> {
        self.events.subscribe()
    }

    fn updates(&self) -> Option<mpsc::UnboundedReceiver<PurchaseUpdate>> {
        self.store.take_purchase_updates()
    }

    fn emit(&self, event: PurchaseEvent) {
        // Nobody listening is fine; the server state is still authoritative
        if self.events.send(event).is_err() {
            debug!("Purchase event dropped, no active flow");
        }
    }

    #[instrument(skip(self, update), fields(response_code = ?update.response_code))]
    pub async fn handle(&self, update: PurchaseUpdate) {
        match update.response_code {
            ResponseCode::Ok => {
                for transaction in &update.results {
                    self.handle_transaction(transaction).await;
                }
            }
            ResponseCode::UserCanceled => {
                info!("Purchase cancelled by user");
                self.emit(PurchaseEvent::Cancelled {
                    product_id: update.results.first().map(|tx| tx.product_id.clone()),
                });
            }
            ResponseCode::Deferred => {
                info!("Purchase deferred, awaiting approval");
                self.diagnostics
                    .breadcrumb("iap", "purchase deferred pending approval");
            }
            ResponseCode::Error(code) => {
                let err = FlowError::PurchaseFailed {
                    code: Some(code),
                    message: "store reported a failed purchase".to_string(),
                };
                let first = update.results.first();
                let mut context = DiagnosticContext::at("purchase_listener").response_code(code);
                if let Some(tx) = first {
                    context = context
                        .product(tx.product_id.clone())
                        .transaction(tx.transaction_id.clone());
                }
                self.diagnostics.capture(&err, &context);
                self.emit(PurchaseEvent::Failed {
                    product_id: first.map(|tx| tx.product_id.clone()),
                    transaction_id: first.map(|tx| tx.transaction_id.clone()),
                    redelivered: false,
                    error: err,
                });
            }
        }
    }

    async fn handle_transaction(&self, transaction: &StoreTransaction) {
        let id = transaction.transaction_id.clone();

        {
            let mut transactions = self.transactions.lock().await;
            if transaction.acknowledged {
                transactions.insert(id.clone(), TransactionState::Acknowledged);
                debug!(transaction_id = %id, "Store reports transaction already acknowledged");
                return;
            }
            if let Some(state) = transactions.get(&id) {
                debug!(transaction_id = %id, ?state, "Skipping duplicate delivery");
                return;
            }
            transactions.insert(id.clone(), TransactionState::Verifying);
        }

        let request = VerifyReceiptRequest {
            receipt: transaction.receipt.clone(),
            product_id: transaction.product_id.clone(),
            transaction_id: id.clone(),
            platform: IAPPlatform::Apple,
        };

        match self.backend.verify_receipt(&request).await {
            Ok(()) => {
                self.rejected.lock().await.remove(&id);
                if let Err(e) = self.store.finish_transaction(transaction, true).await {
                    warn!(transaction_id = %id, error = %e, "Failed to acknowledge verified transaction");
                }
                self.transactions
                    .lock()
                    .await
                    .insert(id.clone(), TransactionState::Acknowledged);

                info!(transaction_id = %id, product_id = %transaction.product_id, "Receipt verified");
                self.emit(PurchaseEvent::Verified {
                    product_id: transaction.product_id.clone(),
                    transaction_id: id,
                });
            }
            Err(e) => {
                // Left unacknowledged so the store redelivers it later
                self.transactions.lock().await.remove(&id);
                let redelivered = !self.rejected.lock().await.insert(id.clone());

                let err = FlowError::ReceiptInvalid(e.to_string());
                self.diagnostics.capture(
                    &err,
                    &DiagnosticContext::at("receipt_verification")
                        .product(transaction.product_id.clone())
                        .transaction(id.clone()),
                );
                self.emit(PurchaseEvent::Failed {
                    product_id: Some(transaction.product_id.clone()),
                    transaction_id: Some(id),
                    redelivered,
                    error: err,
                });
            }
        }
    }
}

/// Application-scoped owner of the store subscription.
///
/// At most one listener task is attached; it is stopped when the registration
/// is dropped.
#[derive(Default)]
pub struct ListenerRegistration {
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl ListenerRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start feeding store updates into `listener`. Returns `false` if already attached.
    pub fn attach(&self, listener: Arc<PurchaseListener>) -> bool {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            debug!("Purchase listener already attached");
            return false;
        }

        let Some(mut updates) = listener.updates() else {
            warn!("Purchase update stream is owned elsewhere");
            return false;
        };

        *task = Some(tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                listener.handle(update).await;
            }
            debug!("Purchase update stream closed");
        }));
        info!("Purchase listener attached");
        true
    }

    pub fn is_attached(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        let task = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}
