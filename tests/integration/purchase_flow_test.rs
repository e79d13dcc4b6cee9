use std::sync::Arc;
use std::time::Duration;

use commit_app::flow::{
    BackendError, CommitmentCreated, CommitmentDraft, ConfirmationPoller, FlowError, FlowOutcome, FlowState,
    MessageKey, OnboardingData, Platform, PollPolicy, PurchaseErrorCode, PurchaseEvent,
    PurchaseListener, PurchaseUpdate, ResponseCode, StagingStore, TimeoutChoice,
};
use commit_app::models::common::SubscriptionPlan;

use crate::support::{
    complete_draft, transaction, FakeBackend, FakeStore, Harness, RecordingDiagnostics,
    ScriptedPresenter, MONTHLY, YEARLY,
};

#[tokio::test]
async fn product_missing_from_catalog_is_not_purchased() {
    let harness = Harness::new(FakeStore::ios(&[YEARLY]), FakeBackend::new());

    let result = harness
        .service
        .purchase_subscription(SubscriptionPlan::Monthly)
        .await;

    assert!(!result.success);
    assert_eq!(result.error, Some(PurchaseErrorCode::ProductNotFound));
    assert!(harness.store.initiated().is_empty());
}

#[tokio::test]
async fn purchase_is_ios_only() {
    let mut store = FakeStore::ios(&[MONTHLY]);
    store.platform = Platform::Web;
    let harness = Harness::new(store, FakeBackend::new());
    let presenter = Arc::new(ScriptedPresenter::default());
    let flow = harness.service.new_flow(presenter.clone());

    let err = flow
        .run(SubscriptionPlan::Monthly, complete_draft())
        .await
        .unwrap_err();

    assert_eq!(err, FlowError::PlatformNotSupported);
    assert!(!err.is_retryable());
    assert_eq!(presenter.errors(), vec![MessageKey::PlatformNotSupported]);
    assert!(harness.store.initiated().is_empty());
}

#[tokio::test(start_paused = true)]
async fn poller_stops_at_first_active_reading() {
    let backend = Arc::new(FakeBackend::new().active_from_check(Some(2)));
    let poller = ConfirmationPoller::new(backend.clone(), PollPolicy::default());

    assert_eq!(poller.wait_for_active().await, Ok(2));
    assert_eq!(backend.status_checks(), 2);
}

#[tokio::test(start_paused = true)]
async fn poller_times_out_after_budget() {
    let backend = Arc::new(FakeBackend::new());
    let policy = PollPolicy {
        interval: Duration::from_millis(200),
        max_attempts: 5,
    };
    let poller = ConfirmationPoller::new(backend.clone(), policy);

    assert_eq!(
        poller.wait_for_active().await,
        Err(FlowError::ConfirmationTimeout { attempts: 5 })
    );
    assert_eq!(backend.status_checks(), 5);
}

#[tokio::test]
async fn incomplete_draft_fails_before_any_network_call() {
    let harness = Harness::new(
        FakeStore::ios(&[MONTHLY]),
        FakeBackend::new().active_from_check(Some(1)),
    );
    let presenter = Arc::new(ScriptedPresenter::default());
    let flow = harness.service.new_flow(presenter.clone());

    let draft = CommitmentDraft {
        book: None,
        deadline: None,
        pledge_amount: None,
        ..complete_draft()
    };
    let err = flow.run(SubscriptionPlan::Monthly, draft).await.unwrap_err();

    assert_eq!(
        err,
        FlowError::MissingData(vec!["book", "deadline", "pledgeAmount"])
    );
    assert_eq!(presenter.errors(), vec![MessageKey::MissingData]);
    assert!(harness.store.initiated().is_empty());
    assert_eq!(harness.backend.status_checks(), 0);
    assert_eq!(harness.backend.commitment_calls(), 0);
    assert_eq!(flow.state(), FlowState::Idle);
}

#[tokio::test(start_paused = true)]
async fn monthly_purchase_confirmed_on_third_check_creates_commitment() {
    let harness = Harness::new(
        FakeStore::ios(&[MONTHLY, YEARLY]),
        FakeBackend::new().active_from_check(Some(3)),
    );
    let presenter = Arc::new(ScriptedPresenter::default());
    let flow = harness.service.new_flow(presenter.clone());
    let states = flow.watch_state();

    let outcome = flow
        .run(SubscriptionPlan::Monthly, complete_draft())
        .await
        .unwrap();

    let FlowOutcome::Completed(created) = outcome else {
        panic!("expected a created commitment, got {:?}", outcome);
    };
    assert!(!created.commitment_id.is_nil());
    assert_eq!(flow.state(), FlowState::Done);
    assert_eq!(*states.borrow(), FlowState::Done);

    assert_eq!(harness.store.initiated(), vec![MONTHLY.to_string()]);
    assert_eq!(harness.backend.status_checks(), 3);
    assert_eq!(harness.backend.commitment_calls(), 1);
    assert_eq!(harness.backend.verified(), vec!["txn-1".to_string()]);
    assert_eq!(
        harness.store.finished(),
        vec![("txn-1".to_string(), true)]
    );

    // Staged onboarding data is gone once the commitment exists
    assert_eq!(harness.staging.load().await.unwrap(), None);
    assert!(presenter.errors().is_empty());
    assert!(harness.diagnostics.codes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn user_cancellation_returns_to_idle_silently() {
    let harness = Harness::new(
        FakeStore::ios(&[MONTHLY]).resolve_with(Some(ResponseCode::UserCanceled)),
        FakeBackend::new(),
    );
    let presenter = Arc::new(ScriptedPresenter::default());
    let flow = harness.service.new_flow(presenter.clone());

    let outcome = flow
        .run(SubscriptionPlan::Monthly, complete_draft())
        .await
        .unwrap();

    assert_eq!(outcome, FlowOutcome::Cancelled);
    assert_eq!(flow.state(), FlowState::Idle);
    assert!(presenter.errors().is_empty());
    assert_eq!(presenter.prompts(), 0);
    assert!(harness.diagnostics.codes().is_empty());
    assert_eq!(harness.backend.commitment_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn confirmation_timeout_offers_retry_of_the_same_product() {
    let harness = Harness::new(FakeStore::ios(&[MONTHLY]), FakeBackend::new());
    let presenter = Arc::new(ScriptedPresenter::with_choices(vec![
        TimeoutChoice::Retry,
        TimeoutChoice::Cancel,
    ]));
    let flow = harness.service.new_flow(presenter.clone());
    let started = tokio::time::Instant::now();

    let outcome = flow
        .run(SubscriptionPlan::Monthly, complete_draft())
        .await
        .unwrap();

    assert_eq!(outcome, FlowOutcome::Cancelled);
    assert_eq!(presenter.prompts(), 2);
    assert_eq!(
        harness.store.initiated(),
        vec![MONTHLY.to_string(), MONTHLY.to_string()]
    );
    // 30 checks one second apart per attempt
    assert_eq!(harness.backend.status_checks(), 60);
    assert!(started.elapsed() >= Duration::from_secs(58));

    assert_eq!(harness.backend.commitment_calls(), 0);
    assert!(presenter.errors().is_empty());
    assert_eq!(
        harness.diagnostics.codes(),
        vec!["CONFIRMATION_TIMEOUT", "CONFIRMATION_TIMEOUT"]
    );
    for (_, context) in harness.diagnostics.captured.lock().unwrap().iter() {
        assert_eq!(context.user_id, Some(harness.backend.user_id));
        assert_eq!(context.product_id.as_deref(), Some(MONTHLY));
    }
    assert_eq!(flow.state(), FlowState::Idle);

    // Nothing was created, so the onboarding data stays staged
    let staged = harness.staging.load().await.unwrap().unwrap();
    assert_eq!(staged.selected_plan, SubscriptionPlan::Monthly);
}

#[tokio::test(start_paused = true)]
async fn rejected_receipt_aborts_without_acknowledging() {
    let harness = Harness::new(
        FakeStore::ios(&[MONTHLY]),
        FakeBackend::new().reject_receipts(),
    );
    let presenter = Arc::new(ScriptedPresenter::default());
    let flow = harness.service.new_flow(presenter.clone());

    let err = flow
        .run(SubscriptionPlan::Monthly, complete_draft())
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::ReceiptInvalid(_)));
    assert_eq!(presenter.errors(), vec![MessageKey::ReceiptInvalid]);
    assert!(harness.store.finished().is_empty());
    assert_eq!(harness.backend.commitment_calls(), 0);

    // Reported once, by the listener, with the transaction attached
    let captured = harness.diagnostics.captured.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].0, "RECEIPT_INVALID");
    assert_eq!(captured[0].1.transaction_id.as_deref(), Some("txn-1"));
    assert_eq!(flow.state(), FlowState::Idle);
}

#[tokio::test(start_paused = true)]
async fn commitment_rejection_is_localized_and_keeps_staged_data() {
    let harness = Harness::new(
        FakeStore::ios(&[MONTHLY]),
        FakeBackend::new()
            .active_from_check(Some(1))
            .commitment_results(vec![Err(BackendError::Rejected {
                status: 400,
                code: "INVALID_DEADLINE".to_string(),
                message: "Deadline must be in the future".to_string(),
            })]),
    );
    let presenter = Arc::new(ScriptedPresenter::default());
    let flow = harness.service.new_flow(presenter.clone());

    let err = flow
        .run(SubscriptionPlan::Monthly, complete_draft())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "COMMITMENT_REJECTED");
    assert_eq!(
        presenter.errors(),
        vec![MessageKey::CommitmentInvalidDeadline]
    );
    assert_eq!(flow.state(), FlowState::Idle);
    assert!(harness.staging.load().await.unwrap().is_some());

    let captured = harness.diagnostics.captured.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].1.location, "commitment_creation");
    assert_eq!(captured[0].1.user_id, Some(harness.backend.user_id));
}

#[tokio::test(start_paused = true)]
async fn worker_errors_are_retried_before_giving_up() {
    let worker = || -> Result<CommitmentCreated, BackendError> {
        Err(BackendError::Worker { status: 546 })
    };
    let harness = Harness::new(
        FakeStore::ios(&[MONTHLY]),
        FakeBackend::new()
            .active_from_check(Some(1))
            .commitment_results(vec![worker(), worker(), worker()]),
    );
    let presenter = Arc::new(ScriptedPresenter::default());
    let flow = harness.service.new_flow(presenter.clone());

    let err = flow
        .run(SubscriptionPlan::Yearly, complete_draft())
        .await;

    // Yearly is not in this catalog
    assert_eq!(err, Err(FlowError::ProductNotFound(YEARLY.to_string())));

    let err = flow
        .run(SubscriptionPlan::Monthly, complete_draft())
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::CommitmentFailed(_)));
    assert_eq!(harness.backend.commitment_calls(), 3);
    assert_eq!(
        presenter.errors(),
        vec![
            MessageKey::ProductNotFound,
            MessageKey::CommitmentCreationFailed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn completed_flow_cannot_run_again() {
    let harness = Harness::new(
        FakeStore::ios(&[MONTHLY]),
        FakeBackend::new().active_from_check(Some(1)),
    );
    let flow = harness
        .service
        .new_flow(Arc::new(ScriptedPresenter::default()));

    flow.run(SubscriptionPlan::Monthly, complete_draft())
        .await
        .unwrap();
    assert_eq!(flow.state(), FlowState::Done);

    assert_eq!(
        flow.run(SubscriptionPlan::Monthly, complete_draft()).await,
        Err(FlowError::AlreadyCompleted)
    );
    assert_eq!(harness.store.initiated().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn resume_finishes_staged_onboarding_once_subscribed() {
    let harness = Harness::new(
        FakeStore::ios(&[MONTHLY]),
        FakeBackend::new().active_from_check(Some(1)),
    );
    harness
        .staging
        .save(&OnboardingData::new(
            SubscriptionPlan::Monthly,
            complete_draft(),
        ))
        .await
        .unwrap();
    let flow = harness
        .service
        .new_flow(Arc::new(ScriptedPresenter::default()));

    let outcome = flow.resume().await.unwrap();

    assert!(matches!(outcome, Some(FlowOutcome::Completed(_))));
    assert!(harness.store.initiated().is_empty());
    assert_eq!(harness.backend.commitment_calls(), 1);
    assert_eq!(harness.staging.load().await.unwrap(), None);
}

#[tokio::test]
async fn resume_without_subscription_leaves_staged_data() {
    let harness = Harness::new(FakeStore::ios(&[MONTHLY]), FakeBackend::new());
    harness
        .staging
        .save(&OnboardingData::new(
            SubscriptionPlan::Yearly,
            complete_draft(),
        ))
        .await
        .unwrap();
    let flow = harness
        .service
        .new_flow(Arc::new(ScriptedPresenter::default()));

    assert_eq!(flow.resume().await.unwrap(), None);
    assert!(harness.staging.load().await.unwrap().is_some());
    assert_eq!(harness.backend.commitment_calls(), 0);
}

#[tokio::test]
async fn listener_registration_is_at_most_one() {
    let harness = Harness::new(FakeStore::ios(&[MONTHLY]), FakeBackend::new());

    assert!(harness.service.is_listening());
    assert!(!harness.service.start());
    assert!(harness.service.is_listening());
}

fn listener_for(store: Arc<FakeStore>, backend: Arc<FakeBackend>) -> PurchaseListener {
    PurchaseListener::new(
        store,
        backend,
        Arc::new(RecordingDiagnostics::default()),
    )
}

#[tokio::test]
async fn acknowledged_transaction_is_verified_once() {
    let store = Arc::new(FakeStore::ios(&[MONTHLY]));
    let backend = Arc::new(FakeBackend::new());
    let listener = listener_for(store.clone(), backend.clone());
    let mut events = listener.subscribe();

    let update = PurchaseUpdate {
        response_code: ResponseCode::Ok,
        results: vec![transaction(MONTHLY, "txn-42", false)],
    };
    listener.handle(update.clone()).await;
    listener.handle(update).await;

    assert_eq!(backend.verified(), vec!["txn-42".to_string()]);
    assert_eq!(store.finished(), vec![("txn-42".to_string(), true)]);
    let verified = events.recv().await.unwrap();
    assert_eq!(
        verified,
        PurchaseEvent::Verified {
            product_id: MONTHLY.to_string(),
            transaction_id: "txn-42".to_string(),
        }
    );
    let result = verified.result_for(MONTHLY);
    assert!(result.success);
    assert_eq!(result.transaction_id.as_deref(), Some("txn-42"));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn store_acknowledged_transactions_are_not_verified() {
    let store = Arc::new(FakeStore::ios(&[MONTHLY]));
    let backend = Arc::new(FakeBackend::new());
    let listener = listener_for(store.clone(), backend.clone());

    listener
        .handle(PurchaseUpdate {
            response_code: ResponseCode::Ok,
            results: vec![transaction(MONTHLY, "txn-restored", true)],
        })
        .await;

    assert!(backend.verified().is_empty());
    assert!(store.finished().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_deliveries_share_one_verification() {
    let store = Arc::new(FakeStore::ios(&[MONTHLY]));
    let backend = Arc::new(FakeBackend::new().verify_delay(Duration::from_millis(300)));
    let listener = listener_for(store.clone(), backend.clone());

    let update = PurchaseUpdate {
        response_code: ResponseCode::Ok,
        results: vec![transaction(MONTHLY, "txn-7", false)],
    };
    tokio::join!(listener.handle(update.clone()), listener.handle(update));

    assert_eq!(backend.verified(), vec!["txn-7".to_string()]);
    assert_eq!(store.finished().len(), 1);
}

#[tokio::test]
async fn failed_verification_can_be_retried_on_redelivery() {
    let store = Arc::new(FakeStore::ios(&[MONTHLY]));
    let backend = Arc::new(FakeBackend::new().reject_receipts());
    let listener = listener_for(store.clone(), backend.clone());
    let mut events = listener.subscribe();

    let update = PurchaseUpdate {
        response_code: ResponseCode::Ok,
        results: vec![transaction(MONTHLY, "txn-9", false)],
    };
    listener.handle(update.clone()).await;
    listener.handle(update).await;

    assert_eq!(backend.verified().len(), 2);
    assert!(store.finished().is_empty());

    let first = events.recv().await.unwrap();
    assert!(matches!(
        &first,
        PurchaseEvent::Failed {
            error: FlowError::ReceiptInvalid(_),
            redelivered: false,
            ..
        }
    ));
    assert!(first.concerns(MONTHLY));

    // The second failure of the same transaction belongs to the earlier purchase
    let second = events.recv().await.unwrap();
    match &second {
        PurchaseEvent::Failed {
            product_id,
            transaction_id,
            redelivered,
            ..
        } => {
            assert_eq!(product_id.as_deref(), Some(MONTHLY));
            assert_eq!(transaction_id.as_deref(), Some("txn-9"));
            assert!(*redelivered);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(!second.concerns(MONTHLY));

    let result = second.result_for(MONTHLY);
    assert!(!result.success);
    assert_eq!(result.transaction_id.as_deref(), Some("txn-9"));
    assert_eq!(result.error, Some(PurchaseErrorCode::PurchaseFailed));
}

#[tokio::test]
async fn store_error_codes_fail_the_purchase() {
    let store = Arc::new(FakeStore::ios(&[MONTHLY]));
    let backend = Arc::new(FakeBackend::new());
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let listener = PurchaseListener::new(store, backend.clone(), diagnostics.clone());
    let mut events = listener.subscribe();

    listener
        .handle(PurchaseUpdate {
            response_code: ResponseCode::from_raw(6),
            results: vec![],
        })
        .await;
    listener
        .handle(PurchaseUpdate {
            response_code: ResponseCode::Deferred,
            results: vec![],
        })
        .await;

    match events.recv().await.unwrap() {
        PurchaseEvent::Failed {
            error: FlowError::PurchaseFailed { code, .. },
            product_id: None,
            ..
        } => assert_eq!(code, Some(6)),
        other => panic!("unexpected event {:?}", other),
    }
    // Deferred purchases produce no event
    assert!(events.try_recv().is_err());

    let captured = diagnostics.captured.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].1.response_code, Some(6));
    assert!(backend.verified().is_empty());
}

#[test]
fn events_for_other_products_do_not_concern_a_purchase() {
    let cancelled = PurchaseEvent::Cancelled { product_id: None };
    assert!(cancelled.concerns(MONTHLY));

    let yearly_failure = PurchaseEvent::Failed {
        product_id: Some(YEARLY.to_string()),
        transaction_id: Some("txn-y".to_string()),
        redelivered: false,
        error: FlowError::ReceiptInvalid("rejected".to_string()),
    };
    assert!(!yearly_failure.concerns(MONTHLY));
    assert!(yearly_failure.concerns(YEARLY));

    let verified = PurchaseEvent::Verified {
        product_id: MONTHLY.to_string(),
        transaction_id: "txn-1".to_string(),
    };
    assert!(!verified.concerns(YEARLY));
}

#[tokio::test(start_paused = true)]
async fn stale_failing_transaction_does_not_abort_new_purchase() {
    let harness = Harness::new(
        FakeStore::ios(&[MONTHLY]).redeliver_on_purchase(transaction(MONTHLY, "txn-old", false)),
        FakeBackend::new()
            .active_from_check(Some(2))
            .reject_transaction("txn-old"),
    );

    // An earlier purchase left txn-old unacknowledged after its receipt was rejected
    harness.store.push(PurchaseUpdate {
        response_code: ResponseCode::Ok,
        results: vec![transaction(MONTHLY, "txn-old", false)],
    });
    while harness.diagnostics.codes().is_empty() {
        tokio::task::yield_now().await;
    }

    let presenter = Arc::new(ScriptedPresenter::default());
    let flow = harness.service.new_flow(presenter.clone());

    let outcome = flow
        .run(SubscriptionPlan::Monthly, complete_draft())
        .await
        .unwrap();

    assert!(matches!(outcome, FlowOutcome::Completed(_)));
    assert_eq!(
        harness.backend.verified(),
        vec![
            "txn-old".to_string(),
            "txn-old".to_string(),
            "txn-1".to_string()
        ]
    );
    assert_eq!(
        harness.store.finished(),
        vec![("txn-1".to_string(), true)]
    );
    assert!(presenter.errors().is_empty());
    assert_eq!(
        harness.diagnostics.codes(),
        vec!["RECEIPT_INVALID", "RECEIPT_INVALID"]
    );
}

#[tokio::test(start_paused = true)]
async fn failure_for_another_product_is_ignored() {
    let harness = Harness::new(
        FakeStore::ios(&[MONTHLY, YEARLY])
            .redeliver_on_purchase(transaction(YEARLY, "txn-yearly", false)),
        FakeBackend::new()
            .active_from_check(Some(2))
            .reject_transaction("txn-yearly"),
    );
    let presenter = Arc::new(ScriptedPresenter::default());
    let flow = harness.service.new_flow(presenter.clone());

    let outcome = flow
        .run(SubscriptionPlan::Monthly, complete_draft())
        .await
        .unwrap();

    assert!(matches!(outcome, FlowOutcome::Completed(_)));
    assert!(presenter.errors().is_empty());
    assert_eq!(harness.diagnostics.codes(), vec!["RECEIPT_INVALID"]);
    assert_eq!(
        harness.diagnostics.captured.lock().unwrap()[0]
            .1
            .product_id
            .as_deref(),
        Some(YEARLY)
    );
}
