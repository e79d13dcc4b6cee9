//! Wiring a purchase service from configuration.

use std::sync::Arc;
use std::time::Duration;

use commit_app::flow::{
    FileStagingStore, FlowSettings, OnboardingData, PollPolicy, PurchaseService, StagingStore,
};
use commit_app::models::common::SubscriptionPlan;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{complete_draft, FakeStore, RecordingDiagnostics, ScriptedPresenter, MONTHLY};

#[tokio::test]
async fn settings_choose_api_and_staging_location() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .and(header("authorization", "Bearer session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "userId": user_id }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/users/{}/subscription", user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "subscriptionStatus": "inactive" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let staging_dir = std::env::temp_dir().join(format!("commit-service-{}", Uuid::new_v4()));
    FileStagingStore::new(&staging_dir)
        .save(&OnboardingData::new(SubscriptionPlan::Monthly, complete_draft()))
        .await
        .unwrap();

    let settings = FlowSettings {
        api_base_url: server.uri(),
        staging_dir: staging_dir.clone(),
        poll: PollPolicy {
            interval: Duration::from_millis(10),
            max_attempts: 2,
        },
        ..FlowSettings::default()
    };
    let (service, backend) = PurchaseService::from_settings(
        settings,
        Arc::new(FakeStore::ios(&[MONTHLY])),
        Arc::new(RecordingDiagnostics::default()),
    );
    backend.set_access_token("session-token").await;

    // Staged data is found on disk, so resuming asks the API about the subscription
    let flow = service.new_flow(Arc::new(ScriptedPresenter::default()));
    assert_eq!(flow.resume().await.unwrap(), None);

    // Not subscribed yet, so the onboarding data stays staged
    assert!(FileStagingStore::new(&staging_dir)
        .load()
        .await
        .unwrap()
        .is_some());

    let _ = std::fs::remove_dir_all(staging_dir);
}
