// Route modules
pub mod auth;
pub mod commitments;
pub mod iap;
pub mod subscription;

use crate::{
    app_state::AppState,
    middleware::{jwt_auth_middleware, logging_middleware},
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .nest("/api/v1", api_v1_routes(state.clone()))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes(state: AppState) -> Router<AppState> {
    // Every purchase-flow endpoint acts on the authenticated user
    let authenticated_routes = Router::new()
        .route("/auth/me", get(auth::get_me))
        .route("/iap/verify", post(iap::verify_receipt))
        .route(
            "/users/{user_id}/subscription",
            get(subscription::get_subscription_status),
        )
        .route("/commitments", post(commitments::create_commitment))
        .layer(middleware::from_fn_with_state(state, jwt_auth_middleware));

    Router::new()
        .merge(authenticated_routes)
        .layer(middleware::from_fn(logging_middleware))
}
