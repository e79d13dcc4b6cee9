//! Crash reporting for purchase flow failures.

use tracing::error;
use uuid::Uuid;

use super::error::FlowError;

/// Where in the flow an error happened, plus the identifiers known at that point
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticContext {
    pub location: &'static str,
    pub product_id: Option<String>,
    pub transaction_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub response_code: Option<i32>,
}

impl DiagnosticContext {
    pub fn at(location: &'static str) -> Self {
        Self {
            location,
            ..Default::default()
        }
    }

    pub fn product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn response_code(mut self, code: i32) -> Self {
        self.response_code = Some(code);
        self
    }
}

pub trait Diagnostics: Send + Sync {
    fn capture(&self, error: &FlowError, context: &DiagnosticContext);

    fn breadcrumb(&self, category: &str, message: &str);
}

/// Forwards captures to Sentry with the context attached as scope tags
#[derive(Debug, Clone, Copy, Default)]
pub struct SentryDiagnostics;

impl SentryDiagnostics {
    /// Send the error to Sentry, returning the event id; cancellations are dropped
    pub fn report(&self, err: &FlowError, context: &DiagnosticContext) -> Option<Uuid> {
        if err.is_silent() {
            return None;
        }

        let event_id = sentry::with_scope(
            |scope| {
                scope.set_tag("flow.location", context.location);
                scope.set_tag("flow.error_code", err.code());
                if let Some(product_id) = &context.product_id {
                    scope.set_tag("iap.product_id", product_id);
                }
                if let Some(transaction_id) = &context.transaction_id {
                    scope.set_tag("iap.transaction_id", transaction_id);
                }
                if let Some(code) = context.response_code {
                    scope.set_tag("iap.response_code", code);
                }
                if let Some(user_id) = context.user_id {
                    scope.set_user(Some(sentry::User {
                        id: Some(user_id.to_string()),
                        ..Default::default()
                    }));
                }
            },
            || sentry::capture_error(err),
        );

        error!(
            error = %err,
            location = context.location,
            product_id = context.product_id.as_deref(),
            transaction_id = context.transaction_id.as_deref(),
            sentry_event_id = %event_id,
            "Purchase flow error"
        );

        Some(event_id)
    }
}

impl Diagnostics for SentryDiagnostics {
    fn capture(&self, error: &FlowError, context: &DiagnosticContext) {
        self.report(error, context);
    }

    fn breadcrumb(&self, category: &str, message: &str) {
        sentry::add_breadcrumb(sentry::Breadcrumb {
            category: Some(category.to_string()),
            message: Some(message.to_string()),
            level: sentry::Level::Info,
            ..Default::default()
        });
    }
}
