//! Client for the COMMIT API endpoints the purchase flow depends on.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::error::BackendError;
use crate::models::{
    auth::MeData,
    commitment::{CreateCommitmentRequest, CreateCommitmentResponse},
    common::{ErrorResponse, SubscriptionStatus, SuccessResponse},
    iap::{VerifyReceiptRequest, VerifyReceiptResponse},
    subscription::SubscriptionStatusData,
};

/// Error code some serverless runtimes return for failed workers
const WORKER_ERROR_CODE: &str = "WORKER_ERROR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitmentCreated {
    pub commitment_id: Uuid,
    pub book_id: Uuid,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Id of the signed-in user
    async fn current_user_id(&self) -> Result<Uuid, BackendError>;

    async fn subscription_status(&self, user_id: Uuid)
        -> Result<SubscriptionStatus, BackendError>;

    /// Ask the server to validate a store receipt; `Ok` means the receipt was accepted
    async fn verify_receipt(&self, request: &VerifyReceiptRequest) -> Result<(), BackendError>;

    async fn create_commitment(
        &self,
        request: &CreateCommitmentRequest,
    ) -> Result<CommitmentCreated, BackendError>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    access_token: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: RwLock::new(None),
        }
    }

    /// Install the session's bearer token
    pub async fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write().await = Some(token.into());
    }

    pub async fn clear_access_token(&self) {
        *self.access_token.write().await = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn bearer(&self) -> Result<String, BackendError> {
        self.access_token
            .read()
            .await
            .as_ref()
            .map(|token| format!("Bearer {}", token))
            .ok_or(BackendError::Unauthorized)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let request = request.header("Authorization", self.bearer().await?);
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| BackendError::Decode(e.to_string()));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }

        if status.is_server_error() {
            debug!(status = status.as_u16(), "Server-side worker failure");
            return Err(BackendError::Worker {
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) if body.error.code == WORKER_ERROR_CODE => Err(BackendError::Worker {
                status: status.as_u16(),
            }),
            Ok(body) => Err(BackendError::Rejected {
                status: status.as_u16(),
                code: body.error.code,
                message: body.error.message,
            }),
            Err(_) => Err(BackendError::Decode(format!(
                "HTTP {} with unrecognized body: {}",
                status.as_u16(),
                text
            ))),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip(self))]
    async fn current_user_id(&self) -> Result<Uuid, BackendError> {
        let body: SuccessResponse<MeData> =
            self.send(self.client.get(self.url("/auth/me"))).await?;
        Ok(body.data.user_id)
    }

    #[instrument(skip(self))]
    async fn subscription_status(
        &self,
        user_id: Uuid,
    ) -> Result<SubscriptionStatus, BackendError> {
        let url = self.url(&format!("/users/{}/subscription", user_id));
        let body: SuccessResponse<SubscriptionStatusData> =
            self.send(self.client.get(url)).await?;
        Ok(body.data.subscription_status)
    }

    #[instrument(skip(self, request), fields(transaction_id = %request.transaction_id))]
    async fn verify_receipt(&self, request: &VerifyReceiptRequest) -> Result<(), BackendError> {
        let body: VerifyReceiptResponse = self
            .send(self.client.post(self.url("/iap/verify")).json(request))
            .await?;

        if body.success {
            Ok(())
        } else {
            Err(BackendError::Rejected {
                status: StatusCode::OK.as_u16(),
                code: "INVALID_RECEIPT".to_string(),
                message: "Receipt verification reported failure".to_string(),
            })
        }
    }

    #[instrument(skip(self, request))]
    async fn create_commitment(
        &self,
        request: &CreateCommitmentRequest,
    ) -> Result<CommitmentCreated, BackendError> {
        let body: CreateCommitmentResponse = self
            .send(self.client.post(self.url("/commitments")).json(request))
            .await?;

        Ok(CommitmentCreated {
            commitment_id: body.commitment_id,
            book_id: body.book_id,
        })
    }
}
