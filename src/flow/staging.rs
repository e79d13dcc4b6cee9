//! Local persistence for onboarding data while a purchase is in progress.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;

use super::commitment::CommitmentDraft;
use super::error::StagingError;
use crate::models::common::SubscriptionPlan;

const STAGING_FILE: &str = "onboarding_data.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingData {
    pub selected_plan: SubscriptionPlan,
    pub commitment: CommitmentDraft,
    #[serde(with = "time::serde::rfc3339")]
    pub staged_at: OffsetDateTime,
}

impl OnboardingData {
    pub fn new(selected_plan: SubscriptionPlan, commitment: CommitmentDraft) -> Self {
        Self {
            selected_plan,
            commitment,
            staged_at: OffsetDateTime::now_utc(),
        }
    }
}

#[async_trait]
pub trait StagingStore: Send + Sync {
    async fn load(&self) -> Result<Option<OnboardingData>, StagingError>;

    async fn save(&self, data: &OnboardingData) -> Result<(), StagingError>;

    async fn clear(&self) -> Result<(), StagingError>;
}

/// Stores the staged data as a JSON file inside a directory
pub struct FileStagingStore {
    dir: PathBuf,
}

impl FileStagingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STAGING_FILE)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StagingError {
    StagingError::Io(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl StagingStore for FileStagingStore {
    async fn load(&self) -> Result<Option<OnboardingData>, StagingError> {
        let path = self.path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StagingError::Corrupt(e.to_string()))
    }

    async fn save(&self, data: &OnboardingData) -> Result<(), StagingError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let json =
            serde_json::to_vec_pretty(data).map_err(|e| StagingError::Corrupt(e.to_string()))?;

        // Write then rename so a crash never leaves a half-written file
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&path, e))?;

        debug!(path = %path.display(), "Onboarding data staged");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StagingError> {
        let path = self.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

/// In-process staging, for tests and platforms without a writable data dir
#[derive(Default)]
pub struct MemoryStagingStore {
    data: Mutex<Option<OnboardingData>>,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StagingStore for MemoryStagingStore {
    async fn load(&self) -> Result<Option<OnboardingData>, StagingError> {
        Ok(self.data.lock().await.clone())
    }

    async fn save(&self, data: &OnboardingData) -> Result<(), StagingError> {
        *self.data.lock().await = Some(data.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StagingError> {
        *self.data.lock().await = None;
        Ok(())
    }
}
