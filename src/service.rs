//! Request-level flow around the analyzer: who is asking, which recording,
//! whether they may, then transcribe, analyze and store.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::analysis::{AnalysisResult, RecordingMetadata, SpeechAnalyzer};
use crate::error::AnalysisError;
use crate::transcription::Transcriber;

/// Analyses included per calendar month on the free plan.
pub const FREE_MONTHLY_ANALYSES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
    Business,
}

/// Analyses left this month, `None` for unlimited plans.
pub fn remaining_analyses(plan: Plan, used_this_month: u32) -> Option<u32> {
    match plan {
        Plan::Free => Some(FREE_MONTHLY_ANALYSES.saturating_sub(used_this_month)),
        Plan::Premium | Plan::Business => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: String,
    /// `None` means unlimited.
    pub quota_remaining: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,
    pub user_id: String,
    pub audio_url: String,
    pub metadata: RecordingMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnalysis {
    pub id: String,
    pub recording_id: String,
    pub analysis: AnalysisResult,
}

impl UserIdentity {
    /// Identity whose quota is derived from the subscription plan and the
    /// analyses already run this calendar month.
    pub fn on_plan(id: impl Into<String>, plan: Plan, used_this_month: u32) -> Self {
        Self {
            id: id.into(),
            quota_remaining: remaining_analyses(plan, used_this_month),
        }
    }
}

/// Resolves the signed-in user. Implementations typically look up the user's
/// [`Plan`] and monthly usage and build the identity with
/// [`UserIdentity::on_plan`].
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_user(&self) -> Option<UserIdentity>;
}

#[async_trait]
pub trait RecordingStore: Send + Sync {
    async fn find_recording(&self, recording_id: &str) -> Result<Option<Recording>>;
    async fn save_analysis(&self, recording_id: &str, analysis: AnalysisResult) -> Result<StoredAnalysis>;
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not signed in")]
    NotAuthenticated,
    #[error("recording {0} not found")]
    RecordingNotFound(String),
    #[error("recording {0} belongs to another user")]
    Forbidden(String),
    #[error("monthly analysis quota used up")]
    QuotaExceeded,
    #[error(transparent)]
    Acquisition(#[from] AnalysisError),
    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

pub struct AnalysisService {
    sessions: Arc<dyn SessionProvider>,
    store: Arc<dyn RecordingStore>,
    transcriber: Arc<dyn Transcriber>,
    analyzer: Arc<SpeechAnalyzer>,
}

impl AnalysisService {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        store: Arc<dyn RecordingStore>,
        transcriber: Arc<dyn Transcriber>,
        analyzer: Arc<SpeechAnalyzer>,
    ) -> Self {
        Self {
            sessions,
            store,
            transcriber,
            analyzer,
        }
    }

    pub async fn analyze_recording(&self, recording_id: &str) -> Result<StoredAnalysis, ServiceError> {
        let user = self
            .sessions
            .current_user()
            .await
            .ok_or(ServiceError::NotAuthenticated)?;

        let recording = self
            .store
            .find_recording(recording_id)
            .await
            .map_err(ServiceError::Storage)?
            .ok_or_else(|| ServiceError::RecordingNotFound(recording_id.to_string()))?;

        if recording.user_id != user.id {
            return Err(ServiceError::Forbidden(recording_id.to_string()));
        }
        if user.quota_remaining == Some(0) {
            return Err(ServiceError::QuotaExceeded);
        }

        info!("Transcribing recording {}", recording.id);
        let transcription = self
            .transcriber
            .transcribe(&recording.audio_url)
            .await
            .map_err(|e| {
                error!("Transcription of {} failed: {}", recording.id, e);
                ServiceError::Acquisition(e)
            })?;
        info!(
            "Transcribed {} ({} chars, {} timed words)",
            recording.id,
            transcription.text.len(),
            transcription.word_timestamps.len()
        );

        let analysis = self
            .analyzer
            .analyze(&transcription.text, &transcription.word_timestamps, &recording.metadata)
            .await;

        self.store
            .save_analysis(&recording.id, analysis)
            .await
            .map_err(ServiceError::Storage)
    }
}

/// Recordings and analyses kept in process memory.
#[derive(Default)]
pub struct MemoryRecordingStore {
    recordings: RwLock<HashMap<String, Recording>>,
    analyses: RwLock<Vec<StoredAnalysis>>,
}

impl MemoryRecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a recording under a fresh id and return it.
    pub async fn add_recording(
        &self,
        user_id: &str,
        audio_url: &str,
        metadata: RecordingMetadata,
    ) -> Recording {
        let recording = Recording {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            audio_url: audio_url.to_string(),
            metadata,
        };
        self.recordings
            .write()
            .await
            .insert(recording.id.clone(), recording.clone());
        recording
    }

    pub async fn analyses_for(&self, recording_id: &str) -> Vec<StoredAnalysis> {
        self.analyses
            .read()
            .await
            .iter()
            .filter(|a| a.recording_id == recording_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RecordingStore for MemoryRecordingStore {
    async fn find_recording(&self, recording_id: &str) -> Result<Option<Recording>> {
        Ok(self.recordings.read().await.get(recording_id).cloned())
    }

    async fn save_analysis(&self, recording_id: &str, analysis: AnalysisResult) -> Result<StoredAnalysis> {
        let stored = StoredAnalysis {
            id: Uuid::new_v4().to_string(),
            recording_id: recording_id.to_string(),
            analysis,
        };
        self.analyses.write().await.push(stored.clone());
        Ok(stored)
    }
}
