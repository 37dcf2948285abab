use thiserror::Error;

/// Failures the analysis pipeline distinguishes.
///
/// Only [`AnalysisError::Acquisition`] reaches callers. The other two are absorbed
/// by [`crate::analysis::SpeechAnalyzer`] and turned into a degraded result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("transcription via {provider} failed: {message}")]
    Acquisition {
        provider: &'static str,
        message: String,
    },
    #[error("model response did not match the analysis schema: {reason}")]
    SchemaMismatch { reason: String },
    #[error("model call failed: {message}")]
    TransientCall { message: String },
}

impl AnalysisError {
    pub(crate) fn acquisition(provider: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Acquisition {
            provider,
            message: err.to_string(),
        }
    }

    pub(crate) fn schema_mismatch(reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            reason: reason.into(),
        }
    }

    pub(crate) fn transient(err: impl std::fmt::Display) -> Self {
        Self::TransientCall {
            message: err.to_string(),
        }
    }
}
