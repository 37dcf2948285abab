mod whisper;
mod assemblyai;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

pub use assemblyai::AssemblyAiTranscriber;
pub use whisper::WhisperTranscriber;

/// A word paired with its offsets (seconds) inside the source audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordSpan {
    pub word: String,
    pub start_time: f64,
    pub end_time: f64,
    /// Placeholder produced when no real span was available for a word.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

impl WordSpan {
    pub fn new(word: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            word: word.into(),
            start_time,
            end_time,
            synthetic: false,
        }
    }

    pub fn placeholder(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            start_time: 0.0,
            end_time: 0.0,
            synthetic: true,
        }
    }

    /// Clamp offsets so that `0 <= start_time <= end_time` and both are finite.
    pub fn sanitized(&self) -> Self {
        let start_time = if self.start_time.is_finite() && self.start_time > 0.0 {
            self.start_time
        } else {
            0.0
        };
        let end_time = if self.end_time.is_finite() && self.end_time > start_time {
            self.end_time
        } else {
            start_time
        };
        Self {
            word: self.word.clone(),
            start_time,
            end_time,
            synthetic: self.synthetic,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub word_timestamps: Vec<WordSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    Whisper,
    #[serde(rename = "assemblyai")]
    AssemblyAI,
}

impl Default for TranscriptionProvider {
    fn default() -> Self {
        TranscriptionProvider::Whisper
    }
}

impl TranscriptionProvider {
    pub fn name(&self) -> &'static str {
        match self {
            TranscriptionProvider::Whisper => "whisper",
            TranscriptionProvider::AssemblyAI => "assemblyai",
        }
    }

    pub fn api_key_name(&self) -> &'static str {
        match self {
            TranscriptionProvider::Whisper => "OPENAI_API_KEY",
            TranscriptionProvider::AssemblyAI => "ASSEMBLYAI_API_KEY",
        }
    }
}

/// External speech-to-text capability: audio reference in, text and word spans out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_url: &str) -> Result<Transcription, AnalysisError>;
}

/// Build the transcriber selected by configuration.
pub fn transcriber_for(settings: &crate::config::TranscriptionSettings) -> anyhow::Result<Box<dyn Transcriber>> {
    let api_key = settings.resolve_api_key().with_context(|| {
        format!(
            "No transcription API key; set transcription.api_key or {}",
            settings.provider.api_key_name()
        )
    })?;
    let base_url = settings.base_url.clone();
    let timeout = std::time::Duration::from_secs(settings.timeout_secs);

    let transcriber: Box<dyn Transcriber> = match settings.provider {
        TranscriptionProvider::Whisper => Box::new(WhisperTranscriber::new(api_key, base_url, timeout)?),
        TranscriptionProvider::AssemblyAI => {
            Box::new(AssemblyAiTranscriber::new(api_key, base_url, timeout)?)
        }
    };
    Ok(transcriber)
}

/// Provider word lists come back with stray whitespace, empty tokens and, for
/// some providers, slightly out-of-order offsets.
pub(crate) fn clean_word_spans(spans: impl IntoIterator<Item = WordSpan>) -> Vec<WordSpan> {
    let mut words: Vec<WordSpan> = spans
        .into_iter()
        .map(|w| WordSpan {
            word: w.word.trim().to_string(),
            ..w
        })
        .filter(|w| !w.word.is_empty())
        .map(|w| w.sanitized())
        .collect();

    words.sort_by(|a, b| a.start_time.partial_cmp(&b.start_time).unwrap_or(std::cmp::Ordering::Equal));
    words
}
