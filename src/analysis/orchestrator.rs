use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{info, warn};

use super::fallback::{fallback_analysis, FallbackReason};
use super::normalize::{normalize, NormalizeContext};
use super::parser::parse_model_response;
use super::prompt::{build_prompt, PromptStrictness};
use super::rebalance::{BucketRebalancer, FlatBreakdownRebalancer, KeepBreakdown};
use super::text;
use super::timestamps::associate_word_timestamps;
use super::types::{AnalysisResult, RecordingMetadata};
use crate::config::Settings;
use crate::error::AnalysisError;
use crate::llm::{self, ChatCompleter, ChatRequest};
use crate::transcription::WordSpan;

#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    pub min_words: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            min_words: 10,
            temperature: 0.1,
            max_tokens: 4096,
        }
    }
}

/// The model gets one regular attempt and one retry with a stricter prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

impl Attempt {
    fn strictness(self) -> PromptStrictness {
        match self {
            Attempt::First => PromptStrictness::Standard,
            Attempt::Retry => PromptStrictness::JsonOnly,
        }
    }

    fn next(self) -> Option<Attempt> {
        match self {
            Attempt::First => Some(Attempt::Retry),
            Attempt::Retry => None,
        }
    }
}

/// Turns a transcript into a complete [`AnalysisResult`].
///
/// [`SpeechAnalyzer::analyze`] never fails: model errors and unreadable answers
/// end in a labelled fallback built from the transcript.
pub struct SpeechAnalyzer {
    completer: Arc<dyn ChatCompleter>,
    rebalancer: Box<dyn BucketRebalancer>,
    options: AnalyzerOptions,
}

impl SpeechAnalyzer {
    pub fn new(completer: Arc<dyn ChatCompleter>) -> Self {
        Self {
            completer,
            rebalancer: Box::new(FlatBreakdownRebalancer::default()),
            options: AnalyzerOptions::default(),
        }
    }

    /// Chat client, rebalancing policy and limits from configuration.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let completer = llm::chat_client_for(&settings.llm)?;
        let rebalancer: Box<dyn BucketRebalancer> = if settings.analysis.rebalance_flat_breakdown {
            Box::new(FlatBreakdownRebalancer::new(
                settings.analysis.minor_share,
                settings.analysis.significant_share,
            ))
        } else {
            Box::new(KeepBreakdown)
        };

        Ok(Self {
            completer,
            rebalancer,
            options: AnalyzerOptions {
                min_words: settings.analysis.min_words,
                temperature: settings.llm.temperature,
                max_tokens: settings.llm.max_tokens,
            },
        })
    }

    pub fn with_rebalancer(mut self, rebalancer: impl BucketRebalancer + 'static) -> Self {
        self.rebalancer = Box::new(rebalancer);
        self
    }

    pub fn with_options(mut self, options: AnalyzerOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn analyze(
        &self,
        transcript: &str,
        word_timestamps: &[WordSpan],
        metadata: &RecordingMetadata,
    ) -> AnalysisResult {
        let word_count = text::count_words(transcript);
        if word_count < self.options.min_words {
            info!(
                "Transcript has {} words (minimum {}), skipping model analysis",
                word_count, self.options.min_words
            );
            return fallback_analysis(
                transcript,
                word_timestamps,
                metadata,
                FallbackReason::TooShort {
                    min_words: self.options.min_words,
                },
            );
        }

        let mut attempt = Some(Attempt::First);
        while let Some(current) = attempt {
            match self.request_analysis(transcript, metadata, current).await {
                Ok(raw) => return self.finish(&raw, transcript, word_timestamps, metadata),
                Err(e) => {
                    warn!("Analysis attempt {:?} failed: {}", current, e);
                    attempt = current.next();
                }
            }
        }

        warn!("Model analysis unavailable, using local fallback");
        fallback_analysis(
            transcript,
            word_timestamps,
            metadata,
            FallbackReason::ModelUnavailable,
        )
    }

    async fn request_analysis(
        &self,
        transcript: &str,
        metadata: &RecordingMetadata,
        attempt: Attempt,
    ) -> Result<Value, AnalysisError> {
        let prompt = build_prompt(transcript, metadata, attempt.strictness());
        let request = ChatRequest {
            system_prompt: Some(prompt.system),
            user_prompt: prompt.user,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };

        info!("Requesting speech analysis ({:?} attempt)", attempt);
        let raw = self.completer.complete_chat(&request).await?;
        parse_model_response(&raw)
    }

    fn finish(
        &self,
        raw: &Value,
        transcript: &str,
        word_timestamps: &[WordSpan],
        metadata: &RecordingMetadata,
    ) -> AnalysisResult {
        let ctx = NormalizeContext {
            transcript,
            word_timestamps,
            metadata,
        };
        let mut result = normalize(raw, &ctx, self.rebalancer.as_ref());
        result.word_analysis.word_timestamps =
            associate_word_timestamps(&result.word_analysis.pronunciation_breakdown, word_timestamps);
        result
    }
}
