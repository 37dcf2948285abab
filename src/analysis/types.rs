use serde::{Deserialize, Serialize};

use crate::transcription::WordSpan;

/// Recording context passed along with the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    /// Seconds.
    pub duration: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub target_audience: String,
}

impl RecordingMetadata {
    pub fn new(duration: f64, kind: impl Into<String>, target_audience: impl Into<String>) -> Self {
        Self {
            duration,
            kind: kind.into(),
            target_audience: target_audience.into(),
        }
    }
}

/// The normalized analysis record. Every field is always present and every
/// number finite, whatever the upstream model produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub transcription: String,
    pub word_analysis: WordAnalysis,
    pub sentence_analysis: SentenceAnalysis,
    pub linguistic_performance: LinguisticPerformance,
    pub comprehensive_feedback: ComprehensiveFeedback,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordAnalysis {
    pub total_words: u32,
    pub pronunciation_breakdown: PronunciationBreakdown,
    pub word_timestamps: CategoryTimestamps,
    pub overall_pronunciation_score: f64,
    pub pronunciation_feedback: PronunciationFeedback,
}

/// Words grouped by pronunciation quality. A surface form appears in at most one
/// category; it may repeat within its category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PronunciationBreakdown {
    pub perfect_words: Vec<String>,
    pub minor_issue_words: Vec<String>,
    pub significant_error_words: Vec<String>,
}

impl PronunciationBreakdown {
    pub fn len(&self) -> usize {
        self.perfect_words.len() + self.minor_issue_words.len() + self.significant_error_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spans aligned 1:1 with the lists in [`PronunciationBreakdown`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTimestamps {
    pub perfect_words: Vec<WordSpan>,
    pub minor_issue_words: Vec<WordSpan>,
    pub significant_error_words: Vec<WordSpan>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PronunciationFeedback {
    pub minor_issues: String,
    pub significant_errors: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceAnalysis {
    pub total_sentences: u32,
    pub structure_assessment: StructureAssessment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureAssessment {
    pub coherence_score: f64,
    pub grammatical_accuracy_score: f64,
    pub flow_rating: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinguisticPerformance {
    pub words_per_minute: f64,
    pub pause_analysis: PauseAnalysis,
    pub filler_word_analysis: FillerWordAnalysis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseAnalysis {
    pub total_pauses: u32,
    pub average_pause_duration: f64,
    pub pause_impact_feedback: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillerWordAnalysis {
    pub total_filler_words: u32,
    pub filler_word_types: Vec<String>,
    pub filler_word_feedback: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveFeedback {
    pub strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
    pub detailed_recommendations: Vec<String>,
}
