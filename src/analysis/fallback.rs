//! Locally computed analysis used when the model is skipped or unusable.

use super::text;
use super::types::*;
use crate::transcription::WordSpan;

/// Why the model's judgement is missing from a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The transcript had fewer than `min_words` words; the model was not called.
    TooShort { min_words: usize },
    /// Both model attempts failed.
    ModelUnavailable,
}

impl FallbackReason {
    fn explanation(&self) -> String {
        match self {
            FallbackReason::TooShort { min_words } => format!(
                "Insufficient data: the recording contains fewer than {} words.",
                min_words
            ),
            FallbackReason::ModelUnavailable => {
                "Detailed analysis is unavailable: the speech could not be evaluated.".to_string()
            }
        }
    }

    fn recommendation(&self) -> &'static str {
        match self {
            FallbackReason::TooShort { .. } => {
                "Record a longer sample (at least a minute of continuous speech) and try again."
            }
            FallbackReason::ModelUnavailable => {
                "The analysis service could not be reached. Run the analysis again later for detailed feedback."
            }
        }
    }
}

/// Build a degraded but schema-complete result from the transcript alone.
///
/// Counts (words, sentences, fillers, pauses, WPM) are real. Scores are 0, the
/// pronunciation categories are empty and every feedback string says the value
/// could not be determined.
pub fn fallback_analysis(
    transcript: &str,
    word_timestamps: &[WordSpan],
    metadata: &RecordingMetadata,
    reason: FallbackReason,
) -> AnalysisResult {
    let explanation = reason.explanation();
    let undetermined = |what: &str| format!("{} {} could not be determined.", explanation, what);

    let total_words = to_u32(text::count_words(transcript));
    let fillers = text::filler_stats(transcript);
    let pauses = text::pause_stats(word_timestamps);

    AnalysisResult {
        transcription: transcript.to_string(),
        word_analysis: WordAnalysis {
            total_words,
            pronunciation_breakdown: PronunciationBreakdown::default(),
            word_timestamps: CategoryTimestamps::default(),
            overall_pronunciation_score: 0.0,
            pronunciation_feedback: PronunciationFeedback {
                minor_issues: undetermined("Minor pronunciation issues"),
                significant_errors: undetermined("Significant pronunciation errors"),
            },
        },
        sentence_analysis: SentenceAnalysis {
            total_sentences: to_u32(text::count_sentences(transcript)),
            structure_assessment: StructureAssessment {
                coherence_score: 0.0,
                grammatical_accuracy_score: 0.0,
                flow_rating: 0.0,
                feedback: undetermined("Sentence structure"),
            },
        },
        linguistic_performance: LinguisticPerformance {
            words_per_minute: text::words_per_minute(
                total_words,
                word_timestamps,
                metadata.duration,
            ),
            pause_analysis: PauseAnalysis {
                total_pauses: to_u32(pauses.count),
                average_pause_duration: (pauses.average_secs * 100.0).round() / 100.0,
                pause_impact_feedback: undetermined("The impact of pauses"),
            },
            filler_word_analysis: FillerWordAnalysis {
                total_filler_words: to_u32(fillers.total),
                filler_word_types: fillers.types,
                filler_word_feedback: undetermined("The impact of filler words"),
            },
        },
        comprehensive_feedback: ComprehensiveFeedback {
            strengths: vec![undetermined("Strengths")],
            improvement_areas: vec![undetermined("Improvement areas")],
            detailed_recommendations: vec![reason.recommendation().to_string()],
        },
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(duration: f64) -> RecordingMetadata {
        RecordingMetadata::new(duration, "interview", "recruiters")
    }

    #[test]
    fn short_transcript_gets_local_counts_and_zero_scores() {
        let result = fallback_analysis(
            "Hi, um, I am Sam.",
            &[],
            &metadata(3.0),
            FallbackReason::TooShort { min_words: 10 },
        );

        assert_eq!(result.word_analysis.total_words, 5);
        assert_eq!(result.sentence_analysis.total_sentences, 1);
        assert_eq!(result.word_analysis.overall_pronunciation_score, 0.0);
        assert_eq!(result.sentence_analysis.structure_assessment.coherence_score, 0.0);
        assert_eq!(result.linguistic_performance.words_per_minute, 100.0);
        assert_eq!(result.linguistic_performance.filler_word_analysis.total_filler_words, 1);
        assert_eq!(result.linguistic_performance.filler_word_analysis.filler_word_types, vec!["um"]);
        assert!(result.word_analysis.pronunciation_breakdown.is_empty());
        assert!(result
            .sentence_analysis
            .structure_assessment
            .feedback
            .contains("fewer than 10 words"));
    }

    #[test]
    fn pauses_come_from_timestamps() {
        let spans = vec![
            WordSpan::new("one", 0.0, 0.3),
            WordSpan::new("two", 1.0, 1.3),
            WordSpan::new("three", 1.4, 1.8),
        ];
        let result = fallback_analysis("one two three", &spans, &metadata(0.0), FallbackReason::ModelUnavailable);
        let pauses = &result.linguistic_performance.pause_analysis;
        assert_eq!(pauses.total_pauses, 1);
        assert_eq!(pauses.average_pause_duration, 0.7);
        // 3 words over 1.8 s
        assert_eq!(result.linguistic_performance.words_per_minute, 100.0);
    }

    #[test]
    fn recommendation_follows_the_reason() {
        let short = fallback_analysis("Too short.", &[], &metadata(2.0), FallbackReason::TooShort { min_words: 10 });
        assert!(short.comprehensive_feedback.detailed_recommendations[0].contains("longer sample"));

        let outage = fallback_analysis(
            "A perfectly long transcript that simply hit a model outage during analysis today.",
            &[],
            &metadata(20.0),
            FallbackReason::ModelUnavailable,
        );
        let advice = &outage.comprehensive_feedback.detailed_recommendations;
        assert_eq!(advice.len(), 1);
        assert!(!advice[0].contains("longer sample"));
        assert!(advice[0].contains("again later"));
    }

    #[test]
    fn fallback_is_deterministic_and_labelled() {
        let a = fallback_analysis("", &[], &metadata(0.0), FallbackReason::ModelUnavailable);
        let b = fallback_analysis("", &[], &metadata(0.0), FallbackReason::ModelUnavailable);
        assert_eq!(a, b);
        assert_eq!(a.word_analysis.total_words, 0);
        assert_eq!(a.linguistic_performance.words_per_minute, 0.0);
        for feedback in [
            &a.word_analysis.pronunciation_feedback.minor_issues,
            &a.sentence_analysis.structure_assessment.feedback,
            &a.linguistic_performance.pause_analysis.pause_impact_feedback,
            &a.linguistic_performance.filler_word_analysis.filler_word_feedback,
        ] {
            assert!(feedback.ends_with("could not be determined."), "{feedback}");
        }
    }
}
