//! Coalescing projection of an untrusted model response onto [`AnalysisResult`].
//!
//! Every field is read defensively: a missing, mistyped or out-of-range value
//! becomes its default (`0`, `""`, `[]`) instead of an error. Keys are looked up
//! in snake_case (the schema the model is asked for) and in camelCase (the
//! serialized form of [`AnalysisResult`]), so normalizing an already normalized
//! record gives it back unchanged.

use std::collections::HashSet;

use serde_json::Value;

use super::rebalance::BucketRebalancer;
use super::text;
use super::types::*;
use crate::transcription::WordSpan;

/// Everything the normalizer knows besides the model's answer.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub transcript: &'a str,
    pub word_timestamps: &'a [WordSpan],
    pub metadata: &'a RecordingMetadata,
}

const WORD: &str = "word_analysis";
const BREAKDOWN: &[&str] = &["word_analysis", "pronunciation_breakdown"];
const SENTENCE: &str = "sentence_analysis";
const STRUCTURE: &str = "structure_assessment";
const PERFORMANCE: &str = "linguistic_performance";
const FEEDBACK: &str = "comprehensive_feedback";

/// Alternative keys for each pronunciation category: the model schema first,
/// then the normalized field name.
const PERFECT_KEYS: &[&str] = &["perfect_words"];
const MINOR_KEYS: &[&str] = &["minor_issues", "minor_issue_words"];
const SIGNIFICANT_KEYS: &[&str] = &["significant_errors", "significant_error_words"];

/// Project `raw` onto the analysis shape. Word timestamps are left empty; the
/// associator fills them in.
pub fn normalize(
    raw: &Value,
    ctx: &NormalizeContext<'_>,
    rebalancer: &dyn BucketRebalancer,
) -> AnalysisResult {
    let mut breakdown = PronunciationBreakdown {
        perfect_words: category_words(raw, PERFECT_KEYS),
        minor_issue_words: category_words(raw, MINOR_KEYS),
        significant_error_words: category_words(raw, SIGNIFICANT_KEYS),
    };
    enforce_exclusive(&mut breakdown);
    rebalancer.rebalance(&mut breakdown);

    let reported_words = count_at(raw, &[WORD, "total_words"]).filter(|n| *n > 0);
    let total_words = reported_words
        .unwrap_or_else(|| text::count_words(ctx.transcript).min(u32::MAX as usize) as u32)
        .max(breakdown.len().min(u32::MAX as usize) as u32);

    let words_per_minute = number_at(raw, &[PERFORMANCE, "words_per_minute"])
        .filter(|wpm| *wpm > 0.0)
        .unwrap_or_else(|| {
            text::words_per_minute(total_words, ctx.word_timestamps, ctx.metadata.duration)
        });

    AnalysisResult {
        transcription: ctx.transcript.to_string(),
        word_analysis: WordAnalysis {
            total_words,
            pronunciation_feedback: PronunciationFeedback {
                minor_issues: category_feedback(raw, MINOR_KEYS),
                significant_errors: category_feedback(raw, SIGNIFICANT_KEYS),
            },
            pronunciation_breakdown: breakdown,
            word_timestamps: CategoryTimestamps::default(),
            overall_pronunciation_score: score_at(raw, &[WORD, "overall_pronunciation_score"]),
        },
        sentence_analysis: SentenceAnalysis {
            total_sentences: count_at(raw, &[SENTENCE, "total_sentences"]).unwrap_or(0),
            structure_assessment: StructureAssessment {
                coherence_score: score_at(raw, &[SENTENCE, STRUCTURE, "coherence_score"]),
                grammatical_accuracy_score: score_at(
                    raw,
                    &[SENTENCE, STRUCTURE, "grammatical_accuracy_score"],
                ),
                flow_rating: score_at(raw, &[SENTENCE, STRUCTURE, "flow_rating"]),
                feedback: text_at(raw, &[SENTENCE, STRUCTURE, "feedback"]),
            },
        },
        linguistic_performance: LinguisticPerformance {
            words_per_minute,
            pause_analysis: PauseAnalysis {
                total_pauses: count_at(raw, &[PERFORMANCE, "pause_analysis", "total_pauses"])
                    .unwrap_or(0),
                average_pause_duration: number_at(
                    raw,
                    &[PERFORMANCE, "pause_analysis", "average_pause_duration"],
                )
                .unwrap_or(0.0),
                pause_impact_feedback: text_at(
                    raw,
                    &[PERFORMANCE, "pause_analysis", "pause_impact_feedback"],
                ),
            },
            filler_word_analysis: FillerWordAnalysis {
                total_filler_words: count_at(
                    raw,
                    &[PERFORMANCE, "filler_word_analysis", "total_filler_words"],
                )
                .unwrap_or(0),
                filler_word_types: dedup(strings_at(
                    raw,
                    &[PERFORMANCE, "filler_word_analysis", "filler_word_types"],
                )),
                filler_word_feedback: text_at(
                    raw,
                    &[PERFORMANCE, "filler_word_analysis", "filler_word_feedback"],
                ),
            },
        },
        comprehensive_feedback: ComprehensiveFeedback {
            strengths: strings_at(raw, &[FEEDBACK, "strengths"]),
            improvement_areas: strings_at(raw, &[FEEDBACK, "improvement_areas"]),
            detailed_recommendations: strings_at(raw, &[FEEDBACK, "detailed_recommendations"]),
        },
    }
}

/// A surface form flagged in a more severe category is dropped from the less
/// severe ones: significant errors, then minor issues, then perfect words.
fn enforce_exclusive(breakdown: &mut PronunciationBreakdown) {
    let mut flagged: HashSet<String> = breakdown.significant_error_words.iter().cloned().collect();
    breakdown.minor_issue_words.retain(|w| !flagged.contains(w));
    flagged.extend(breakdown.minor_issue_words.iter().cloned());
    breakdown.perfect_words.retain(|w| !flagged.contains(w));
}

fn category_words(raw: &Value, keys: &[&str]) -> Vec<String> {
    let Some(breakdown) = lookup(raw, BREAKDOWN) else {
        return Vec::new();
    };
    keys.iter()
        .find_map(|key| {
            let entry = field(breakdown, key)?;
            match entry {
                Value::Array(_) => Some(string_list(entry)),
                Value::Object(_) => field(entry, "words").map(string_list),
                _ => None,
            }
        })
        .unwrap_or_default()
}

fn category_feedback(raw: &Value, keys: &[&str]) -> String {
    let from_breakdown = lookup(raw, BREAKDOWN).and_then(|breakdown| {
        keys.iter()
            .find_map(|key| lookup(breakdown, &[*key, "feedback"]).and_then(as_text))
    });
    from_breakdown
        .or_else(|| {
            lookup(raw, &[WORD, "pronunciation_feedback", keys[0]]).and_then(as_text)
        })
        .unwrap_or_default()
}

/// Look a key up as written, then under its camelCase spelling.
fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let object = value.as_object()?;
    object
        .get(key)
        .or_else(|| object.get(&to_camel_case(key)))
        .filter(|v| !v.is_null())
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| field(current, key))
}

fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Finite, non-negative number. Numeric strings such as `"85"` or `"85%"` count.
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (number.is_finite() && number >= 0.0).then_some(number)
}

fn number_at(raw: &Value, path: &[&str]) -> Option<f64> {
    lookup(raw, path).and_then(as_number)
}

fn score_at(raw: &Value, path: &[&str]) -> f64 {
    number_at(raw, path).map(|s| s.clamp(0.0, 100.0)).unwrap_or(0.0)
}

fn count_at(raw: &Value, path: &[&str]) -> Option<u32> {
    number_at(raw, path).map(|n| n.round().min(u32::MAX as f64) as u32)
}

fn as_text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn text_at(raw: &Value, path: &[&str]) -> String {
    lookup(raw, path).and_then(as_text).unwrap_or_default()
}

/// Non-empty strings of an array; anything else in it is skipped.
fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn strings_at(raw: &Value, path: &[&str]) -> Vec<String> {
    lookup(raw, path).map(string_list).unwrap_or_default()
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
