mod common;

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use common::{model_answer, transient, ScriptedCompleter, TRANSCRIPT};
use speech_coach_lib::analysis::{KeepBreakdown, RecordingMetadata, SpeechAnalyzer};
use speech_coach_lib::{AnalysisError, WordSpan};

fn metadata() -> RecordingMetadata {
    RecordingMetadata::new(60.0, "presentation", "colleagues")
}

fn spans() -> Vec<WordSpan> {
    TRANSCRIPT
        .split_whitespace()
        .enumerate()
        .map(|(i, w)| WordSpan::new(w, i as f64 * 0.5, i as f64 * 0.5 + 0.4))
        .collect()
}

fn analyzer(completer: &Arc<ScriptedCompleter>) -> SpeechAnalyzer {
    SpeechAnalyzer::new(completer.clone())
}

#[tokio::test]
async fn well_formed_answer_is_normalized_and_timed() -> Result<()> {
    let completer = Arc::new(ScriptedCompleter::new(vec![Ok(model_answer().to_string())]));
    let result = analyzer(&completer).analyze(TRANSCRIPT, &spans(), &metadata()).await;

    assert_eq!(completer.requests().len(), 1);
    assert_eq!(result.transcription, TRANSCRIPT);
    assert_eq!(result.word_analysis.total_words, 15);
    assert_eq!(result.word_analysis.overall_pronunciation_score, 78.0);
    assert_eq!(result.word_analysis.pronunciation_feedback.significant_errors, "The r is dropped.");

    // 15 words, last span ends at 7.4 s
    assert_eq!(result.linguistic_performance.words_per_minute, (15.0_f64 / (7.4 / 60.0)).round());

    let timestamps = &result.word_analysis.word_timestamps;
    assert_eq!(timestamps.perfect_words.len(), 11);
    assert_eq!(timestamps.minor_issue_words.len(), 3);
    assert_eq!(timestamps.significant_error_words, vec![WordSpan::new("quarter.", 7.0, 7.4)]);
    assert!(timestamps.perfect_words.iter().all(|s| !s.synthetic));

    let json = serde_json::to_value(&result)?;
    assert!(json["wordAnalysis"]["pronunciationBreakdown"]["perfectWords"].is_array());
    assert!(json["linguisticPerformance"]["pauseAnalysis"]["averagePauseDuration"].is_number());
    Ok(())
}

#[tokio::test]
async fn fenced_answer_parses_like_bare_json() {
    let fenced = format!("Here is the analysis:\n```json\n{}\n```", model_answer());
    let bare_completer = Arc::new(ScriptedCompleter::new(vec![Ok(model_answer().to_string())]));
    let fenced_completer = Arc::new(ScriptedCompleter::new(vec![Ok(fenced)]));

    let bare = analyzer(&bare_completer).analyze(TRANSCRIPT, &spans(), &metadata()).await;
    let wrapped = analyzer(&fenced_completer).analyze(TRANSCRIPT, &spans(), &metadata()).await;
    assert_eq!(bare, wrapped);
    assert_eq!(fenced_completer.requests().len(), 1);
}

#[tokio::test]
async fn short_transcript_never_reaches_the_model() {
    let completer = Arc::new(ScriptedCompleter::new(vec![Ok(model_answer().to_string())]));
    let result = analyzer(&completer)
        .analyze("Hello there, nice to meet", &[], &metadata())
        .await;

    assert!(completer.requests().is_empty());
    assert_eq!(result.word_analysis.total_words, 5);
    assert_eq!(result.word_analysis.overall_pronunciation_score, 0.0);
    assert_eq!(result.sentence_analysis.structure_assessment.grammatical_accuracy_score, 0.0);
    assert_eq!(result.linguistic_performance.words_per_minute, 5.0);
}

#[tokio::test]
async fn prose_then_json_succeeds_on_strict_retry() {
    let completer = Arc::new(ScriptedCompleter::new(vec![
        Ok("I'd be happy to help! The speaker sounds confident overall.".to_string()),
        Ok(model_answer().to_string()),
    ]));
    let result = analyzer(&completer).analyze(TRANSCRIPT, &spans(), &metadata()).await;

    let requests = completer.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].user_prompt.contains("Reply with the JSON object only"));
    assert!(requests[1].user_prompt.contains("Reply with the JSON object only"));
    assert!(requests[1].user_prompt.starts_with(&requests[0].user_prompt));
    assert_eq!(result.word_analysis.overall_pronunciation_score, 78.0);
}

#[tokio::test]
async fn transient_failure_is_retried_once() {
    let completer = Arc::new(ScriptedCompleter::new(vec![
        Err(transient("timed out")),
        Ok(model_answer().to_string()),
    ]));
    let result = analyzer(&completer).analyze(TRANSCRIPT, &spans(), &metadata()).await;

    assert_eq!(completer.requests().len(), 2);
    assert_eq!(result.sentence_analysis.total_sentences, 2);
}

#[tokio::test]
async fn any_completer_error_gets_the_retry() {
    let completer = Arc::new(ScriptedCompleter::new(vec![
        Err(AnalysisError::Acquisition {
            provider: "custom",
            message: "gateway refused the request".to_string(),
        }),
        Ok(model_answer().to_string()),
    ]));
    let result = analyzer(&completer).analyze(TRANSCRIPT, &spans(), &metadata()).await;

    let requests = completer.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].user_prompt.contains("Reply with the JSON object only"));
    assert_eq!(result.word_analysis.overall_pronunciation_score, 78.0);
}

#[tokio::test]
async fn two_failures_give_a_deterministic_fallback() {
    let script = || {
        vec![
            Err(transient("connection failed")),
            Ok(r#"{"unexpected": true}"#.to_string()),
            Ok(model_answer().to_string()),
        ]
    };
    let first = Arc::new(ScriptedCompleter::new(script()));
    let second = Arc::new(ScriptedCompleter::new(script()));

    let a = analyzer(&first).analyze(TRANSCRIPT, &spans(), &metadata()).await;
    let b = analyzer(&second).analyze(TRANSCRIPT, &spans(), &metadata()).await;

    // Exactly one retry: the third reply is never requested.
    assert_eq!(first.requests().len(), 2);
    assert_eq!(a, b);
    assert_eq!(a.word_analysis.total_words, 15);
    assert_eq!(a.sentence_analysis.total_sentences, 2);
    assert_eq!(a.word_analysis.overall_pronunciation_score, 0.0);
    assert!(a.word_analysis.pronunciation_breakdown.is_empty());
    assert!(a
        .sentence_analysis
        .structure_assessment
        .feedback
        .contains("could not be determined"));
}

#[tokio::test]
async fn all_perfect_answer_is_rebalanced() {
    let words: Vec<&str> = TRANSCRIPT.split_whitespace().collect();
    let answer = json!({
        "word_analysis": {
            "total_words": 15,
            "pronunciation_breakdown": {
                "perfect_words": {"words": words},
                "minor_issues": {"words": []},
                "significant_errors": {"words": []}
            },
            "overall_pronunciation_score": 100
        }
    });
    let completer = Arc::new(ScriptedCompleter::new(vec![Ok(answer.to_string())]));
    let result = analyzer(&completer).analyze(TRANSCRIPT, &spans(), &metadata()).await;

    let breakdown = &result.word_analysis.pronunciation_breakdown;
    assert!(!breakdown.minor_issue_words.is_empty());
    assert!(!breakdown.significant_error_words.is_empty());
    assert_eq!(breakdown.len(), 15);

    // Every word was spoken exactly once, so every category word keeps a real span.
    let timestamps = &result.word_analysis.word_timestamps;
    assert!(timestamps
        .perfect_words
        .iter()
        .chain(&timestamps.minor_issue_words)
        .chain(&timestamps.significant_error_words)
        .all(|s| !s.synthetic));
}

#[tokio::test]
async fn rebalancing_can_be_switched_off() {
    let words: Vec<&str> = TRANSCRIPT.split_whitespace().collect();
    let answer = json!({
        "word_analysis": {
            "pronunciation_breakdown": {
                "perfect_words": {"words": words}
            }
        }
    });
    let completer = Arc::new(ScriptedCompleter::new(vec![Ok(answer.to_string())]));
    let result = SpeechAnalyzer::new(completer.clone())
        .with_rebalancer(KeepBreakdown)
        .analyze(TRANSCRIPT, &[], &metadata())
        .await;

    let breakdown = &result.word_analysis.pronunciation_breakdown;
    assert_eq!(breakdown.perfect_words.len(), 15);
    assert!(breakdown.minor_issue_words.is_empty());
    // No timestamps: every span is a placeholder, and WPM comes from the duration.
    assert!(result.word_analysis.word_timestamps.perfect_words.iter().all(|s| s.synthetic));
    assert_eq!(result.linguistic_performance.words_per_minute, 15.0);
}
