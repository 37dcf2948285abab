#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use speech_coach_lib::llm::{ChatCompleter, ChatRequest};
use speech_coach_lib::AnalysisError;

pub const TRANSCRIPT: &str =
    "Good morning everyone. Today I want to talk about our plans for the coming quarter.";

/// Replays canned completions in order and remembers every request.
#[derive(Default)]
pub struct ScriptedCompleter {
    replies: Mutex<VecDeque<Result<String, AnalysisError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedCompleter {
    pub fn new(replies: Vec<Result<String, AnalysisError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatCompleter for ScriptedCompleter {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<String, AnalysisError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(transient("script exhausted")))
    }
}

pub fn transient(message: &str) -> AnalysisError {
    AnalysisError::TransientCall {
        message: message.to_string(),
    }
}

/// A complete answer in the schema the prompt asks for.
pub fn model_answer() -> Value {
    json!({
        "word_analysis": {
            "total_words": 15,
            "pronunciation_breakdown": {
                "perfect_words": {"count": 11, "words": ["Good", "morning", "everyone.", "Today", "I", "want", "to", "talk", "about", "our", "the"]},
                "minor_issues": {"count": 3, "words": ["plans", "for", "coming"], "feedback": "Final consonants are soft."},
                "significant_errors": {"count": 1, "words": ["quarter."], "feedback": "The r is dropped."}
            },
            "overall_pronunciation_score": 78
        },
        "sentence_analysis": {
            "total_sentences": 2,
            "structure_assessment": {
                "coherence_score": 85,
                "grammatical_accuracy_score": 92,
                "flow_rating": 80,
                "feedback": "Clear and direct."
            }
        },
        "linguistic_performance": {
            "words_per_minute": 0,
            "pause_analysis": {"total_pauses": 1, "average_pause_duration": 0.8, "pause_impact_feedback": "Natural."},
            "filler_word_analysis": {"total_filler_words": 0, "filler_word_types": [], "filler_word_feedback": "None."}
        },
        "comprehensive_feedback": {
            "strengths": ["Confident opening"],
            "improvement_areas": ["Consonant endings"],
            "detailed_recommendations": ["Read aloud slowly, stressing final consonants"]
        }
    })
}
