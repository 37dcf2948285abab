use once_cell::sync::Lazy;
use regex::Regex;

use super::types::RecordingMetadata;

/// Transcripts made only of these characters are assumed to be English.
static BASIC_LATIN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[a-zA-Z0-9\s.,!?;:'"()\-]*$"#).expect("static regex"));

const SYSTEM_PROMPT: &str = "You are a highly critical professional speech and pronunciation analyst \
with expertise in linguistics. You must be extremely strict in your assessment of pronunciation, \
even for native speakers.";

const RESPONSE_SCHEMA: &str = r#"{
  "word_analysis": {
    "total_words": number,
    "pronunciation_breakdown": {
      "perfect_words": { "count": number, "words": string[] },
      "minor_issues": { "count": number, "words": string[], "feedback": string },
      "significant_errors": { "count": number, "words": string[], "feedback": string }
    },
    "overall_pronunciation_score": number
  },
  "sentence_analysis": {
    "total_sentences": number,
    "structure_assessment": {
      "coherence_score": number,
      "grammatical_accuracy_score": number,
      "flow_rating": number,
      "feedback": string
    }
  },
  "linguistic_performance": {
    "words_per_minute": number,
    "pause_analysis": {
      "total_pauses": number,
      "average_pause_duration": number,
      "pause_impact_feedback": string
    },
    "filler_word_analysis": {
      "total_filler_words": number,
      "filler_word_types": string[],
      "filler_word_feedback": string
    }
  },
  "comprehensive_feedback": {
    "strengths": string[],
    "improvement_areas": string[],
    "detailed_recommendations": string[]
  }
}"#;

const JSON_ONLY_DIRECTIVE: &str = "IMPORTANT: your previous answer could not be read. Reply with the JSON \
object only. Do not add any explanation, markdown, or code fences. The first character of your reply \
must be { and the last character must be }.";

/// How insistent the prompt is about the output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStrictness {
    Standard,
    /// Used for the retry after an unreadable first answer.
    JsonOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPrompt {
    pub system: String,
    pub user: String,
}

/// Render the analysis request. Pure: identical inputs give identical prompts.
pub fn build_prompt(
    transcript: &str,
    metadata: &RecordingMetadata,
    strictness: PromptStrictness,
) -> AnalysisPrompt {
    let language_note = if BASIC_LATIN_TEXT.is_match(transcript) {
        ""
    } else {
        "The transcript may not be in English. Translate it to English first, then analyze the \
translated content, keeping pronunciation word lists in the original language.\n\n"
    };

    let mut user = format!(
        r#"Advanced Linguistic Speech Analysis Request

{language_note}Transcript to analyze (verbatim): "{transcript}"

Speech Context:
- Duration: {duration} seconds
- Speech Type: {kind}
- Target Audience: {audience}

I. COUNTING METHODOLOGY (be exact and consistent):
- Total Words: split the transcript on whitespace and count the non-empty tokens.
- Total Sentences: split the transcript on periods, question marks and exclamation points and count the non-empty pieces.

II. WORD-LEVEL PRONUNCIATION ASSESSMENT:
- Put every word of the transcript in exactly one category, using its exact spelling from the transcript.
- perfect_words: words with flawless pronunciation.
- minor_issues: words with any slight deviation (stress, vowel quality, etc.).
- significant_errors: words that clearly deviate from standard pronunciation.
- Do not put all words in perfect_words; a useful report flags the weakest words.

III. SENTENCE-LEVEL ANALYSIS: coherence, grammatical accuracy and flow, each scored 0-100.

IV. LINGUISTIC PERFORMANCE:
- Speaking rate in words per minute = (total words / duration in seconds) * 60.
- Pause frequency and average pause duration in seconds.
- Filler word usage (um, uh, like, you know, ...).

V. FEEDBACK: concrete strengths, improvement areas and detailed recommendations.

Return your analysis ONLY as a valid JSON object with this exact structure:
{schema}

Return ONLY the JSON object with no additional text before or after."#,
        language_note = language_note,
        transcript = transcript,
        duration = format_duration(metadata.duration),
        kind = metadata.kind,
        audience = metadata.target_audience,
        schema = RESPONSE_SCHEMA,
    );

    if strictness == PromptStrictness::JsonOnly {
        user.push_str("\n\n");
        user.push_str(JSON_ONLY_DIRECTIVE);
    }

    AnalysisPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

fn format_duration(seconds: f64) -> String {
    if seconds.is_finite() && seconds >= 0.0 {
        format!("{}", (seconds * 10.0).round() / 10.0)
    } else {
        "unknown".to_string()
    }
}
