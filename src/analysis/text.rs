//! Transcript statistics that can be computed without the model.

use crate::transcription::WordSpan;

/// Disfluency tokens counted as filler words.
const FILLER_WORDS: &[&str] = &[
    "um", "uh", "er", "erm", "ah", "hmm", "hm", "mhm", "like",
];

/// Two-word fillers, matched on consecutive normalized tokens.
const FILLER_PHRASES: &[(&str, &str)] = &[("you", "know"), ("i", "mean")];

/// Inter-word gaps at least this long count as a pause.
pub const PAUSE_THRESHOLD_SECS: f64 = 0.4;

/// Normalize a word for comparison: lowercase, keep only alphanumeric chars.
pub fn normalize_word(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Whitespace-separated, non-empty tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Naive sentence count: split on `.`, `!`, `?` and keep pieces with any word in them.
pub fn count_sentences(text: &str) -> usize {
    text.split(&['.', '!', '?'][..])
        .filter(|s| !s.trim().is_empty())
        .count()
}

pub fn is_filler_word(word: &str) -> bool {
    FILLER_WORDS.contains(&normalize_word(word).as_str())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillerStats {
    pub total: usize,
    /// Distinct filler forms in order of first use.
    pub types: Vec<String>,
}

impl FillerStats {
    fn record(&mut self, form: String) {
        self.total += 1;
        if !self.types.contains(&form) {
            self.types.push(form);
        }
    }
}

pub fn filler_stats(text: &str) -> FillerStats {
    let tokens: Vec<String> = text.split_whitespace().map(normalize_word).collect();
    let mut stats = FillerStats::default();

    let mut i = 0;
    while i < tokens.len() {
        if let Some(next) = tokens.get(i + 1) {
            if FILLER_PHRASES.iter().any(|(a, b)| tokens[i] == *a && next == b) {
                stats.record(format!("{} {}", tokens[i], next));
                i += 2;
                continue;
            }
        }
        if FILLER_WORDS.contains(&tokens[i].as_str()) {
            stats.record(tokens[i].clone());
        }
        i += 1;
    }

    stats
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PauseStats {
    pub count: usize,
    pub average_secs: f64,
}

/// Pauses between consecutive spans. Overlapping or out-of-order spans produce
/// negative gaps and are simply not counted.
pub fn pause_stats(spans: &[WordSpan]) -> PauseStats {
    let gaps: Vec<f64> = spans
        .windows(2)
        .map(|pair| pair[1].start_time - pair[0].end_time)
        .filter(|gap| gap.is_finite() && *gap >= PAUSE_THRESHOLD_SECS)
        .collect();

    if gaps.is_empty() {
        return PauseStats::default();
    }

    PauseStats {
        count: gaps.len(),
        average_secs: gaps.iter().sum::<f64>() / gaps.len() as f64,
    }
}

/// Speaking time in minutes: the latest span end when timestamps exist, otherwise
/// the recording duration. `None` when neither gives a positive value.
pub fn speaking_minutes(spans: &[WordSpan], duration_secs: f64) -> Option<f64> {
    let from_spans = spans
        .iter()
        .map(|s| s.end_time)
        .filter(|t| t.is_finite())
        .fold(0.0, f64::max);

    let seconds = if from_spans > 0.0 { from_spans } else { duration_secs };
    (seconds.is_finite() && seconds > 0.0).then(|| seconds / 60.0)
}

/// `round(words / minutes)`, or 0 when the speaking time is unknown.
pub fn words_per_minute(total_words: u32, spans: &[WordSpan], duration_secs: f64) -> f64 {
    match speaking_minutes(spans, duration_secs) {
        Some(minutes) if total_words > 0 => (total_words as f64 / minutes).round(),
        _ => 0.0,
    }
}
