use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::text::normalize_word;
use super::types::{CategoryTimestamps, PronunciationBreakdown};
use crate::transcription::WordSpan;

/// Time-coded words waiting to be claimed by a category word.
///
/// Each surface form maps to a FIFO queue of span indices in transcript order,
/// so the second "the" in a category gets the second "the" spoken. A span is
/// handed out once; the normalized index is only consulted when the exact form
/// has nothing left.
struct SpanPool<'a> {
    spans: &'a [WordSpan],
    exact: HashMap<&'a str, VecDeque<usize>>,
    normalized: HashMap<String, VecDeque<usize>>,
    consumed: Vec<bool>,
}

impl<'a> SpanPool<'a> {
    fn new(spans: &'a [WordSpan]) -> Self {
        let mut exact: HashMap<&str, VecDeque<usize>> = HashMap::new();
        let mut normalized: HashMap<String, VecDeque<usize>> = HashMap::new();
        for (i, span) in spans.iter().enumerate() {
            exact.entry(span.word.as_str()).or_default().push_back(i);
            let key = normalize_word(&span.word);
            if !key.is_empty() {
                normalized.entry(key).or_default().push_back(i);
            }
        }
        Self {
            spans,
            exact,
            normalized,
            consumed: vec![false; spans.len()],
        }
    }

    fn claim(&mut self, word: &str) -> Option<&'a WordSpan> {
        let index = Self::pop_unconsumed(self.exact.get_mut(word), &self.consumed).or_else(|| {
            Self::pop_unconsumed(self.normalized.get_mut(&normalize_word(word)), &self.consumed)
        })?;
        self.consumed[index] = true;
        let spans = self.spans;
        Some(&spans[index])
    }

    /// Queues are shared between the two indexes, so entries already taken
    /// through the other one are skipped here.
    fn pop_unconsumed(queue: Option<&mut VecDeque<usize>>, consumed: &[bool]) -> Option<usize> {
        let queue = queue?;
        while let Some(index) = queue.pop_front() {
            if !consumed[index] {
                return Some(index);
            }
        }
        None
    }

    fn spans_for(&mut self, words: &[String]) -> Vec<WordSpan> {
        words
            .iter()
            .map(|word| match self.claim(word) {
                Some(span) => WordSpan {
                    word: word.clone(),
                    ..span.sanitized()
                },
                None => WordSpan::placeholder(word.as_str()),
            })
            .collect()
    }
}

/// Attach a span to every word of every category, in the order perfect, minor,
/// significant. The output lists line up 1:1 with the breakdown lists; words
/// with no remaining span get a synthetic `{0, 0}` placeholder.
pub fn associate_word_timestamps(
    breakdown: &PronunciationBreakdown,
    spans: &[WordSpan],
) -> CategoryTimestamps {
    let mut pool = SpanPool::new(spans);
    let timestamps = CategoryTimestamps {
        perfect_words: pool.spans_for(&breakdown.perfect_words),
        minor_issue_words: pool.spans_for(&breakdown.minor_issue_words),
        significant_error_words: pool.spans_for(&breakdown.significant_error_words),
    };

    let synthetic = [
        &timestamps.perfect_words,
        &timestamps.minor_issue_words,
        &timestamps.significant_error_words,
    ]
    .iter()
    .flat_map(|list| list.iter())
    .filter(|span| span.synthetic)
    .count();
    if synthetic > 0 {
        debug!("{} of {} category words had no timestamp", synthetic, breakdown.len());
    }

    timestamps
}
