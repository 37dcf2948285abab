use std::collections::HashSet;

use tracing::info;

use super::types::PronunciationBreakdown;

/// Post-processing applied to the pronunciation breakdown before timestamps are
/// attached.
pub trait BucketRebalancer: Send + Sync {
    /// Returns `true` when the breakdown was changed.
    fn rebalance(&self, breakdown: &mut PronunciationBreakdown) -> bool;
}

/// Leaves the model's breakdown untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepBreakdown;

impl BucketRebalancer for KeepBreakdown {
    fn rebalance(&self, _breakdown: &mut PronunciationBreakdown) -> bool {
        false
    }
}

/// Some models grade every word "perfect", which leaves nothing to practise.
/// When both issue lists are empty and there are more than `min_perfect_words`
/// perfect words, move `ceil(minor_share)` of them (from the front) into minor
/// issues, then `ceil(significant_share)` of what is left into significant
/// errors. Further occurrences of a moved word move with it.
#[derive(Debug, Clone, Copy)]
pub struct FlatBreakdownRebalancer {
    pub minor_share: f64,
    pub significant_share: f64,
    pub min_perfect_words: usize,
}

impl Default for FlatBreakdownRebalancer {
    fn default() -> Self {
        Self {
            minor_share: 0.2,
            significant_share: 0.05,
            min_perfect_words: 5,
        }
    }
}

impl FlatBreakdownRebalancer {
    pub fn new(minor_share: f64, significant_share: f64) -> Self {
        Self {
            minor_share,
            significant_share,
            ..Self::default()
        }
    }
}

impl BucketRebalancer for FlatBreakdownRebalancer {
    fn rebalance(&self, breakdown: &mut PronunciationBreakdown) -> bool {
        if !breakdown.minor_issue_words.is_empty()
            || !breakdown.significant_error_words.is_empty()
            || breakdown.perfect_words.len() <= self.min_perfect_words
        {
            return false;
        }

        let minor_count = share_of(breakdown.perfect_words.len(), self.minor_share);
        let minor = take_front(&mut breakdown.perfect_words, minor_count);

        let significant_count = share_of(breakdown.perfect_words.len(), self.significant_share);
        let significant = take_front(&mut breakdown.perfect_words, significant_count);

        info!(
            "Flat pronunciation breakdown: moved {} words to minor issues and {} to significant errors",
            minor.len(),
            significant.len()
        );

        breakdown.minor_issue_words.extend(minor);
        breakdown.significant_error_words.extend(significant);
        true
    }
}

fn share_of(len: usize, share: f64) -> usize {
    let share = if share.is_finite() { share.clamp(0.0, 1.0) } else { 0.0 };
    ((len as f64 * share).ceil() as usize).min(len)
}

/// Remove the first `n` words plus every later occurrence of the same forms.
fn take_front(words: &mut Vec<String>, n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    let chosen: HashSet<String> = words[..n].iter().cloned().collect();
    let (moved, kept): (Vec<String>, Vec<String>) =
        words.drain(..).partition(|w| chosen.contains(w));
    *words = kept;
    moved
}
