//! Transcript in, normalized coaching report out.

mod fallback;
mod normalize;
mod orchestrator;
mod parser;
mod prompt;
mod rebalance;
mod timestamps;
pub mod text;
pub mod types;

pub use fallback::{fallback_analysis, FallbackReason};
pub use normalize::{normalize, NormalizeContext};
pub use orchestrator::{AnalyzerOptions, SpeechAnalyzer};
pub use parser::parse_model_response;
pub use prompt::{build_prompt, AnalysisPrompt, PromptStrictness};
pub use rebalance::{BucketRebalancer, FlatBreakdownRebalancer, KeepBreakdown};
pub use timestamps::associate_word_timestamps;
pub use types::*;
