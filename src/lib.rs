pub mod analysis;
pub mod config;
pub mod error;
pub mod llm;
pub mod service;
pub mod transcription;

pub use analysis::{AnalysisResult, RecordingMetadata, SpeechAnalyzer};
pub use error::AnalysisError;
pub use transcription::{Transcription, WordSpan};
