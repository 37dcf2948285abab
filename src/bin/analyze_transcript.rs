//! Run the speech analysis on a saved transcription or a remote recording.
//! Usage: analyze_transcript transcription.json --duration 95 --type presentation

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use speech_coach_lib::analysis::{RecordingMetadata, SpeechAnalyzer};
use speech_coach_lib::config::Settings;
use speech_coach_lib::transcription::{self, Transcription};

#[derive(Debug, Parser)]
#[command(name = "analyze_transcript", about = "Produce a speech coaching report")]
struct Args {
    /// Transcription JSON: {"text": ..., "wordTimestamps": [...]}
    #[arg(required_unless_present = "audio_url", conflicts_with = "audio_url")]
    transcription: Option<PathBuf>,

    /// Transcribe this audio URL with the configured provider instead.
    #[arg(long)]
    audio_url: Option<String>,

    /// Recording length in seconds.
    #[arg(long, default_value_t = 0.0)]
    duration: f64,

    #[arg(long = "type", default_value = "general")]
    kind: String,

    #[arg(long, default_value = "general audience")]
    audience: String,

    /// Config file; defaults to <config dir>/speech-coach/config.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().or_else(Settings::default_path);
    let settings = match &config_path {
        Some(path) => Settings::load(&path.to_string_lossy())
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Settings::default(),
    };

    let transcription = load_transcription(&args, &settings).await?;
    info!(
        "Loaded transcript with {} words ({} timed)",
        transcription.text.split_whitespace().count(),
        transcription.word_timestamps.len()
    );

    let analyzer = SpeechAnalyzer::from_settings(&settings)?;
    let metadata = RecordingMetadata::new(args.duration, args.kind, args.audience);

    let start = std::time::Instant::now();
    let result = analyzer
        .analyze(&transcription.text, &transcription.word_timestamps, &metadata)
        .await;
    info!("Analysis finished in {:.1}s", start.elapsed().as_secs_f64());

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn load_transcription(args: &Args, settings: &Settings) -> Result<Transcription> {
    if let Some(url) = &args.audio_url {
        let transcriber = transcription::transcriber_for(&settings.transcription)?;
        return Ok(transcriber.transcribe(url).await?);
    }

    let path = args
        .transcription
        .as_ref()
        .context("Either a transcription file or --audio-url is required")?;
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}
