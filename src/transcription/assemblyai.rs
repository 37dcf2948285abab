use anyhow::{Result, Context};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{clean_word_spans, Transcriber, Transcription, WordSpan};
use crate::error::AnalysisError;

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    words: Option<Vec<AssemblyAIWord>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssemblyAIWord {
    text: String,
    start: u64,  // milliseconds
    end: u64,    // milliseconds
}

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com/v2";

/// Max poll time: 20 minutes (long recordings can take a while)
const MAX_POLL_DURATION_SECS: u64 = 1200;
/// Poll interval: 5 seconds
const POLL_INTERVAL_SECS: u64 = 5;

pub struct AssemblyAiTranscriber {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AssemblyAiTranscriber {
    pub fn new(api_key: String, base_url: Option<String>, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self { client, api_key, base_url })
    }

    async fn run(&self, audio_url: &str) -> Result<Transcription> {
        // AssemblyAI fetches the audio itself, so no upload step is needed.
        let transcript_request = serde_json::json!({
            "audio_url": audio_url,
            "punctuate": true,
            "format_text": true,
            "disfluencies": true
        });

        let create_response = self.client
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .header("content-type", "application/json")
            .json(&transcript_request)
            .send()
            .await
            .context("Failed to create AssemblyAI transcription")?;

        let create_status = create_response.status();
        if !create_status.is_success() {
            let error_body = create_response.text().await.unwrap_or_default();
            anyhow::bail!("AssemblyAI transcription request error ({}): {}", create_status, error_body);
        }

        let transcript: TranscriptResponse = create_response.json().await
            .context("Failed to parse AssemblyAI transcription response")?;

        let transcript_id = transcript.id;
        info!("AssemblyAI: transcription queued (id: {}), polling...", transcript_id);

        let poll_start = std::time::Instant::now();
        let result = loop {
            if poll_start.elapsed().as_secs() > MAX_POLL_DURATION_SECS {
                anyhow::bail!("AssemblyAI transcription timed out after {}s", MAX_POLL_DURATION_SECS);
            }

            tokio::time::sleep(std::time::Duration::from_secs(POLL_INTERVAL_SECS)).await;

            let poll_response = self.client
                .get(format!("{}/transcript/{}", self.base_url, transcript_id))
                .header("authorization", &self.api_key)
                .send()
                .await
                .context("Failed to poll AssemblyAI transcription")?;

            let poll_status = poll_response.status();
            if !poll_status.is_success() {
                let error_body = poll_response.text().await.unwrap_or_default();
                anyhow::bail!("AssemblyAI poll error ({}): {}", poll_status, error_body);
            }

            let result: TranscriptResponse = poll_response.json().await
                .context("Failed to parse AssemblyAI poll response")?;

            match result.status.as_str() {
                "completed" => {
                    info!("AssemblyAI: transcription completed in {:.0}s", poll_start.elapsed().as_secs_f64());
                    break result;
                }
                "error" => {
                    let error_msg = result.error.unwrap_or_else(|| "Unknown error".to_string());
                    anyhow::bail!("AssemblyAI transcription failed: {}", error_msg);
                }
                status => {
                    debug!("AssemblyAI status: {} ({:.0}s elapsed)", status, poll_start.elapsed().as_secs_f64());
                }
            }
        };

        Ok(into_transcription(result))
    }
}

fn into_transcription(result: TranscriptResponse) -> Transcription {
    let words = clean_word_spans(
        result.words
            .unwrap_or_default()
            .into_iter()
            .map(|w| WordSpan::new(w.text, w.start as f64 / 1000.0, w.end as f64 / 1000.0)),
    );

    info!("AssemblyAI: {} words transcribed", words.len());

    Transcription {
        text: result.text.unwrap_or_default(),
        word_timestamps: words,
    }
}

#[async_trait]
impl Transcriber for AssemblyAiTranscriber {
    async fn transcribe(&self, audio_url: &str) -> Result<Transcription, AnalysisError> {
        self.run(audio_url)
            .await
            .map_err(|e| AnalysisError::acquisition("assemblyai", format!("{:#}", e)))
    }
}
