use anyhow::{Result, Context};
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use tracing::info;

use super::{clean_word_spans, Transcriber, Transcription, WordSpan};
use crate::error::AnalysisError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// The Whisper endpoint rejects uploads above 25MB; leave some headroom.
const MAX_UPLOAD_MB: f64 = 24.0;

// OpenAI Whisper API response structures
#[derive(Debug, Deserialize)]
struct WhisperApiResponse {
    text: String,
    #[serde(default)]
    words: Vec<WhisperApiWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperApiWord {
    word: String,
    start: f64,
    end: f64,
}

pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl WhisperTranscriber {
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

    fn transcriptions_url(&self) -> String {
        format!("{}/v1/audio/transcriptions", self.base_url)
    }

    async fn download_audio(&self, audio_url: &str) -> Result<Vec<u8>> {
        info!("Fetching audio from {}", audio_url);
        let response = self.client
            .get(audio_url)
            .send()
            .await
            .context("Failed to fetch audio")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Audio download failed ({})", status);
        }

        let bytes = response.bytes().await.context("Failed to read audio body")?;
        Ok(bytes.to_vec())
    }

    async fn fetch_and_transcribe(&self, audio_url: &str, file_name: String) -> Result<Transcription> {
        let bytes = self.download_audio(audio_url).await?;
        self.transcribe_bytes(bytes, file_name).await
    }

    async fn transcribe_bytes(&self, file_bytes: Vec<u8>, file_name: String) -> Result<Transcription> {
        let file_size_mb = file_bytes.len() as f64 / (1024.0 * 1024.0);
        info!("Audio size: {:.1}MB", file_size_mb);
        if file_size_mb > MAX_UPLOAD_MB {
            anyhow::bail!("Audio is {:.1}MB, above the {:.0}MB Whisper upload limit", file_size_mb, MAX_UPLOAD_MB);
        }

        let file_part = multipart::Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("model", "whisper-1")
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");

        let response = self.client
            .post(self.transcriptions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .context("Failed to send request to OpenAI Whisper API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI Whisper API error ({}): {}", status, error_body);
        }

        let api_response: WhisperApiResponse = response.json().await
            .context("Failed to parse OpenAI Whisper API response")?;

        let words = clean_word_spans(
            api_response.words.into_iter().map(|w| WordSpan::new(w.word, w.start, w.end)),
        );

        info!("Whisper: {} words transcribed", words.len());

        Ok(Transcription {
            text: api_response.text,
            word_timestamps: words,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_url: &str) -> Result<Transcription, AnalysisError> {
        let file_name = audio_url
            .rsplit('/')
            .next()
            .and_then(|n| n.split('?').next())
            .filter(|n| !n.is_empty())
            .unwrap_or("audio.wav")
            .to_string();

        self.fetch_and_transcribe(audio_url, file_name)
            .await
            .map_err(|e| AnalysisError::acquisition("whisper", format!("{:#}", e)))
    }
}
