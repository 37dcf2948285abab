use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{describe_send_error, ChatCompleter, ChatRequest};
use crate::error::AnalysisError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// Anthropic API response structures
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Unknown,
}

/// Anthropic Messages API client returning the plain text of the reply.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self { client, api_key, model, base_url })
    }

    fn request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{"role": "user", "content": request.user_prompt}]
        });
        if let Some(system) = &request.system_prompt {
            body["system"] = serde_json::Value::String(system.clone());
        }
        body
    }
}

/// Concatenate every text block; tool or thinking blocks are ignored.
fn collect_text(response: AnthropicResponse) -> String {
    response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContentBlock::Text { text } => Some(text),
            AnthropicContentBlock::Unknown => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait]
impl ChatCompleter for AnthropicClient {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<String, AnalysisError> {
        let request_body = self.request_body(request);
        debug!(
            "Anthropic request: model={}, prompt {} chars",
            self.model,
            request.user_prompt.len()
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                warn!("Anthropic request {}: {}", describe_send_error(&e), e);
                AnalysisError::transient(format!("Anthropic request {}: {}", describe_send_error(&e), e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::transient(format!(
                "Anthropic API error ({}): {}",
                status, error_body
            )));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::transient(format!("Failed to read Anthropic response: {}", e)))?;

        Ok(collect_text(api_response))
    }
}
