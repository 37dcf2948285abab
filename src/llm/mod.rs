mod anthropic;
mod openai;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

/// One chat completion request. The model sees `system_prompt` (if any) followed by
/// a single user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A fallible, slow, possibly adversarial text completion service.
///
/// Implementations must not interpret the returned text: whatever the model said
/// goes back verbatim and the response parser decides whether it is usable.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<String, AnalysisError>;
}

#[async_trait]
impl<T: ChatCompleter + ?Sized> ChatCompleter for Arc<T> {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<String, AnalysisError> {
        (**self).complete_chat(request).await
    }
}

#[async_trait]
impl<T: ChatCompleter + ?Sized> ChatCompleter for Box<T> {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<String, AnalysisError> {
        (**self).complete_chat(request).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
}

impl Default for LlmProvider {
    fn default() -> Self {
        LlmProvider::Anthropic
    }
}

impl LlmProvider {
    pub fn api_key_name(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "claude-sonnet-4-5-20250929",
            LlmProvider::OpenAi => "gpt-4o",
        }
    }
}

/// Build the chat client selected by configuration.
pub fn chat_client_for(settings: &crate::config::LlmSettings) -> Result<Arc<dyn ChatCompleter>> {
    let api_key = settings
        .resolve_api_key()
        .with_context(|| format!("No API key configured; set llm.api_key or {}", settings.provider.api_key_name()))?;
    let model = settings
        .model
        .clone()
        .unwrap_or_else(|| settings.provider.default_model().to_string());
    let timeout = std::time::Duration::from_secs(settings.timeout_secs);

    let client: Arc<dyn ChatCompleter> = match settings.provider {
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(
            api_key,
            model,
            settings.base_url.clone(),
            timeout,
        )?),
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(
            api_key,
            model,
            settings.base_url.clone(),
            settings.json_mode,
            timeout,
        )?),
    };
    Ok(client)
}

/// Short label for a failed send, used in the `TransientCall` message.
pub(crate) fn describe_send_error(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    }
}
