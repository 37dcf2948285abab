use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;

use crate::llm::LlmProvider;
use crate::transcription::TranscriptionProvider;

/// Prefix for environment overrides, e.g. `SPEECH_COACH__LLM__MODEL=gpt-4o`.
const ENV_PREFIX: &str = "SPEECH_COACH";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub transcription: TranscriptionSettings,
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    /// Falls back to the provider's default model.
    pub model: Option<String>,
    /// Falls back to the provider's conventional environment variable.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Ask OpenAI-compatible endpoints for a `json_object` response.
    pub json_mode: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: None,
            api_key: None,
            base_url: None,
            temperature: 0.1,
            max_tokens: 4096,
            timeout_secs: 120,
            json_mode: true,
        }
    }
}

impl LlmSettings {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), self.provider.api_key_name())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub provider: TranscriptionProvider,
    pub api_key: Option<String>,
    /// Falls back to the provider's public endpoint.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            provider: TranscriptionProvider::default(),
            api_key: None,
            base_url: None,
            timeout_secs: 300,
        }
    }
}

impl TranscriptionSettings {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), self.provider.api_key_name())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Transcripts with fewer words skip the model entirely.
    pub min_words: usize,
    /// Redistribute an all-"perfect" pronunciation breakdown.
    pub rebalance_flat_breakdown: bool,
    pub minor_share: f64,
    pub significant_share: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            min_words: 10,
            rebalance_flat_breakdown: true,
            minor_share: 0.2,
            significant_share: 0.05,
        }
    }
}

impl Settings {
    /// Merge an optional config file (any format the `config` crate knows, the
    /// extension may be omitted) with `SPEECH_COACH__*` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// `<config dir>/speech-coach/config`, e.g. `~/.config/speech-coach/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("speech-coach").join("config"))
    }
}

fn resolve_key(configured: Option<&str>, env_name: &str) -> Option<String> {
    let clean = |key: &str| {
        let key = key.trim().trim_matches('"').to_string();
        (!key.is_empty()).then_some(key)
    };

    configured
        .and_then(clean)
        .or_else(|| std::env::var(env_name).ok().as_deref().and_then(clean))
}
