use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Core trait for LLM providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate completion for a given prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// Request structure for LLM generation
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
    /// When set, the provider is asked to reply with JSON matching this schema
    pub response_schema: Option<ResponseSchema>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
            timeout_seconds: None,
            response_schema: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Named JSON schema attached to a structured request
#[derive(Debug, Clone, Serialize)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub mod remote;
pub mod structured;

pub use structured::{generate_structured, StructuredOutput};

use anyhow::Context;
use common::{LlmConfig, RemoteLlmConfig};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";
const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Model tier a stage runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmTier {
    Fast,     // Structured output and evaluation
    Creative, // Synthesis and long-form writing
}

impl LlmTier {
    fn defaults(&self) -> (&'static str, f32) {
        match self {
            LlmTier::Fast => ("gemini-2.5-flash", 0.5),
            LlmTier::Creative => ("gemini-2.5-pro", 0.8),
        }
    }
}

/// Create an LLM provider for a tier. The tier section wins over `[llm.remote]`
/// key by key; anything unset falls back to the tier defaults.
pub fn create_llm_provider(llm_config: &LlmConfig, tier: LlmTier) -> Result<Box<dyn LlmProvider>> {
    let adapter = llm_config.adapter.as_deref().unwrap_or("remote");
    match adapter {
        "remote" => {
            let fallback = llm_config.remote.clone().unwrap_or_default();
            let section = match tier {
                LlmTier::Fast => llm_config.fast.as_ref(),
                LlmTier::Creative => llm_config.creative.as_ref(),
            };
            let pick = |f: fn(&RemoteLlmConfig) -> Option<String>| {
                section.and_then(f).or_else(|| f(&fallback))
            };
            let (default_model, default_temperature) = tier.defaults();

            let api_key_env = pick(|c| c.api_key_env.clone())
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
            let api_key = std::env::var(&api_key_env)
                .with_context(|| format!("LLM API key env var '{}' not set", api_key_env))?;

            let model = pick(|c| c.model.clone()).unwrap_or_else(|| default_model.to_string());
            let api_url = pick(|c| c.api_url.clone()).unwrap_or_else(|| DEFAULT_API_URL.to_string());
            let timeout_secs = section
                .and_then(|c| c.timeout_seconds)
                .or(fallback.timeout_seconds)
                .unwrap_or(120);
            let max_tokens = section
                .and_then(|c| c.max_tokens)
                .or(fallback.max_tokens)
                .unwrap_or(8192);
            let temperature = section
                .and_then(|c| c.temperature)
                .or(fallback.temperature)
                .unwrap_or(default_temperature);

            let provider = remote::RemoteLlmProvider::new(api_url, api_key, model)
                .with_defaults(timeout_secs, max_tokens, temperature);
            Ok(Box::new(provider))
        }
        _ => anyhow::bail!("Unknown LLM adapter type: {}", adapter),
    }
}

/// Helper to extract JSON from text that might contain markdown backticks or preamble
pub fn extract_json_from_text(text: &str) -> Option<String> {
    // 1. Try to find content between ```json and ```
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    // 2. Try to find content between ``` and ```
    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    // 3. Try to find the first '{' and last '}'
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return Some(text[start..=end].to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nanything else?";
        assert_eq!(extract_json_from_text(text).as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn extracts_bare_object_with_preamble() {
        let text = "Sure. {\"score\": 80} Hope that helps";
        assert_eq!(extract_json_from_text(text).as_deref(), Some("{\"score\": 80}"));
    }

    #[test]
    fn no_json_returns_none() {
        assert!(extract_json_from_text("plain prose only").is_none());
        assert!(extract_json_from_text("} backwards {").is_none());
    }

    #[test]
    fn tier_section_overrides_remote_fallback() {
        std::env::set_var("TRENDFLOW_TEST_LLM_KEY", "secret");
        let config = LlmConfig {
            adapter: Some("remote".to_string()),
            remote: Some(RemoteLlmConfig {
                api_key_env: Some("TRENDFLOW_TEST_LLM_KEY".to_string()),
                model: Some("shared-model".to_string()),
                ..Default::default()
            }),
            fast: None,
            creative: Some(RemoteLlmConfig {
                model: Some("big-model".to_string()),
                ..Default::default()
            }),
        };
        assert!(create_llm_provider(&config, LlmTier::Fast).is_ok());
        assert!(create_llm_provider(&config, LlmTier::Creative).is_ok());
    }

    #[test]
    fn missing_key_or_unknown_adapter_fails() {
        let config = LlmConfig {
            remote: Some(RemoteLlmConfig {
                api_key_env: Some("TRENDFLOW_TEST_UNSET_KEY".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(create_llm_provider(&config, LlmTier::Fast).is_err());

        let config = LlmConfig {
            adapter: Some("local".to_string()),
            ..Default::default()
        };
        assert!(create_llm_provider(&config, LlmTier::Fast).is_err());
    }
}
