/*!
common/src/lib.rs

Shared configuration types for TrendFlow.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default file with an optional override file
- A helper resolving credentials from the environment variables named in the config
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Remote LLM endpoint config (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

/// LLM top-level config. `fast` serves structured and evaluation calls,
/// `creative` serves synthesis and long-form writing. Both fall back to `remote`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub adapter: Option<String>, // "remote", "none"
    pub remote: Option<RemoteLlmConfig>,
    pub fast: Option<RemoteLlmConfig>,
    pub creative: Option<RemoteLlmConfig>,
}

/// Per-provider news settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub enabled: Option<bool>,
    /// Name of the env var holding the API key (unset var => provider skipped)
    pub api_key_env: Option<String>,
    pub max_items: Option<usize>,
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// News aggregation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsConfig {
    pub fetch_timeout_seconds: Option<u64>,
    /// Upper bound on a single provider call, enforced by the aggregator
    pub provider_timeout_seconds: Option<u64>,
    /// Web search runs only when fewer items than this were collected
    pub min_items_before_web_search: Option<usize>,
    pub user_agent: Option<String>,
    pub gnews: Option<ProviderConfig>,
    pub marketaux: Option<ProviderConfig>,
    pub nyt: Option<ProviderConfig>,
    pub newsdata: Option<ProviderConfig>,
    pub guardian: Option<ProviderConfig>,
    pub google_news: Option<ProviderConfig>,
    pub web_search: Option<ProviderConfig>,
}

/// Reliability filter lists (case-insensitive substrings)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub blocked_domains: Option<Vec<String>>,
    pub title_markers: Option<Vec<String>>,
}

/// Content pipeline knobs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Refine passes allowed before the editor gate is bypassed
    pub max_revisions: Option<u32>,
    /// Digests shorter than this trigger the broad-topic research retry
    pub min_digest_chars: Option<usize>,
    /// Draft prefix length handed to the packaging stage
    pub excerpt_chars: Option<usize>,
    /// Phrases the writer is told to avoid
    pub draft_banned_phrases: Option<Vec<String>>,
    /// Phrases the editor scans for before asking the model
    pub editor_banned_phrases: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevtoConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HashnodeConfig {
    pub api_url: Option<String>,
    pub token_env: Option<String>,
    pub publication_id_env: Option<String>,
}

/// Publishing target selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublisherConfig {
    pub target: Option<String>, // "devto", "hashnode", "none"
    pub series: Option<String>,
    /// Publish immediately instead of saving as a draft on the platform
    pub published: Option<bool>,
    pub devto: Option<DevtoConfig>,
    pub hashnode: Option<HashnodeConfig>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for (path, label) in [(default_path, "default"), (override_path, "override")] {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {} config: {}", label, path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse {} configuration", label))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Read the credential held in the env var named by `env_name`.
/// Unset or blank variables resolve to `None`.
pub fn resolve_secret(env_name: Option<&str>) -> Option<String> {
    let name = env_name?;
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
