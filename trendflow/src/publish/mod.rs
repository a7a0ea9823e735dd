// Publishing collaborators: hand a finished article to a blogging platform
use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;

use common::{resolve_secret, PublisherConfig};

use crate::pipeline::WorkflowState;

pub mod devto;
pub mod hashnode;

pub use devto::DevtoPublisher;
pub use hashnode::HashnodePublisher;

pub const DEFAULT_SERIES: &str = "TrendFlow AI Digest";

/// What gets sent to a platform
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub body_markdown: String,
    pub tags: Vec<String>,
    pub series_name: String,
}

impl Article {
    /// Build the article from a finished run: viral title when there is one, otherwise
    /// a generic title from the topic.
    pub fn from_state(state: &WorkflowState, series_name: &str) -> Self {
        let metadata = state.final_metadata.as_ref();
        let title = metadata
            .map(|m| m.title_viral.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Deep Dive: {}", state.topic));
        Self {
            title,
            body_markdown: state.draft.clone(),
            tags: metadata.map(|m| m.tags.clone()).unwrap_or_default(),
            series_name: series_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishReceipt {
    pub url: String,
}

/// Terminal result of the publish handoff, recorded on the workflow state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome {
    Published { url: String },
    Skipped { reason: String },
    Failed { reason: String },
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Publishers without their credentials are skipped
    fn is_configured(&self) -> bool {
        true
    }

    async fn publish(&self, article: &Article) -> Result<PublishReceipt>;
}

/// Publisher selected by `[publisher] target`, or None when publishing is off
pub fn publisher_from_config(config: &PublisherConfig) -> Result<Option<Box<dyn Publisher>>> {
    let target = config.target.as_deref().unwrap_or("devto");
    if target == "none" {
        return Ok(None);
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build publisher HTTP client")?;
    let published = config.published.unwrap_or(false);

    match target {
        "devto" => {
            let devto = config.devto.clone().unwrap_or_default();
            let api_key = resolve_secret(Some(devto.api_key_env.as_deref().unwrap_or("DEVTO_API_KEY")));
            let mut publisher = DevtoPublisher::new(client, api_key).with_published(published);
            if let Some(url) = devto.api_url {
                publisher = publisher.with_api_url(url);
            }
            Ok(Some(Box::new(publisher)))
        }
        "hashnode" => {
            let hashnode = config.hashnode.clone().unwrap_or_default();
            let token = resolve_secret(Some(hashnode.token_env.as_deref().unwrap_or("HASHNODE_TOKEN")));
            let publication_id = resolve_secret(Some(
                hashnode
                    .publication_id_env
                    .as_deref()
                    .unwrap_or("HASHNODE_PUBLICATION_ID"),
            ));
            let mut publisher = HashnodePublisher::new(client, token, publication_id);
            if let Some(url) = hashnode.api_url {
                publisher = publisher.with_api_url(url);
            }
            Ok(Some(Box::new(publisher)))
        }
        other => anyhow::bail!("Unknown publisher target: {}", other),
    }
}

/// Hand an article to the publisher and classify the result. Never fails.
pub async fn deliver(publisher: Option<&dyn Publisher>, article: &Article) -> PublishOutcome {
    let Some(publisher) = publisher else {
        return PublishOutcome::Skipped {
            reason: "no publisher configured".to_string(),
        };
    };
    if !publisher.is_configured() {
        tracing::warn!(publisher = publisher.name(), "publish: credentials not set, skipping");
        return PublishOutcome::Skipped {
            reason: format!("{} credentials not set", publisher.name()),
        };
    }

    match publisher.publish(article).await {
        Ok(receipt) => {
            tracing::info!(publisher = publisher.name(), url = %receipt.url, "publish: article is live");
            PublishOutcome::Published { url: receipt.url }
        }
        Err(e) => {
            tracing::warn!(publisher = publisher.name(), error = %e, "publish: failed");
            PublishOutcome::Failed {
                reason: format!("{:#}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FinalMetadata;

    fn metadata(title_viral: &str) -> FinalMetadata {
        FinalMetadata {
            title_seo: "seo".to_string(),
            title_viral: title_viral.to_string(),
            slug: "slug".to_string(),
            meta_description: "desc".to_string(),
            tags: vec!["Machine Learning".to_string(), "GPU".to_string()],
            reading_time: 4,
            linkedin_post: String::new(),
            twitter_thread_hook: String::new(),
            image_prompt: String::new(),
            image_alt_text: String::new(),
        }
    }

    #[test]
    fn article_prefers_viral_title() {
        let mut state = WorkflowState::new("Nvidia AND Blackwell");
        state.draft = "# Body".to_string();
        state.final_metadata = Some(metadata("The chip that ate the cloud"));
        let article = Article::from_state(&state, DEFAULT_SERIES);
        assert_eq!(article.title, "The chip that ate the cloud");
        assert_eq!(article.body_markdown, "# Body");
        assert_eq!(article.tags.len(), 2);
        assert_eq!(article.series_name, "TrendFlow AI Digest");
    }

    #[test]
    fn article_falls_back_to_topic() {
        let mut state = WorkflowState::new("Quantum Computing");
        let article = Article::from_state(&state, "S");
        assert_eq!(article.title, "Deep Dive: Quantum Computing");
        assert!(article.tags.is_empty());

        state.final_metadata = Some(metadata("   "));
        assert_eq!(Article::from_state(&state, "S").title, "Deep Dive: Quantum Computing");
    }

    #[tokio::test]
    async fn missing_publisher_or_credentials_skip() {
        let article = Article::from_state(&WorkflowState::new("x"), "S");
        assert_eq!(
            deliver(None, &article).await,
            PublishOutcome::Skipped {
                reason: "no publisher configured".to_string()
            }
        );

        let devto = DevtoPublisher::new(reqwest::Client::new(), None);
        match deliver(Some(&devto), &article).await {
            PublishOutcome::Skipped { reason } => assert!(reason.contains("dev.to")),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[test]
    fn target_none_disables_publishing() {
        let config = PublisherConfig {
            target: Some("none".to_string()),
            ..Default::default()
        };
        assert!(publisher_from_config(&config).unwrap().is_none());

        let config = PublisherConfig {
            target: Some("carrier-pigeon".to_string()),
            ..Default::default()
        };
        assert!(publisher_from_config(&config).is_err());
    }
}
