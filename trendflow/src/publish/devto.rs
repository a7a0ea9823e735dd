use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{Article, PublishReceipt, Publisher};

const DEFAULT_API_URL: &str = "https://dev.to/api";
const MAX_TAGS: usize = 4;

pub struct DevtoPublisher {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    published: bool,
}

#[derive(Serialize)]
struct ArticleEnvelope<'a> {
    article: ArticleBody<'a>,
}

#[derive(Serialize)]
struct ArticleBody<'a> {
    title: &'a str,
    body_markdown: &'a str,
    published: bool,
    tags: Vec<String>,
    series: &'a str,
}

#[derive(Deserialize)]
struct CreatedArticle {
    url: Option<String>,
}

/// Dev.to only accepts lowercase alphanumeric tags, four at most. "ai" is always one of them.
pub fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags {
        let tag: String = tag
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if !tag.is_empty() && !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    let has_ai = cleaned.iter().any(|t| t == "ai");
    cleaned.retain(|t| t != "ai");
    cleaned.truncate(MAX_TAGS - 1);
    if has_ai {
        cleaned.insert(0, "ai".to_string());
    } else {
        cleaned.push("ai".to_string());
    }
    cleaned
}

impl DevtoPublisher {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            api_key,
            published: false,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Publish immediately instead of saving a draft
    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }
}

#[async_trait::async_trait]
impl Publisher for DevtoPublisher {
    fn name(&self) -> &'static str {
        "dev.to"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn publish(&self, article: &Article) -> Result<PublishReceipt> {
        let api_key = self
            .api_key
            .as_deref()
            .context("DEVTO_API_KEY not set")?;

        let payload = ArticleEnvelope {
            article: ArticleBody {
                title: &article.title,
                body_markdown: &article.body_markdown,
                published: self.published,
                tags: clean_tags(&article.tags),
                series: &article.series_name,
            },
        };

        let response = self
            .client
            .post(format!("{}/articles", self.api_url))
            .header("api-key", api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach dev.to")?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("dev.to API error {}: {}", status, body);
        }

        let created: CreatedArticle = response
            .json()
            .await
            .context("Failed to parse dev.to response")?;
        let url = created.url.context("dev.to response has no article url")?;
        Ok(PublishReceipt { url })
    }
}
