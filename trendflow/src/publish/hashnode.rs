use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Article, PublishReceipt, Publisher};

const DEFAULT_API_URL: &str = "https://gql.hashnode.com";
const MAX_TAGS: usize = 5;

const PUBLISH_POST: &str = r#"mutation PublishPost($input: PublishPostInput!) {
  publishPost(input: $input) {
    post { id url }
  }
}"#;

pub struct HashnodePublisher {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
    publication_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HashnodeTag {
    pub slug: String,
    pub name: String,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<PublishData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishData {
    publish_post: Option<PublishPostPayload>,
}

#[derive(Deserialize)]
struct PublishPostPayload {
    post: Option<PostRef>,
}

#[derive(Deserialize)]
struct PostRef {
    url: Option<String>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

pub fn hashnode_tags(tags: &[String]) -> Vec<HashnodeTag> {
    tags.iter()
        .map(|t| t.trim().trim_start_matches('#').trim())
        .filter(|t| !t.is_empty())
        .take(MAX_TAGS)
        .map(|name| HashnodeTag {
            slug: name
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("-"),
            name: name.to_string(),
        })
        .collect()
}

impl HashnodePublisher {
    pub fn new(client: reqwest::Client, token: Option<String>, publication_id: Option<String>) -> Self {
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            token,
            publication_id,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[async_trait::async_trait]
impl Publisher for HashnodePublisher {
    fn name(&self) -> &'static str {
        "hashnode"
    }

    fn is_configured(&self) -> bool {
        self.token.is_some() && self.publication_id.is_some()
    }

    async fn publish(&self, article: &Article) -> Result<PublishReceipt> {
        let token = self.token.as_deref().context("HASHNODE_TOKEN not set")?;
        let publication_id = self
            .publication_id
            .as_deref()
            .context("HASHNODE_PUBLICATION_ID not set")?;

        let body = json!({
            "query": PUBLISH_POST,
            "variables": {
                "input": {
                    "title": article.title,
                    "contentMarkdown": article.body_markdown,
                    "publicationId": publication_id,
                    "tags": hashnode_tags(&article.tags),
                }
            }
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", token)
            .json(&body)
            .send()
            .await
            .context("Failed to reach Hashnode")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Hashnode API error {}: {}", status, text);
        }

        let parsed: GraphQlResponse = response
            .json()
            .await
            .context("Failed to parse Hashnode response")?;

        if let Some(error) = parsed.errors.as_ref().and_then(|e| e.first()) {
            anyhow::bail!("Hashnode rejected the post: {}", error.message);
        }

        let url = parsed
            .data
            .and_then(|d| d.publish_post)
            .and_then(|p| p.post)
            .and_then(|p| p.url)
            .context("Hashnode response has no post url")?;
        Ok(PublishReceipt { url })
    }
}
