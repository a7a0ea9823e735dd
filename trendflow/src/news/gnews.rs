use serde::Deserialize;

use common::ProviderConfig;

use super::{get_json, AggregatedItem, NewsProvider, ProviderError, SourceTag};

const DEFAULT_BASE_URL: &str = "https://gnews.io";

/// GNews search API (general coverage)
pub struct GNewsProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    max_items: usize,
}

impl GNewsProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>, config: &ProviderConfig) -> Self {
        Self {
            client,
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_items: config.max_items.unwrap_or(3),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    articles: Option<Vec<Article>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    image: Option<String>,
    published_at: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

#[async_trait::async_trait]
impl NewsProvider for GNewsProvider {
    fn tag(&self) -> SourceTag {
        SourceTag::GNews
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn default_limit(&self) -> usize {
        self.max_items
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<AggregatedItem>, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingCredentials)?;
        let max = limit.to_string();
        let request = self
            .client
            .get(format!("{}/api/v4/search", self.base_url))
            .query(&[("q", query), ("lang", "en"), ("max", &max), ("apikey", api_key)]);

        let body: SearchResponse = get_json(request).await?;

        Ok(body
            .articles
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| {
                let title = a.title?;
                let mut item =
                    AggregatedItem::new(SourceTag::GNews, title, a.description.unwrap_or_default());
                item.source_name = a.source.and_then(|s| s.name);
                item.url = a.url;
                item.image_url = a.image;
                item.published_at = a.published_at;
                Some(item)
            })
            .take(limit)
            .collect())
    }
}
