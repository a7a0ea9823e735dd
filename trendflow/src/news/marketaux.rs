use serde::Deserialize;

use common::ProviderConfig;

use super::{get_json, AggregatedItem, NewsProvider, ProviderError, SourceTag};

const DEFAULT_BASE_URL: &str = "https://api.marketaux.com";

/// MarketAux financial news, carrying per-entity sentiment
pub struct MarketAuxProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    max_items: usize,
}

impl MarketAuxProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>, config: &ProviderConfig) -> Self {
        Self {
            client,
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_items: config.max_items.unwrap_or(2),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    data: Option<Vec<Article>>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    image_url: Option<String>,
    published_at: Option<String>,
    source: Option<String>,
    entities: Option<Vec<Entity>>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    sentiment_score: Option<f64>,
}

impl Article {
    /// Sentiment of the first tagged entity; absent anywhere along the path means "not available"
    fn sentiment(&self) -> Option<f64> {
        self.entities
            .as_ref()
            .and_then(|e| e.first())
            .and_then(|e| e.sentiment_score)
    }
}

#[async_trait::async_trait]
impl NewsProvider for MarketAuxProvider {
    fn tag(&self) -> SourceTag {
        SourceTag::MarketAux
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
            .get(format!("{}/v1/news/all", self.base_url))
            .query(&[
                ("search", query),
                ("language", "en"),
                ("limit", &max),
                ("api_token", api_key),
            ]);

        let body: NewsResponse = get_json(request).await?;

        Ok(body
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| {
                let sentiment = a.sentiment();
                let title = a.title?;
                let mut item = AggregatedItem::new(
                    SourceTag::MarketAux,
                    title,
                    a.description.unwrap_or_default(),
                );
                item.sentiment_score = sentiment;
                item.source_name = a.source;
                item.url = a.url;
                item.image_url = a.image_url;
                item.published_at = a.published_at;
                Some(item)
            })
            .take(limit)
            .collect())
    }
}
