use serde::Deserialize;

use common::ProviderConfig;

use super::{get_json, AggregatedItem, NewsProvider, ProviderError, SourceTag};

const DEFAULT_BASE_URL: &str = "https://newsdata.io";

/// NewsData.io breaking headlines
pub struct NewsDataProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    max_items: usize,
}

impl NewsDataProvider {
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
    results: Option<Vec<Article>>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    link: Option<String>,
    source_id: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    image_url: Option<String>,
}

#[async_trait::async_trait]
impl NewsProvider for NewsDataProvider {
    fn tag(&self) -> SourceTag {
        SourceTag::NewsData
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn default_limit(&self) -> usize {
        self.max_items
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<AggregatedItem>, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingCredentials)?;
        let request = self
            .client
            .get(format!("{}/api/1/news", self.base_url))
            .query(&[("apikey", api_key), ("q", query), ("language", "en")]);

        let body: NewsResponse = get_json(request).await?;

        Ok(body
            .results
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .filter_map(|a| {
                let title = a.title?;
                let mut item =
                    AggregatedItem::new(SourceTag::NewsData, title, a.description.unwrap_or_default());
                item.source_name = a.source_id;
                item.url = a.link;
                item.published_at = a.pub_date;
                item.image_url = a.image_url;
                Some(item)
            })
            .collect())
    }
}
