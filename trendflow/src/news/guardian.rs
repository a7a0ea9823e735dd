use serde::Deserialize;

use common::ProviderConfig;

use super::{get_json, plain_text, AggregatedItem, NewsProvider, ProviderError, SourceTag};

const DEFAULT_BASE_URL: &str = "https://content.guardianapis.com";

/// The Guardian content API (analysis pieces with trail text)
pub struct GuardianProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    max_items: usize,
}

impl GuardianProvider {
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
struct SearchResponse {
    response: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    results: Option<Vec<Content>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    web_title: Option<String>,
    web_url: Option<String>,
    web_publication_date: Option<String>,
    fields: Option<Fields>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fields {
    trail_text: Option<String>,
}

#[async_trait::async_trait]
impl NewsProvider for GuardianProvider {
    fn tag(&self) -> SourceTag {
        SourceTag::Guardian
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
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", query),
                ("api-key", api_key),
                ("show-fields", "trailText"),
            ]);

        let body: SearchResponse = get_json(request).await?;

        let results = body.response.and_then(|r| r.results).unwrap_or_default();

        Ok(results
            .into_iter()
            .take(limit)
            .filter_map(|r| {
                let title = r.web_title?;
                let summary = r
                    .fields
                    .and_then(|f| f.trail_text)
                    .map(|t| plain_text(&t))
                    .unwrap_or_default();
                let mut item = AggregatedItem::new(SourceTag::Guardian, title, summary);
                item.source_name = Some("The Guardian".to_string());
                item.url = r.web_url;
                item.published_at = r.web_publication_date;
                Some(item)
            })
            .collect())
    }
}
