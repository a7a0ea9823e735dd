use serde::Deserialize;

use common::ProviderConfig;

use super::{get_json, AggregatedItem, NewsProvider, ProviderError, SourceTag};

const DEFAULT_BASE_URL: &str = "https://api.nytimes.com";
const SECTION_FILTER: &str = r#"section_name:("Technology" "Business")"#;

/// New York Times article search, restricted to Technology and Business
pub struct NytProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    max_items: usize,
}

impl NytProvider {
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

// Every level of this payload has been observed as null
#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    docs: Option<Vec<Doc>>,
}

#[derive(Debug, Deserialize)]
struct Doc {
    headline: Option<Headline>,
    #[serde(rename = "abstract")]
    summary: Option<String>,
    pub_date: Option<String>,
    web_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Headline {
    main: Option<String>,
}

#[async_trait::async_trait]
impl NewsProvider for NytProvider {
    fn tag(&self) -> SourceTag {
        SourceTag::NewYorkTimes
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
            .get(format!("{}/svc/search/v2/articlesearch.json", self.base_url))
            .query(&[
                ("q", query),
                ("sort", "newest"),
                ("fq", SECTION_FILTER),
                ("api-key", api_key),
            ]);

        let body: SearchResponse = get_json(request).await?;

        let docs = body.response.and_then(|r| r.docs).unwrap_or_default();

        Ok(docs
            .into_iter()
            .take(limit)
            .filter_map(|doc| {
                let title = doc.headline.and_then(|h| h.main)?;
                let summary = doc
                    .summary
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "No summary".to_string());
                let mut item = AggregatedItem::new(SourceTag::NewYorkTimes, title, summary);
                item.published_at = doc.pub_date.map(|d| d.chars().take(10).collect());
                item.source_name = Some("The New York Times".to_string());
                item.url = doc.web_url;
                Some(item)
            })
            .collect())
    }
}
