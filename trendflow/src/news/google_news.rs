use common::ProviderConfig;

use super::{AggregatedItem, NewsProvider, ProviderError, SourceTag};

const DEFAULT_BASE_URL: &str = "https://news.google.com";
/// Recency window the digest asks for, to keep research fresh
pub const DIGEST_WINDOW: &str = "12h";

/// Google News RSS search. Needs no credential.
pub struct GoogleNewsProvider {
    client: reqwest::Client,
    base_url: String,
    max_items: usize,
    window: Option<String>,
}

impl GoogleNewsProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_items: config.max_items.unwrap_or(3),
            window: None,
        }
    }

    /// Restrict results to a Google `when:` period such as `12h` or `7d`
    pub fn with_window(mut self, window: impl Into<String>) -> Self {
        self.window = Some(window.into());
        self
    }

    fn search_query(&self, query: &str) -> String {
        match &self.window {
            Some(window) => format!("{} when:{}", query, window),
            None => query.to_string(),
        }
    }
}

/// Google News titles read "Headline - Publisher"
fn split_publisher(title: &str) -> (String, Option<String>) {
    match title.rsplit_once(" - ") {
        Some((headline, publisher)) if !headline.trim().is_empty() => {
            (headline.trim().to_string(), Some(publisher.trim().to_string()))
        }
        _ => (title.trim().to_string(), None),
    }
}

pub(crate) fn parse_feed(bytes: &[u8], limit: usize) -> Result<Vec<AggregatedItem>, ProviderError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| ProviderError::Decode(e.to_string()))?;

    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let raw_title = entry.title.map(|t| t.content)?;
            let (title, publisher) = split_publisher(&raw_title);
            let mut item = AggregatedItem::new(SourceTag::GoogleNews, title, "");
            item.source_name = publisher;
            item.url = entry.links.into_iter().next().map(|l| l.href);
            item.published_at = entry.published.map(|d| d.to_rfc3339());
            Some(item)
        })
        .take(limit)
        .collect())
}

#[async_trait::async_trait]
impl NewsProvider for GoogleNewsProvider {
    fn tag(&self) -> SourceTag {
        SourceTag::GoogleNews
    }

    fn default_limit(&self) -> usize {
        self.max_items
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<AggregatedItem>, ProviderError> {
        let q = self.search_query(query);
        let response = self
            .client
            .get(format!("{}/rss/search", self.base_url))
            .query(&[
                ("q", q.as_str()),
                ("hl", "en-US"),
                ("gl", "US"),
                ("ceid", "US:en"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }
        let bytes = response.bytes().await?;
        parse_feed(bytes.as_ref(), limit)
    }
}
