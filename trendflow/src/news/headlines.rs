// Structured headline feed: concurrent fetch of raw news items for display
use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

use common::NewsConfig;

use super::{
    build_client, key_for, AggregatedItem, GNewsProvider, GoogleNewsProvider, NewsDataProvider,
    NewsProvider, ProviderError, SourceTag,
};

/// Scraping-style sources are slow; never ask them for more than this
const SCRAPER_LIMIT: usize = 20;
const GOOGLE_NEWS_SUMMARY: &str = "Read full article on Google News...";

#[derive(Debug, Clone, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub url: Option<String>,
    pub source: String,
    pub summary: String,
    pub published_at: Option<String>,
    pub image_url: Option<String>,
}

impl From<AggregatedItem> for NewsItem {
    fn from(item: AggregatedItem) -> Self {
        let summary = if item.source == SourceTag::GoogleNews && item.body_snippet.is_empty() {
            GOOGLE_NEWS_SUMMARY.to_string()
        } else {
            item.body_snippet
        };
        Self {
            source: item.source_name.unwrap_or_else(|| item.source.to_string()),
            title: item.title,
            url: item.url,
            summary,
            published_at: item.published_at,
            image_url: item.image_url,
        }
    }
}

/// Query the given providers concurrently and flatten their results in order, capped at `limit`
pub async fn collect_headlines(
    providers: &[Box<dyn NewsProvider>],
    topic: &str,
    limit: usize,
    per_provider_timeout: Duration,
) -> Vec<NewsItem> {
    let calls = providers
        .iter()
        .filter(|p| p.is_configured())
        .map(|p| async move {
            let cap = if p.tag() == SourceTag::GoogleNews {
                limit.min(SCRAPER_LIMIT)
            } else {
                limit
            };
            let result = tokio::time::timeout(per_provider_timeout, p.fetch(topic, cap))
                .await
                .unwrap_or(Err(ProviderError::Timeout(per_provider_timeout)));
            match result {
                Ok(items) => items,
                Err(e) => {
                    warn!(source = %p.tag(), error = %e, "headlines: provider failed");
                    Vec::new()
                }
            }
        });

    join_all(calls)
        .await
        .into_iter()
        .flatten()
        .take(limit)
        .map(NewsItem::from)
        .collect()
}

/// Headline list for a topic from GNews, NewsData and Google News
pub async fn fetch_structured_news(config: &NewsConfig, topic: &str, limit: usize) -> Vec<NewsItem> {
    let client = match build_client(config) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "headlines: cannot build HTTP client");
            return Vec::new();
        }
    };

    let gnews = config.gnews.clone().unwrap_or_default();
    let newsdata = config.newsdata.clone().unwrap_or_default();
    let google_news = config.google_news.clone().unwrap_or_default();

    let providers: Vec<Box<dyn NewsProvider>> = vec![
        Box::new(GNewsProvider::new(
            client.clone(),
            key_for(&gnews, "GNEWS_API_KEY"),
            &gnews,
        )),
        Box::new(NewsDataProvider::new(
            client.clone(),
            key_for(&newsdata, "NEWSDATA_API_KEY"),
            &newsdata,
        )),
        Box::new(GoogleNewsProvider::new(client, &google_news)),
    ];

    let timeout = Duration::from_secs(config.provider_timeout_seconds.unwrap_or(20));
    collect_headlines(&providers, topic, limit, timeout).await
}
