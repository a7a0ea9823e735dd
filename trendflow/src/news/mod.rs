// News aggregation: normalized items, the provider interface and provider construction
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use common::{resolve_secret, NewsConfig, ProviderConfig};

pub mod aggregator;
pub mod filter;
pub mod headlines;

mod gnews;
mod google_news;
mod guardian;
mod marketaux;
mod newsdata;
mod nyt;
mod web_search;

pub use aggregator::{Aggregator, NewsDigest, NO_VERIFIED_NEWS};
pub use filter::ReliabilityFilter;
pub use gnews::GNewsProvider;
pub use google_news::{GoogleNewsProvider, DIGEST_WINDOW};
pub use guardian::GuardianProvider;
pub use headlines::{collect_headlines, fetch_structured_news, NewsItem};
pub use marketaux::MarketAuxProvider;
pub use newsdata::NewsDataProvider;
pub use nyt::NytProvider;
pub use web_search::WebSearchProvider;

/// Which provider produced an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    GNews,
    MarketAux,
    NewYorkTimes,
    NewsData,
    Guardian,
    GoogleNews,
    WebSearch,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceTag::GNews => "GNews",
            SourceTag::MarketAux => "MarketAux",
            SourceTag::NewYorkTimes => "NYT",
            SourceTag::NewsData => "NewsData",
            SourceTag::Guardian => "The Guardian",
            SourceTag::GoogleNews => "Google News",
            SourceTag::WebSearch => "Web Search",
        };
        f.write_str(name)
    }
}

/// One normalized news entry, alive only for the duration of an aggregation pass
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedItem {
    pub source: SourceTag,
    pub title: String,
    pub body_snippet: String,
    /// Publisher name as reported by the provider
    pub source_name: Option<String>,
    pub sentiment_score: Option<f64>,
    pub published_at: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

impl AggregatedItem {
    pub fn new(source: SourceTag, title: impl Into<String>, body_snippet: impl Into<String>) -> Self {
        Self {
            source,
            title: title.into(),
            body_snippet: body_snippet.into(),
            source_name: None,
            sentiment_score: None,
            published_at: None,
            url: None,
            image_url: None,
        }
    }

    /// Render the attributed digest line handed to the research prompt
    pub fn digest_line(&self) -> String {
        let source_name = self.source_name.as_deref().unwrap_or("unknown");
        match self.source {
            SourceTag::GNews => format!(
                "[GNews] {} ({}): {}",
                self.title, source_name, self.body_snippet
            ),
            SourceTag::MarketAux => {
                let sentiment = self
                    .sentiment_score
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "N/A".to_string());
                format!(
                    "[MarketAux - Sentiment: {}] {}: {}",
                    sentiment, self.title, self.body_snippet
                )
            }
            SourceTag::NewYorkTimes => format!(
                "[NYT - {}] {}: {}",
                self.published_at.as_deref().unwrap_or("N/A"),
                self.title,
                self.body_snippet
            ),
            SourceTag::GoogleNews => format!(
                "[Google News] {} ({}): {}",
                self.title,
                source_name,
                self.url.as_deref().unwrap_or("")
            ),
            SourceTag::NewsData | SourceTag::Guardian | SourceTag::WebSearch => {
                format!("[{}] {}: {}", self.source, self.title, self.body_snippet)
            }
        }
    }
}

/// Failure of a single provider call. Always absorbed by the aggregator.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("credentials not configured")]
    MissingCredentials,
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed payload: {0}")]
    Decode(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Uniform interface over every news or search backend
#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    fn tag(&self) -> SourceTag;

    /// Providers without their credential are skipped without being called
    fn is_configured(&self) -> bool {
        true
    }

    /// How many items this provider contributes to a digest
    fn default_limit(&self) -> usize;

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<AggregatedItem>, ProviderError>;
}

/// GET a JSON document, mapping non-2xx and decode failures to `ProviderError`
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status));
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Strip markup from provider snippets and collapse whitespace
pub(crate) fn plain_text(html: &str) -> String {
    let text = if html.contains('<') {
        html2text::from_read(html.as_bytes(), 10_000).unwrap_or_else(|_| html.to_string())
    } else {
        html.to_string()
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the shared HTTP client used by every provider
pub fn build_client(config: &NewsConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_seconds.unwrap_or(15)))
        .user_agent(
            config
                .user_agent
                .clone()
                .unwrap_or_else(|| "TrendFlow/0.1.0".to_string()),
        )
        .build()
        .context("failed to build reqwest client")
}

fn section(cfg: &Option<ProviderConfig>) -> ProviderConfig {
    cfg.clone().unwrap_or_default()
}

pub(crate) fn key_for(cfg: &ProviderConfig, default_env: &str) -> Option<String> {
    resolve_secret(Some(cfg.api_key_env.as_deref().unwrap_or(default_env)))
}

/// Structured providers in priority order, plus the last-resort web search.
/// Providers disabled in config are left out entirely.
pub fn providers_from_config(
    config: &NewsConfig,
    client: &reqwest::Client,
) -> (Vec<Box<dyn NewsProvider>>, Option<Box<dyn NewsProvider>>) {
    let mut structured: Vec<Box<dyn NewsProvider>> = Vec::new();

    let gnews = section(&config.gnews);
    if gnews.is_enabled() {
        structured.push(Box::new(GNewsProvider::new(
            client.clone(),
            key_for(&gnews, "GNEWS_API_KEY"),
            &gnews,
        )));
    }

    let marketaux = section(&config.marketaux);
    if marketaux.is_enabled() {
        structured.push(Box::new(MarketAuxProvider::new(
            client.clone(),
            key_for(&marketaux, "MARKETAUX_API_KEY"),
            &marketaux,
        )));
    }

    let nyt = section(&config.nyt);
    if nyt.is_enabled() {
        structured.push(Box::new(NytProvider::new(
            client.clone(),
            key_for(&nyt, "NYT_API_KEY"),
            &nyt,
        )));
    }

    let newsdata = section(&config.newsdata);
    if newsdata.is_enabled() {
        structured.push(Box::new(NewsDataProvider::new(
            client.clone(),
            key_for(&newsdata, "NEWSDATA_API_KEY"),
            &newsdata,
        )));
    }

    let guardian = section(&config.guardian);
    if guardian.is_enabled() {
        structured.push(Box::new(GuardianProvider::new(
            client.clone(),
            key_for(&guardian, "GUARDIAN_API_KEY"),
            &guardian,
        )));
    }

    let google_news = section(&config.google_news);
    if google_news.is_enabled() {
        structured.push(Box::new(
            GoogleNewsProvider::new(client.clone(), &google_news).with_window(DIGEST_WINDOW),
        ));
    }

    let web = section(&config.web_search);
    let fallback: Option<Box<dyn NewsProvider>> = if web.is_enabled() {
        Some(Box::new(WebSearchProvider::new(client.clone(), &web)))
    } else {
        None
    };

    (structured, fallback)
}

/// Outcome of probing one provider
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeStatus {
    Ok { items: usize, first_title: String },
    Empty,
    Skipped,
    Failed { reason: String },
}

/// Query every provider once and report what came back
pub async fn probe_providers(
    providers: &[Box<dyn NewsProvider>],
    topic: &str,
) -> Vec<(SourceTag, ProbeStatus)> {
    let mut report = Vec::with_capacity(providers.len());
    for provider in providers {
        let status = if !provider.is_configured() {
            ProbeStatus::Skipped
        } else {
            match provider.fetch(topic, provider.default_limit()).await {
                Ok(items) if items.is_empty() => ProbeStatus::Empty,
                Ok(items) => ProbeStatus::Ok {
                    items: items.len(),
                    first_title: items[0].title.chars().take(60).collect(),
                },
                Err(e) => ProbeStatus::Failed {
                    reason: e.to_string(),
                },
            }
        };
        report.push((provider.tag(), status));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marketaux_line_marks_missing_sentiment() {
        let item = AggregatedItem::new(SourceTag::MarketAux, "Chip stocks rally", "Shares up 4%");
        assert_eq!(
            item.digest_line(),
            "[MarketAux - Sentiment: N/A] Chip stocks rally: Shares up 4%"
        );
    }

    #[test]
    fn gnews_line_carries_publisher() {
        let mut item = AggregatedItem::new(SourceTag::GNews, "Nvidia earnings", "Revenue beats");
        item.source_name = Some("Reuters".to_string());
        assert_eq!(
            item.digest_line(),
            "[GNews] Nvidia earnings (Reuters): Revenue beats"
        );
    }

    #[test]
    fn google_news_line_points_at_url() {
        let mut item = AggregatedItem::new(SourceTag::GoogleNews, "AMD MI300X ships", "");
        item.source_name = Some("The Verge".to_string());
        item.url = Some("https://news.google.com/articles/abc".to_string());
        assert_eq!(
            item.digest_line(),
            "[Google News] AMD MI300X ships (The Verge): https://news.google.com/articles/abc"
        );
    }

    #[test]
    fn guardian_and_web_lines_use_display_name() {
        let item = AggregatedItem::new(SourceTag::Guardian, "EU AI Act", "Rules take effect");
        assert_eq!(item.digest_line(), "[The Guardian] EU AI Act: Rules take effect");
        let item = AggregatedItem::new(SourceTag::WebSearch, "Title", "Body");
        assert_eq!(item.digest_line(), "[Web Search] Title: Body");
    }

    #[test]
    fn plain_text_strips_markup() {
        assert_eq!(
            plain_text("<p>Markets fell</p>\n<p>sharply</p>"),
            "Markets fell sharply"
        );
        assert_eq!(plain_text("  already   plain "), "already plain");
    }
}
