use anyhow::Result;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info, warn};

use common::Config;

use super::{
    build_client, providers_from_config, AggregatedItem, NewsProvider, ProviderError,
    ReliabilityFilter,
};

/// Returned instead of a digest when no provider produced anything usable
pub const NO_VERIFIED_NEWS: &str =
    "CRITICAL: No verified news found. Agents must rely on internal knowledge but declare uncertainty.";

/// Anything that can turn a topic into a news digest
#[async_trait::async_trait]
pub trait NewsDigest: Send + Sync {
    /// Never fails: returns the digest or `NO_VERIFIED_NEWS`
    async fn fetch_news(&self, topic: &str) -> String;
}

/// Multi-source news aggregator.
///
/// Structured providers are queried concurrently, each under its own timeout, and merged
/// in priority order once all of them have answered. The web search provider runs only
/// when the structured pass came up short.
pub struct Aggregator {
    providers: Vec<Box<dyn NewsProvider>>,
    web_search: Option<Box<dyn NewsProvider>>,
    filter: ReliabilityFilter,
    provider_timeout: Duration,
    min_items_before_web_search: usize,
}

impl Aggregator {
    pub fn new(
        providers: Vec<Box<dyn NewsProvider>>,
        web_search: Option<Box<dyn NewsProvider>>,
        filter: ReliabilityFilter,
    ) -> Self {
        Self {
            providers,
            web_search,
            filter,
            provider_timeout: Duration::from_secs(20),
            min_items_before_web_search: 2,
        }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_min_items_before_web_search(mut self, min_items: usize) -> Self {
        self.min_items_before_web_search = min_items;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_client(&config.news)?;
        let (providers, web_search) = providers_from_config(&config.news, &client);
        let aggregator = Self::new(
            providers,
            web_search,
            ReliabilityFilter::from_config(&config.filter),
        )
        .with_provider_timeout(Duration::from_secs(
            config.news.provider_timeout_seconds.unwrap_or(20),
        ))
        .with_min_items_before_web_search(config.news.min_items_before_web_search.unwrap_or(2));
        Ok(aggregator)
    }

    pub fn providers(&self) -> &[Box<dyn NewsProvider>] {
        &self.providers
    }

    pub fn web_search(&self) -> Option<&dyn NewsProvider> {
        self.web_search.as_deref()
    }

    /// Gather filtered items from every configured provider
    pub async fn collect(&self, topic: &str) -> Vec<AggregatedItem> {
        info!(topic, "aggregator: hunting across {} sources", self.providers.len());

        let active = self.providers.iter().filter(|p| {
            if p.is_configured() {
                true
            } else {
                debug!(source = %p.tag(), "aggregator: no credentials, skipping");
                false
            }
        });

        let batches = join_all(active.map(|p| self.attempt(p.as_ref(), topic))).await;
        let mut items: Vec<AggregatedItem> = batches.into_iter().flatten().collect();

        if items.len() < self.min_items_before_web_search {
            if let Some(web) = self.web_search.as_deref().filter(|w| w.is_configured()) {
                info!(
                    collected = items.len(),
                    "aggregator: structured sources came up short, trying web search"
                );
                items.extend(self.attempt(web, topic).await);
            }
        }

        items
    }

    async fn attempt(&self, provider: &dyn NewsProvider, topic: &str) -> Vec<AggregatedItem> {
        let tag = provider.tag();
        let fetched = tokio::time::timeout(
            self.provider_timeout,
            provider.fetch(topic, provider.default_limit()),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout(self.provider_timeout)));

        match fetched {
            Ok(items) => {
                let total = items.len();
                let kept: Vec<AggregatedItem> = items
                    .into_iter()
                    .filter(|item| {
                        self.filter
                            .is_reliable(item.url.as_deref().unwrap_or(""), &item.title)
                    })
                    .collect();
                info!(source = %tag, total, kept = kept.len(), "aggregator: provider answered");
                kept
            }
            Err(e) => {
                warn!(source = %tag, error = %e, "aggregator: provider failed, continuing without it");
                Vec::new()
            }
        }
    }
}

/// Join items into the digest text, or the sentinel when there are none
pub fn render_digest(items: &[AggregatedItem]) -> String {
    if items.is_empty() {
        return NO_VERIFIED_NEWS.to_string();
    }
    items
        .iter()
        .map(AggregatedItem::digest_line)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait::async_trait]
impl NewsDigest for Aggregator {
    async fn fetch_news(&self, topic: &str) -> String {
        let items = self.collect(topic).await;
        if items.is_empty() {
            warn!(topic, "aggregator: no verified news found");
        }
        render_digest(&items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::SourceTag;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubProvider {
        tag: SourceTag,
        configured: bool,
        delay: Duration,
        outcome: Result<Vec<(&'static str, &'static str)>, &'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn ok(tag: SourceTag, items: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                tag,
                configured: true,
                delay: Duration::ZERO,
                outcome: Ok(items),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(tag: SourceTag) -> Self {
            Self {
                outcome: Err("boom"),
                ..Self::ok(tag, vec![])
            }
        }
    }

    #[async_trait::async_trait]
    impl NewsProvider for StubProvider {
        fn tag(&self) -> SourceTag {
            self.tag
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        fn default_limit(&self) -> usize {
            3
        }

        async fn fetch(&self, _query: &str, limit: usize) -> Result<Vec<AggregatedItem>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match &self.outcome {
                Ok(items) => Ok(items
                    .iter()
                    .take(limit)
                    .map(|(title, url)| {
                        let mut item = AggregatedItem::new(self.tag, *title, "body");
                        item.source_name = Some("Wire".to_string());
                        if !url.is_empty() {
                            item.url = Some(url.to_string());
                        }
                        item
                    })
                    .collect()),
                Err(reason) => Err(ProviderError::Decode(reason.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn empty_everywhere_yields_sentinel() {
        let aggregator = Aggregator::new(
            vec![
                Box::new(StubProvider::ok(SourceTag::GNews, vec![])),
                Box::new(StubProvider::failing(SourceTag::NewsData)),
            ],
            Some(Box::new(StubProvider::ok(SourceTag::WebSearch, vec![]))),
            ReliabilityFilter::default(),
        );
        assert_eq!(aggregator.fetch_news("Quantum Computing").await, NO_VERIFIED_NEWS);
    }

    #[tokio::test]
    async fn failures_are_absorbed_and_priority_order_kept() {
        let mut slow = StubProvider::ok(SourceTag::GNews, vec![("First", "https://a.com/1")]);
        slow.delay = Duration::from_millis(30);
        let aggregator = Aggregator::new(
            vec![
                Box::new(slow),
                Box::new(StubProvider::failing(SourceTag::MarketAux)),
                Box::new(StubProvider::ok(
                    SourceTag::NewsData,
                    vec![("Second", "https://b.com/2")],
                )),
            ],
            None,
            ReliabilityFilter::default(),
        );

        let digest = aggregator.fetch_news("chips").await;
        assert_eq!(
            digest,
            "[GNews] First (Wire): body\n\n[NewsData] Second: body"
        );
    }

    #[tokio::test]
    async fn unconfigured_provider_is_never_called() {
        let mut locked = StubProvider::ok(SourceTag::Guardian, vec![("Hidden", "")]);
        locked.configured = false;
        let calls = locked.calls.clone();
        let aggregator = Aggregator::new(vec![Box::new(locked)], None, ReliabilityFilter::default());

        assert_eq!(aggregator.fetch_news("x").await, NO_VERIFIED_NEWS);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreliable_items_are_dropped() {
        let aggregator = Aggregator::new(
            vec![Box::new(StubProvider::ok(
                SourceTag::GNews,
                vec![
                    ("Deep dive", "https://medium.com/@x/deep"),
                    ("Opinion: chips are over", "https://reuters.com/o"),
                    ("Kept story", "https://reuters.com/k"),
                ],
            ))],
            None,
            ReliabilityFilter::default(),
        )
        .with_min_items_before_web_search(0);

        let items = aggregator.collect("chips").await;
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Kept story"]);
    }

    #[tokio::test]
    async fn web_search_runs_only_when_short() {
        let web = StubProvider::ok(SourceTag::WebSearch, vec![("Web hit", "https://x.org/w")]);
        let web_calls = web.calls.clone();
        let aggregator = Aggregator::new(
            vec![Box::new(StubProvider::ok(
                SourceTag::GNews,
                vec![("Only one", "https://a.com/1")],
            ))],
            Some(Box::new(web)),
            ReliabilityFilter::default(),
        );
        let items = aggregator.collect("x").await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].source, SourceTag::WebSearch);
        assert_eq!(web_calls.load(Ordering::SeqCst), 1);

        let web = StubProvider::ok(SourceTag::WebSearch, vec![("Web hit", "https://x.org/w")]);
        let web_calls = web.calls.clone();
        let aggregator = Aggregator::new(
            vec![Box::new(StubProvider::ok(
                SourceTag::GNews,
                vec![("One", "https://a.com/1"), ("Two", "https://a.com/2")],
            ))],
            Some(Box::new(web)),
            ReliabilityFilter::default(),
        );
        assert_eq!(aggregator.collect("x").await.len(), 2);
        assert_eq!(web_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hanging_provider_does_not_block_others() {
        let mut hanging = StubProvider::ok(SourceTag::GoogleNews, vec![("Late", "https://g.com/1")]);
        hanging.delay = Duration::from_secs(30);
        let aggregator = Aggregator::new(
            vec![
                Box::new(StubProvider::ok(SourceTag::GNews, vec![("Fast", "https://a.com/1")])),
                Box::new(hanging),
            ],
            None,
            ReliabilityFilter::default(),
        )
        .with_provider_timeout(Duration::from_millis(50));

        let started = std::time::Instant::now();
        let items = aggregator.collect("x").await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Fast");
    }
}
