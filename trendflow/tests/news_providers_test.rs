use mockito::Matcher;

use common::{Config, NewsConfig, ProviderConfig};
use trendflow::news::{
    fetch_structured_news, Aggregator, GNewsProvider, GoogleNewsProvider, GuardianProvider,
    MarketAuxProvider, NewsDataProvider, NewsDigest, NewsProvider, NytProvider, ProviderError,
    SourceTag, DIGEST_WINDOW, NO_VERIFIED_NEWS,
};

fn pointed_at(url: &str) -> ProviderConfig {
    ProviderConfig {
        base_url: Some(url.to_string()),
        ..Default::default()
    }
}

fn disabled() -> Option<ProviderConfig> {
    Some(ProviderConfig {
        enabled: Some(false),
        ..Default::default()
    })
}

fn key() -> Option<String> {
    Some("test-key".to_string())
}

#[tokio::test]
async fn test_gnews_items_carry_publisher() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v4/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "Nvidia AND Blackwell".into()),
            Matcher::UrlEncoded("max".into(), "3".into()),
            Matcher::UrlEncoded("apikey".into(), "test-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"totalArticles": 2, "articles": [
                {"title": "Nvidia ships Blackwell", "description": "Volume shipments begin",
                 "url": "https://www.reuters.com/a", "image": null,
                 "publishedAt": "2025-05-01T10:00:00Z", "source": {"name": "Reuters"}},
                {"title": null, "description": "no title, dropped"}
            ]}"#,
        )
        .create_async()
        .await;

    let provider = GNewsProvider::new(reqwest::Client::new(), key(), &pointed_at(&server.url()));
    let items = provider.fetch("Nvidia AND Blackwell", 3).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].digest_line(),
        "[GNews] Nvidia ships Blackwell (Reuters): Volume shipments begin"
    );
    assert_eq!(items[0].url.as_deref(), Some("https://www.reuters.com/a"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_marketaux_missing_entities_mean_not_available() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/news/all")
        .match_query(Matcher::UrlEncoded("api_token".into(), "test-key".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data": [
                {"title": "Chip stocks rally", "description": "Up 4%", "url": "https://x.com/1",
                 "entities": []},
                {"title": "AMD guidance", "description": "Raised", "url": "https://x.com/2",
                 "entities": [{"symbol": "AMD", "sentiment_score": 0.5}]},
                {"title": "Null entities", "description": "d", "entities": null}
            ]}"#,
        )
        .create_async()
        .await;

    let provider = MarketAuxProvider::new(reqwest::Client::new(), key(), &pointed_at(&server.url()));
    let items = provider.fetch("chips", 3).await.unwrap();

    assert_eq!(items.len(), 3);
    assert_eq!(
        items[0].digest_line(),
        "[MarketAux - Sentiment: N/A] Chip stocks rally: Up 4%"
    );
    assert_eq!(
        items[1].digest_line(),
        "[MarketAux - Sentiment: 0.5] AMD guidance: Raised"
    );
    assert_eq!(items[2].sentiment_score, None);
}

#[tokio::test]
async fn test_nyt_tolerates_null_levels() {
    let mut server = mockito::Server::new_async().await;
    let _null_response = server
        .mock("GET", "/svc/search/v2/articlesearch.json")
        .match_query(Matcher::UrlEncoded("q".into(), "empty".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "OK", "response": null}"#)
        .create_async()
        .await;
    let _null_docs = server
        .mock("GET", "/svc/search/v2/articlesearch.json")
        .match_query(Matcher::UrlEncoded("q".into(), "nodocs".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "OK", "response": {"docs": null}}"#)
        .create_async()
        .await;
    let _docs = server
        .mock("GET", "/svc/search/v2/articlesearch.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "quantum".into()),
            Matcher::UrlEncoded("sort".into(), "newest".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"response": {"docs": [
                {"headline": {"main": "IBM unveils Condor"}, "abstract": "1,121 qubits",
                 "pub_date": "2025-04-30T12:00:00+0000", "web_url": "https://nytimes.com/a"},
                {"headline": {"main": "Google Willow"}, "abstract": null, "pub_date": null},
                {"headline": {"main": "Third is past the cap"}}
            ]}}"#,
        )
        .create_async()
        .await;

    let provider = NytProvider::new(reqwest::Client::new(), key(), &pointed_at(&server.url()));

    assert!(provider.fetch("empty", 2).await.unwrap().is_empty());
    assert!(provider.fetch("nodocs", 2).await.unwrap().is_empty());

    let items = provider.fetch("quantum", 2).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].digest_line(), "[NYT - 2025-04-30] IBM unveils Condor: 1,121 qubits");
    assert_eq!(items[1].digest_line(), "[NYT - N/A] Google Willow: No summary");
}

#[tokio::test]
async fn test_newsdata_and_guardian_shapes() {
    let mut server = mockito::Server::new_async().await;
    let _newsdata = server
        .mock("GET", "/api/1/news")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"status": "success", "results": [
                {"title": "EU AI Act enforcement", "description": "Fines start", "link": "https://e.eu/1",
                 "source_id": "euractiv", "pubDate": "2025-05-01 08:00:00"}
            ]}"#,
        )
        .create_async()
        .await;
    let _guardian = server
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("show-fields".into(), "trailText".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"response": {"status": "ok", "results": [
                {"webTitle": "Regulators circle", "webUrl": "https://theguardian.com/x",
                 "fields": {"trailText": "<strong>Brussels</strong> moves first"}},
                {"webTitle": "No fields at all"}
            ]}}"#,
        )
        .create_async()
        .await;

    let newsdata = NewsDataProvider::new(reqwest::Client::new(), key(), &pointed_at(&server.url()));
    let items = newsdata.fetch("EU AI Act", 2).await.unwrap();
    assert_eq!(items[0].digest_line(), "[NewsData] EU AI Act enforcement: Fines start");
    assert_eq!(items[0].source_name.as_deref(), Some("euractiv"));

    let guardian = GuardianProvider::new(reqwest::Client::new(), key(), &pointed_at(&server.url()));
    let items = guardian.fetch("EU AI Act", 2).await.unwrap();
    assert_eq!(items.len(), 2);
    assert!(items[0].body_snippet.contains("Brussels"));
    assert!(!items[0].body_snippet.contains('<'));
    assert_eq!(items[1].digest_line(), "[The Guardian] No fields at all: ");
}

#[tokio::test]
async fn test_google_news_rss() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/rss/search")
        .match_query(Matcher::UrlEncoded("q".into(), "AMD when:12h".into()))
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Google News</title>
<item><title>AMD MI300X ships - The Verge</title><link>https://news.google.com/articles/abc</link>
<pubDate>Thu, 01 May 2025 10:00:00 GMT</pubDate></item>
</channel></rss>"#,
        )
        .create_async()
        .await;

    let provider = GoogleNewsProvider::new(reqwest::Client::new(), &pointed_at(&server.url()))
        .with_window(DIGEST_WINDOW);
    assert!(provider.is_configured());
    let items = provider.fetch("AMD", 3).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].digest_line(),
        "[Google News] AMD MI300X ships (The Verge): https://news.google.com/articles/abc"
    );
}

#[tokio::test]
async fn test_headline_feed_queries_google_without_window() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rss/search")
        .match_query(Matcher::UrlEncoded("q".into(), "AMD".into()))
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Google News</title>
<item><title>AMD MI300X ships - The Verge</title><link>https://news.google.com/articles/abc</link></item>
</channel></rss>"#,
        )
        .create_async()
        .await;

    let unkeyed = ProviderConfig {
        api_key_env: Some("TRENDFLOW_TEST_HEADLINES_NO_KEY".to_string()),
        base_url: Some(server.url()),
        ..Default::default()
    };
    let config = NewsConfig {
        gnews: Some(unkeyed.clone()),
        newsdata: Some(unkeyed),
        google_news: Some(pointed_at(&server.url())),
        ..Default::default()
    };

    let items = fetch_structured_news(&config, "AMD", 10).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "AMD MI300X ships");
    assert_eq!(items[0].source, "The Verge");
    assert_eq!(items[0].summary, "Read full article on Google News...");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_and_garbage_become_provider_errors() {
    let mut server = mockito::Server::new_async().await;
    let _down = server
        .mock("GET", "/api/v4/search")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let _garbage = server
        .mock("GET", "/api/1/news")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let gnews = GNewsProvider::new(reqwest::Client::new(), key(), &pointed_at(&server.url()));
    match gnews.fetch("x", 3).await {
        Err(ProviderError::Status(status)) => assert_eq!(status.as_u16(), 500),
        other => panic!("expected status error, got {:?}", other.map(|v| v.len())),
    }

    let newsdata = NewsDataProvider::new(reqwest::Client::new(), key(), &pointed_at(&server.url()));
    assert!(matches!(
        newsdata.fetch("x", 2).await,
        Err(ProviderError::Decode(_))
    ));

    let locked = GNewsProvider::new(reqwest::Client::new(), None, &pointed_at(&server.url()));
    assert!(!locked.is_configured());
    assert!(matches!(
        locked.fetch("x", 3).await,
        Err(ProviderError::MissingCredentials)
    ));
}

#[tokio::test]
async fn test_aggregator_from_config_filters_and_degrades() {
    std::env::set_var("TRENDFLOW_TEST_AGG_GNEWS", "test-key");

    let mut server = mockito::Server::new_async().await;
    let _hit = server
        .mock("GET", "/api/v4/search")
        .match_query(Matcher::UrlEncoded("q".into(), "chips".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"articles": [
                {"title": "TSMC raises capex", "description": "To $40B", "url": "https://reuters.com/t",
                 "source": {"name": "Reuters"}},
                {"title": "Why chips matter", "description": "blog", "url": "https://medium.com/@a/b",
                 "source": {"name": "Medium"}},
                {"title": "Sponsored: buy our chips", "description": "ad", "url": "https://ads.example/x",
                 "source": {"name": "Ads"}}
            ]}"#,
        )
        .create_async()
        .await;
    let _miss = server
        .mock("GET", "/api/v4/search")
        .match_query(Matcher::UrlEncoded("q".into(), "nothing".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"articles": []}"#)
        .create_async()
        .await;

    let mut config = Config::default();
    config.news.gnews = Some(ProviderConfig {
        api_key_env: Some("TRENDFLOW_TEST_AGG_GNEWS".to_string()),
        base_url: Some(server.url()),
        ..Default::default()
    });
    config.news.marketaux = disabled();
    config.news.nyt = disabled();
    config.news.newsdata = disabled();
    config.news.guardian = disabled();
    config.news.google_news = disabled();
    config.news.web_search = disabled();

    let aggregator = Aggregator::from_config(&config).unwrap();
    assert_eq!(aggregator.providers().len(), 1);
    assert_eq!(aggregator.providers()[0].tag(), SourceTag::GNews);
    assert!(aggregator.web_search().is_none());

    assert_eq!(
        aggregator.fetch_news("chips").await,
        "[GNews] TSMC raises capex (Reuters): To $40B"
    );
    assert_eq!(aggregator.fetch_news("nothing").await, NO_VERIFIED_NEWS);
}
