use scraper::{Html, Selector};

use common::ProviderConfig;

use super::{plain_text, AggregatedItem, NewsProvider, ProviderError, SourceTag};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";
/// Platforms excluded at query time; the reliability filter catches the rest
const EXCLUDED_SITES: &[&str] = &["medium.com", "linkedin.com", "substack.com"];

/// DuckDuckGo HTML search over the past week. Last resort when structured APIs come up short.
pub struct WebSearchProvider {
    client: reqwest::Client,
    base_url: String,
    max_items: usize,
}

impl WebSearchProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_items: config.max_items.unwrap_or(3),
        }
    }
}

pub(crate) fn build_query(topic: &str) -> String {
    let mut q = format!("{} news", topic);
    for site in EXCLUDED_SITES {
        q.push_str(&format!(" -site:{}", site));
    }
    q
}

/// Result links go through a `/l/?uddg=<target>` redirect; unwrap it
fn resolve_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    url::Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or(absolute)
}

pub(crate) fn parse_results(html: &str, limit: usize) -> Vec<AggregatedItem> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(title_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse(".result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    document
        .select(&result_sel)
        .filter_map(|result| {
            let anchor = result.select(&title_sel).next()?;
            let title = plain_text(&anchor.text().collect::<String>());
            if title.is_empty() {
                return None;
            }
            let body = result
                .select(&snippet_sel)
                .next()
                .map(|s| plain_text(&s.text().collect::<String>()))
                .unwrap_or_default();
            let mut item = AggregatedItem::new(SourceTag::WebSearch, title, body);
            item.url = anchor.value().attr("href").map(resolve_link);
            Some(item)
        })
        .take(limit)
        .collect()
}

#[async_trait::async_trait]
impl NewsProvider for WebSearchProvider {
    fn tag(&self) -> SourceTag {
        SourceTag::WebSearch
    }

    fn default_limit(&self) -> usize {
        self.max_items
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<AggregatedItem>, ProviderError> {
        let q = build_query(query);
        let response = self
            .client
            .get(format!("{}/html/", self.base_url))
            .query(&[("q", q.as_str()), ("kl", "wt-wt"), ("df", "w")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }
        let body = response.text().await?;
        Ok(parse_results(&body, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<html><body>
<div class="result results_links web-result">
  <h2 class="result__title"><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.reuters.com%2Ftech%2Fchips&amp;rut=abc">Chipmakers <b>rally</b></a></h2>
  <a class="result__snippet" href="#">Shares of chipmakers rose 5% on Tuesday.</a>
</div>
<div class="result results_links web-result">
  <h2 class="result__title"><a class="result__a" href="https://example.com/direct">Direct link</a></h2>
</div>
</body></html>"##;

    #[test]
    fn parses_results_and_unwraps_redirects() {
        let items = parse_results(PAGE, 3);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Chipmakers rally");
        assert_eq!(items[0].body_snippet, "Shares of chipmakers rose 5% on Tuesday.");
        assert_eq!(items[0].url.as_deref(), Some("https://www.reuters.com/tech/chips"));
        assert_eq!(items[1].url.as_deref(), Some("https://example.com/direct"));
        assert_eq!(items[1].body_snippet, "");
    }

    #[test]
    fn limit_caps_results() {
        assert_eq!(parse_results(PAGE, 1).len(), 1);
    }

    #[test]
    fn query_excludes_opinion_platforms() {
        assert_eq!(
            build_query("Nvidia"),
            "Nvidia news -site:medium.com -site:linkedin.com -site:substack.com"
        );
    }
}
