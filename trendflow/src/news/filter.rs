use common::FilterConfig;

/// Publishing platforms whose content is mostly self-published opinion
pub const DEFAULT_BLOCKED_DOMAINS: &[&str] = &[
    "medium.com",
    "linkedin.com",
    "substack.com",
    "wordpress.com",
    "blogspot.com",
    "tumblr.com",
];

/// Title markers for op-eds and paid placements
pub const DEFAULT_TITLE_MARKERS: &[&str] = &["opinion:", "sponsored"];

/// Rejects items from low-trust domains or with clickbait/sponsorship titles.
/// Matching is case-insensitive substring matching on the whole URL and title.
#[derive(Debug, Clone)]
pub struct ReliabilityFilter {
    blocked_domains: Vec<String>,
    title_markers: Vec<String>,
}

impl Default for ReliabilityFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_BLOCKED_DOMAINS.iter().map(|s| s.to_string()),
            DEFAULT_TITLE_MARKERS.iter().map(|s| s.to_string()),
        )
    }
}

impl ReliabilityFilter {
    pub fn new(
        blocked_domains: impl IntoIterator<Item = String>,
        title_markers: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            blocked_domains: blocked_domains
                .into_iter()
                .map(|d| d.to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            title_markers: title_markers
                .into_iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        let defaults = Self::default();
        Self::new(
            config
                .blocked_domains
                .clone()
                .unwrap_or(defaults.blocked_domains),
            config.title_markers.clone().unwrap_or(defaults.title_markers),
        )
    }

    pub fn is_reliable(&self, url: &str, title: &str) -> bool {
        let url = url.to_lowercase();
        if self.blocked_domains.iter().any(|d| url.contains(d.as_str())) {
            return false;
        }
        let title = title.to_lowercase();
        !self.title_markers.iter().any(|m| title.contains(m.as_str()))
    }
}
