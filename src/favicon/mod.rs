//! Best-effort icon, title and preview lookup for arbitrary links.
//!
//! Nothing here fails: every lookup degrades to a fallback value.

mod enrich;
mod fetch;
mod html;
mod strategies;

use std::sync::Arc;

use url::Url;

pub use enrich::{enrich_projects, enrich_social_links};
pub use fetch::{FetchError, HttpFetcher, PageFetcher, StaticFetcher};
pub use html::LinkPreview;
pub use strategies::{
    ConventionalPaths, FallbackServices, IconStrategy, PageIconLinks, StaticIconTable, bare_host,
    generic_icon_url,
};

/// Hosts that refuse to be embedded, so a preview card is built for them instead.
const PREVIEW_HOSTS: [&str; 5] = ["github.com", "twitter.com", "x.com", "reddit.com", "youtube.com"];

pub struct LinkMetadataResolver {
    fetcher: Arc<dyn PageFetcher>,
    strategies: Vec<Box<dyn IconStrategy>>,
}

impl LinkMetadataResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_strategies(
            fetcher,
            vec![
                Box::new(StaticIconTable),
                Box::new(PageIconLinks),
                Box::new(ConventionalPaths),
                Box::new(FallbackServices),
            ],
        )
    }

    pub fn with_strategies(fetcher: Arc<dyn PageFetcher>, strategies: Vec<Box<dyn IconStrategy>>) -> Self {
        Self { fetcher, strategies }
    }

    /// Icon URL for `url`, or an empty string when `url` is not a URL with a host.
    pub async fn resolve_icon(&self, url: &str) -> String {
        match self.find_icon(url).await {
            Some(icon) => icon,
            None => fallback_icon(url),
        }
    }

    /// Icon found by one of the strategies, without the generic last resort.
    pub async fn find_icon(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url.trim()).ok()?;
        for strategy in &self.strategies {
            if let Some(icon) = strategy.resolve(&parsed, self.fetcher.as_ref()).await {
                tracing::debug!("Icon for {} found by {}", url, strategy.name());
                return Some(icon);
            }
        }
        None
    }

    /// Preview card for hosts that block embedding; `None` for every other link.
    pub async fn resolve_preview(&self, url: &str) -> Option<LinkPreview> {
        let parsed = Url::parse(url.trim()).ok()?;
        let host = bare_host(&parsed)?;
        if !PREVIEW_HOSTS.contains(&host.as_str()) {
            return None;
        }
        let preview = match self.fetcher.fetch_text(parsed.as_str()).await {
            Some(page) => html::preview(&page, &parsed),
            None => LinkPreview::default(),
        };
        Some(preview)
    }

    /// First `<title>` of the page, else its hostname.
    pub async fn page_title(&self, url: &str) -> String {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return url.trim().to_string();
        };
        let hostname = parsed.host_str().unwrap_or_default().to_string();
        if !matches!(parsed.scheme(), "http" | "https") {
            return hostname;
        }
        self.fetcher
            .fetch_text(parsed.as_str())
            .await
            .and_then(|page| html::first_title(&page))
            .unwrap_or(hostname)
    }
}

/// Generic favicon-service URL for the host of `url`; empty without a host.
pub fn fallback_icon(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|parsed| parsed.host_str().map(generic_icon_url))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_fetcher(fetcher: StaticFetcher) -> (LinkMetadataResolver, Arc<StaticFetcher>) {
        let fetcher = Arc::new(fetcher);
        (LinkMetadataResolver::new(fetcher.clone()), fetcher)
    }

    #[tokio::test]
    async fn known_hosts_resolve_without_network() {
        let (resolver, fetcher) = with_fetcher(StaticFetcher::new());
        assert_eq!(
            resolver.resolve_icon("https://github.com/x/y").await,
            "https://github.githubassets.com/favicons/favicon.svg"
        );
        assert_eq!(
            resolver.resolve_icon("https://www.youtube.com/watch?v=1").await,
            "https://www.youtube.com/s/desktop/favicon_144x144.png"
        );
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn malformed_urls_resolve_to_empty() {
        let (resolver, fetcher) = with_fetcher(StaticFetcher::new());
        assert_eq!(resolver.resolve_icon("not a url").await, "");
        assert_eq!(resolver.resolve_icon("").await, "");
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn plain_icon_link_is_taken_from_the_page() {
        let page = r#"<link rel="icon" href="/favicon.ico"><link rel="icon" href="/logo.svg">"#;
        let (resolver, _) = with_fetcher(StaticFetcher::new().with_page("https://ada.dev/", page));
        assert_eq!(resolver.resolve_icon("https://ada.dev/").await, "https://ada.dev/logo.svg");
    }

    #[tokio::test]
    async fn apple_touch_png_beats_typed_icons() {
        let page = r#"
            <link rel="icon" type="image/x-icon" href="/favicon.ico">
            <link rel="apple-touch-icon" href="//cdn.ada.dev/touch.png">
        "#;
        let (resolver, _) = with_fetcher(StaticFetcher::new().with_page("https://ada.dev/", page));
        assert_eq!(
            resolver.resolve_icon("https://ada.dev/").await,
            "https://cdn.ada.dev/touch.png"
        );
    }

    #[tokio::test]
    async fn sized_candidates_are_verified_largest_first() {
        // Extensionless hrefs skip the unverified passes.
        let page = r#"
            <link rel="icon" type="image/png" sizes="32x32" href="/icon?s=32">
            <link rel="icon" type="image/png" sizes="192x192" href="/icon?s=192">
            <link rel="icon" type="image/png" sizes="256x256" href="/icon?s=256">
        "#;
        let fetcher = StaticFetcher::new()
            .with_page("https://ada.dev/", page)
            .with_resource("https://ada.dev/icon?s=192")
            .with_resource("https://ada.dev/icon?s=32");
        let (resolver, fetcher) = with_fetcher(fetcher);

        assert_eq!(resolver.resolve_icon("https://ada.dev/").await, "https://ada.dev/icon?s=192");
        let checked: Vec<String> = fetcher.requests().into_iter().skip(1).collect();
        assert_eq!(checked, vec!["https://ada.dev/icon?s=256", "https://ada.dev/icon?s=192"]);
    }

    #[tokio::test]
    async fn conventional_paths_then_services_then_generic() {
        let (resolver, _) = with_fetcher(
            StaticFetcher::new().with_resource("https://ada.dev/favicon.svg"),
        );
        assert_eq!(resolver.resolve_icon("https://ada.dev/about").await, "https://ada.dev/favicon.svg");

        let (resolver, _) = with_fetcher(
            StaticFetcher::new().with_resource("https://icons.duckduckgo.com/ip3/ada.dev.ico"),
        );
        assert_eq!(
            resolver.resolve_icon("https://ada.dev/").await,
            "https://icons.duckduckgo.com/ip3/ada.dev.ico"
        );

        let (resolver, _) = with_fetcher(StaticFetcher::new());
        assert_eq!(
            resolver.resolve_icon("https://ada.dev/").await,
            generic_icon_url("ada.dev")
        );
    }

    #[tokio::test]
    async fn generic_fallback_is_not_reported_as_found() {
        let (resolver, _) = with_fetcher(StaticFetcher::new());
        assert_eq!(resolver.find_icon("https://ada.dev/").await, None);
        assert_eq!(fallback_icon("https://ada.dev/"), generic_icon_url("ada.dev"));
        assert_eq!(fallback_icon("not a url"), "");

        let (resolver, _) = with_fetcher(StaticFetcher::new());
        assert_eq!(
            resolver.find_icon("https://github.com/x").await.as_deref(),
            Some("https://github.githubassets.com/favicons/favicon.svg")
        );
    }

    #[tokio::test]
    async fn previews_only_for_embed_blocking_hosts() {
        let page = r#"<title>x/y</title><meta property="og:description" content="A repo">"#;
        let (resolver, _) = with_fetcher(StaticFetcher::new().with_page("https://github.com/x/y", page));

        let preview = resolver.resolve_preview("https://github.com/x/y").await.unwrap();
        assert_eq!(preview.title.as_deref(), Some("x/y"));
        assert_eq!(preview.description.as_deref(), Some("A repo"));

        assert!(resolver.resolve_preview("https://ada.dev/").await.is_none());
        let unreachable = resolver.resolve_preview("https://www.reddit.com/r/rust").await.unwrap();
        assert!(unreachable.is_empty());
    }

    #[tokio::test]
    async fn page_title_falls_back_to_hostname() {
        let (resolver, _) = with_fetcher(
            StaticFetcher::new().with_page("https://ada.dev/", "<title>Ada</title>"),
        );
        assert_eq!(resolver.page_title("https://ada.dev/").await, "Ada");
        assert_eq!(resolver.page_title("https://other.dev/x").await, "other.dev");
    }
}
