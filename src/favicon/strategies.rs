use async_trait::async_trait;
use url::Url;

use super::fetch::PageFetcher;
use super::html::{ICON_SIZES, ICON_TYPES, IconLink, absolute_href, icon_links};

/// One way of finding an icon. Strategies run in priority order until one answers.
#[async_trait]
pub trait IconStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, url: &Url, fetcher: &dyn PageFetcher) -> Option<String>;
}

/// Hostname without a leading `www.`, lowercased.
pub fn bare_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

fn is_web(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

const STATIC_ICONS: [(&str, &str); 25] = [
    ("github.com", "https://github.githubassets.com/favicons/favicon.svg"),
    ("gitlab.com", "https://gitlab.com/favicon.png"),
    ("bitbucket.org", "https://bitbucket.org/favicon.ico"),
    ("twitter.com", "https://abs.twimg.com/favicons/twitter.3.ico"),
    ("x.com", "https://abs.twimg.com/favicons/twitter.3.ico"),
    ("linkedin.com", "https://www.linkedin.com/favicon.ico"),
    ("youtube.com", "https://www.youtube.com/s/desktop/favicon_144x144.png"),
    ("youtu.be", "https://www.youtube.com/s/desktop/favicon_144x144.png"),
    ("reddit.com", "https://www.redditstatic.com/desktop2x/img/favicon/apple-icon-180x180.png"),
    ("instagram.com", "https://www.instagram.com/favicon.ico"),
    ("facebook.com", "https://www.facebook.com/favicon.ico"),
    ("medium.com", "https://medium.com/favicon.ico"),
    ("dev.to", "https://dev.to/favicon.ico"),
    ("stackoverflow.com", "https://cdn.sstatic.net/Sites/stackoverflow/Img/apple-touch-icon.png"),
    ("npmjs.com", "https://static-production.npmjs.com/favicon.ico"),
    ("crates.io", "https://crates.io/assets/cargo.png"),
    ("pypi.org", "https://pypi.org/favicon.ico"),
    ("vercel.app", "https://vercel.com/favicon.ico"),
    ("vercel.com", "https://vercel.com/favicon.ico"),
    ("netlify.app", "https://www.netlify.com/favicon.ico"),
    ("dribbble.com", "https://dribbble.com/favicon.ico"),
    ("behance.net", "https://www.behance.net/favicon.ico"),
    ("figma.com", "https://static.figma.com/app/icon/1/favicon.svg"),
    ("producthunt.com", "https://www.producthunt.com/favicon.ico"),
    ("huggingface.co", "https://huggingface.co/favicon.ico"),
];

/// Fixed icons for well-known hosts. Never touches the network.
pub struct StaticIconTable;

impl StaticIconTable {
    pub fn lookup(host: &str) -> Option<&'static str> {
        STATIC_ICONS
            .iter()
            .find(|(known, _)| *known == host)
            .map(|(_, icon)| *icon)
    }
}

#[async_trait]
impl IconStrategy for StaticIconTable {
    fn name(&self) -> &'static str {
        "static-table"
    }

    async fn resolve(&self, url: &Url, _fetcher: &dyn PageFetcher) -> Option<String> {
        let host = bare_host(url)?;
        Self::lookup(&host).map(str::to_string)
    }
}

/// Reads the target page and picks among its declared icon links.
pub struct PageIconLinks;

impl PageIconLinks {
    /// Passes that accept a candidate without verifying it.
    fn unverified_pick(links: &[IconLink]) -> Option<&IconLink> {
        // Plain rel="icon" without type or sizes, skipping .ico when possible.
        links
            .iter()
            .find(|l| l.rel == "icon" && l.mime.is_none() && l.sizes.is_none() && !l.has_extension(&["ico"]))
            .or_else(|| links.iter().find(|l| l.is_apple_touch() && l.has_extension(&["png"])))
            .or_else(|| links.iter().find(|l| l.has_extension(&["png", "jpg", "jpeg"])))
            .or_else(|| links.iter().find(|l| l.has_extension(&["svg", "ico"])))
    }

    /// Candidates that must respond to a HEAD request before being accepted, best first.
    fn verified_candidates(links: &[IconLink]) -> Vec<&IconLink> {
        let mut candidates = Vec::new();
        for mime in ICON_TYPES {
            for size in ICON_SIZES {
                candidates.extend(
                    links
                        .iter()
                        .filter(|l| l.has_mime(&[mime]) && l.declares_size(size)),
                );
            }
        }
        candidates.extend(links.iter());
        candidates
    }
}

#[async_trait]
impl IconStrategy for PageIconLinks {
    fn name(&self) -> &'static str {
        "page-links"
    }

    async fn resolve(&self, url: &Url, fetcher: &dyn PageFetcher) -> Option<String> {
        if !is_web(url) {
            return None;
        }
        let html = fetcher.fetch_text(url.as_str()).await?;
        let links = icon_links(&html);
        if links.is_empty() {
            return None;
        }

        if let Some(icon) = Self::unverified_pick(&links).and_then(|l| absolute_href(url, &l.href)) {
            return Some(icon);
        }

        let mut tried = Vec::new();
        for link in Self::verified_candidates(&links) {
            let Some(candidate) = absolute_href(url, &link.href) else {
                continue;
            };
            if tried.contains(&candidate) {
                continue;
            }
            if fetcher.responds(&candidate).await {
                return Some(candidate);
            }
            tried.push(candidate);
        }
        None
    }
}

const CONVENTIONAL_PATHS: [&str; 6] = [
    "/apple-touch-icon.png",
    "/favicon.png",
    "/favicon.jpg",
    "/favicon.jpeg",
    "/favicon.svg",
    "/favicon.ico",
];

/// Checks the usual icon locations at the target's origin.
pub struct ConventionalPaths;

#[async_trait]
impl IconStrategy for ConventionalPaths {
    fn name(&self) -> &'static str {
        "conventional-paths"
    }

    async fn resolve(&self, url: &Url, fetcher: &dyn PageFetcher) -> Option<String> {
        if !is_web(url) {
            return None;
        }
        let origin = url.origin().ascii_serialization();
        for path in CONVENTIONAL_PATHS {
            let candidate = format!("{origin}{path}");
            if fetcher.responds(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }
}

/// Third-party favicon services, tried in order.
pub struct FallbackServices;

impl FallbackServices {
    pub fn candidates(host: &str) -> [String; 5] {
        [
            format!("https://www.google.com/s2/favicons?domain={host}&sz=64"),
            format!("https://icons.duckduckgo.com/ip3/{host}.ico"),
            format!("https://favicon.yandex.net/favicon/{host}"),
            format!("https://icon.horse/icon/{host}"),
            format!("https://api.faviconkit.com/{host}/64"),
        ]
    }
}

#[async_trait]
impl IconStrategy for FallbackServices {
    fn name(&self) -> &'static str {
        "fallback-services"
    }

    async fn resolve(&self, url: &Url, fetcher: &dyn PageFetcher) -> Option<String> {
        let host = url.host_str()?;
        for candidate in Self::candidates(host) {
            if fetcher.responds(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }
}

/// Last resort when nothing answered; returned without checking.
pub fn generic_icon_url(host: &str) -> String {
    format!("https://www.google.com/s2/favicons?domain={host}&sz=128")
}
