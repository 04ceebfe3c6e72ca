use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

/// Rel values that identify an icon link.
pub const ICON_RELS: [&str; 6] = [
    "icon",
    "shortcut icon",
    "apple-touch-icon",
    "apple-touch-icon-precomposed",
    "mask-icon",
    "fluid-icon",
];

/// Icon MIME types, most preferred first.
pub const ICON_TYPES: [&str; 5] = [
    "image/png",
    "image/svg+xml",
    "image/jpeg",
    "image/x-icon",
    "image/vnd.microsoft.icon",
];

/// Declared icon sizes, largest first.
pub const ICON_SIZES: [&str; 11] = [
    "256x256", "192x192", "180x180", "152x152", "144x144", "128x128", "96x96", "64x64",
    "48x48", "32x32", "16x16",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconLink {
    pub rel: String,
    pub href: String,
    pub mime: Option<String>,
    pub sizes: Option<String>,
}

impl IconLink {
    pub fn extension(&self) -> Option<String> {
        let path = self.href.split(['?', '#']).next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or_default();
        file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
    }

    pub fn has_extension(&self, wanted: &[&str]) -> bool {
        self.extension().is_some_and(|ext| wanted.contains(&ext.as_str()))
    }

    pub fn has_mime(&self, wanted: &[&str]) -> bool {
        self.mime.as_deref().is_some_and(|m| wanted.contains(&m))
    }

    pub fn declares_size(&self, size: &str) -> bool {
        self.sizes
            .as_deref()
            .is_some_and(|s| s.split_whitespace().any(|declared| declared.eq_ignore_ascii_case(size)))
    }

    pub fn is_apple_touch(&self) -> bool {
        self.rel.starts_with("apple-touch-icon")
    }
}

/// Every `<link>` whose rel is one of `ICON_RELS`, in document order.
pub fn icon_links(html: &str) -> Vec<IconLink> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("link[rel][href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let attrs = element.value();
            let rel = attrs.attr("rel")?.trim().to_ascii_lowercase();
            let href = attrs.attr("href")?.trim();
            if href.is_empty() || !ICON_RELS.contains(&rel.as_str()) {
                return None;
            }
            Some(IconLink {
                rel,
                href: href.to_string(),
                mime: attrs.attr("type").map(|t| t.trim().to_ascii_lowercase()),
                sizes: attrs.attr("sizes").map(|s| s.trim().to_string()),
            })
        })
        .collect()
}

/// Trimmed text of the first non-empty `<title>`.
pub fn first_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>();
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkPreview {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl LinkPreview {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image.is_none()
    }
}

/// Open Graph fields, falling back to `<title>` and the description meta tag.
pub fn preview(html: &str, page: &Url) -> LinkPreview {
    let document = Html::parse_document(html);

    let meta = |selector: &str| -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        document
            .select(&selector)
            .filter_map(|e| e.value().attr("content"))
            .map(str::trim)
            .find(|c| !c.is_empty())
            .map(str::to_string)
    };

    let title = meta("meta[property=\"og:title\"]")
        .or_else(|| meta("meta[name=\"twitter:title\"]"))
        .or_else(|| first_title(html));
    let description = meta("meta[property=\"og:description\"]")
        .or_else(|| meta("meta[name=\"description\"]"));
    let image = meta("meta[property=\"og:image\"]")
        .or_else(|| meta("meta[name=\"twitter:image\"]"))
        .and_then(|href| absolute_href(page, &href));

    LinkPreview {
        title,
        description,
        image,
    }
}

/// Resolves an href found on `page`: `//host/x` becomes `https://host/x`, and
/// relative references resolve against the page's origin.
pub fn absolute_href(page: &Url, href: &str) -> Option<String> {
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if Url::parse(href).is_ok() {
        return Some(href.to_string());
    }
    let origin = Url::parse(&page.origin().ascii_serialization()).ok()?;
    let base = if href.starts_with('/') {
        origin
    } else {
        origin.join("/").ok()?
    };
    base.join(href).ok().map(String::from)
}
