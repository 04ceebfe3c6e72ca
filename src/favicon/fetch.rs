use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::redirect;
use thiserror::Error;
use url::{Host, Url};

/// Bodies are cut off here; titles and icon links live near the top of a page.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;
const MAX_REDIRECTS: usize = 5;

/// Network access used by the resolver. Failures are folded into `None`/`false`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Body of a successful GET, if any.
    async fn fetch_text(&self, url: &str) -> Option<String>;

    /// Whether the resource answers a HEAD (or, failing that, GET) with success.
    async fn responds(&self, url: &str) -> bool;
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{0} does not resolve to a public address")]
    NonPublicHost(String),

    #[error("more than {MAX_REDIRECTS} redirects")]
    TooManyRedirects,
}

/// Whether `ip` is an ordinary internet address, as opposed to loopback,
/// private, link-local, shared, documentation or otherwise reserved space.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4),
            None => {
                !(v6.is_loopback()
                    || v6.is_unspecified()
                    || v6.is_multicast()
                    || v6.is_unique_local()
                    || v6.is_unicast_link_local())
            }
        },
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    let shared = a == 100 && (b & 0xc0) == 64;
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        || shared
        || a == 0)
}

/// Scheme and literal-address check. Hostnames are checked when they resolve.
pub fn is_fetchable(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    match url.host() {
        Some(Host::Ipv4(ip)) => is_public_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_public_ip(IpAddr::V6(ip)),
        Some(Host::Domain(_)) => true,
        None => false,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Hop {
    Follow,
    Stop,
    TooMany,
}

fn redirect_hop(next: &Url, hops_so_far: usize) -> Hop {
    if hops_so_far >= MAX_REDIRECTS {
        Hop::TooMany
    } else if is_fetchable(next) {
        Hop::Follow
    } else {
        Hop::Stop
    }
}

/// DNS resolution that refuses hosts with any non-public address.
struct PublicOnlyResolver;

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_public(name.as_str().to_string()))
    }
}

async fn resolve_public(host: String) -> Result<Addrs, Box<dyn std::error::Error + Send + Sync>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();
    if addrs.is_empty() || addrs.iter().any(|addr| !is_public_ip(addr.ip())) {
        tracing::warn!("Refusing to fetch from {}", host);
        return Err(FetchError::NonPublicHost(host).into());
    }
    Ok(Box::new(addrs.into_iter()))
}

/// Outbound fetcher for user-supplied links. Only public http(s) hosts are
/// contacted, on every redirect hop, and bodies are read up to `MAX_BODY_BYTES`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (X11; Linux x86_64; rv:102.0) Gecko/20100101 Firefox/102.0",
            ),
        );
        let policy = redirect::Policy::custom(|attempt| {
            match redirect_hop(attempt.url(), attempt.previous().len()) {
                Hop::Follow => attempt.follow(),
                Hop::Stop => attempt.stop(),
                Hop::TooMany => attempt.error(FetchError::TooManyRedirects),
            }
        });
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .redirect(policy)
            .dns_resolver(Arc::new(PublicOnlyResolver))
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    fn target(url: &str) -> Option<Url> {
        let parsed = Url::parse(url).ok()?;
        if is_fetchable(&parsed) {
            Some(parsed)
        } else {
            tracing::warn!("Refusing to fetch {}", url);
            None
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Option<String> {
        let target = Self::target(url)?;
        let mut response = match self.client.get(target).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!("GET {} answered {}", url, response.status());
                return None;
            }
            Err(e) => {
                tracing::debug!("GET {} failed: {}", url, e);
                return None;
            }
        };

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.ok()? {
            let room = MAX_BODY_BYTES - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                tracing::debug!("GET {} truncated at {} bytes", url, MAX_BODY_BYTES);
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Some(String::from_utf8_lossy(&body).into_owned())
    }

    async fn responds(&self, url: &str) -> bool {
        let Some(target) = Self::target(url) else {
            return false;
        };
        match self.client.head(target.clone()).send().await {
            Ok(response) if response.status().is_success() => true,
            // Some hosts refuse HEAD outright.
            Ok(response) if response.status() == reqwest::StatusCode::METHOD_NOT_ALLOWED => self
                .client
                .get(target)
                .send()
                .await
                .is_ok_and(|r| r.status().is_success()),
            _ => false,
        }
    }
}

/// Serves canned pages from memory and records every request it sees.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    live: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self.live.insert(url.to_string());
        self
    }

    /// Marks a URL as answering HEAD requests successfully.
    pub fn with_resource(mut self, url: &str) -> Self {
        self.live.insert(url.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn record(&self, url: &str) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch_text(&self, url: &str) -> Option<String> {
        self.record(url);
        self.pages.get(url).cloned()
    }

    async fn responds(&self, url: &str) -> bool {
        self.record(url);
        self.live.contains(url)
    }
}
