use crate::url::{extract_domain, parse_http_url};
use crate::UrlError;
use tokio::time::Instant;
use url::Url;

/// A page waiting in (or taken from) the frontier
///
/// Items are immutable once built; whoever holds one owns it outright.
#[derive(Debug, Clone)]
pub struct CrawlItem {
    url: Url,
    priority: i32,
    depth: u32,
    domain: String,
    enqueued_at: Instant,
}

impl CrawlItem {
    /// Builds an item whose priority equals its depth
    ///
    /// # Errors
    ///
    /// Fails when the URL does not parse, is not http(s), or has no host.
    pub fn new(raw_url: &str, depth: u32) -> Result<Self, UrlError> {
        Self::with_priority(raw_url, depth, depth as i32)
    }

    /// Builds an item with an explicit priority (lower is served first)
    pub fn with_priority(raw_url: &str, depth: u32, priority: i32) -> Result<Self, UrlError> {
        let url = parse_http_url(raw_url)?;
        let domain = extract_domain(&url).ok_or(UrlError::MissingDomain)?;

        Ok(Self {
            url,
            priority,
            depth,
            domain,
            enqueued_at: Instant::now(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }
}
