//! Page rendering and link extraction for stage 1
//!
//! The worker pool only depends on the [`Renderer`] trait. [`HttpRenderer`]
//! is the production implementation: it fetches a listing, keeps pulling
//! further pages of it until no new links show up, and returns every
//! article link it found as an absolute URL.

use crate::config::CrawlerConfig;
use crate::crawler::item::CrawlItem;
use crate::crawler::politeness::{wait_turn, DomainPolicy};
use crate::crawler::scroll::{expand_until_stable, Expandable};
use crate::url::normalize_url;
use crate::useragent::pick_user_agent;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::collections::HashSet;
use tokio::sync::Mutex;
use url::Url;

/// Renders a crawl item and returns the absolute links found on it
#[async_trait]
pub trait Renderer: Send + Sync + 'static {
    /// Per-worker resource checked out from the resource pool
    type Session: Send + 'static;

    /// Builds a new session; called lazily by the resource pool
    fn open_session(&self) -> Result<Self::Session, HarvestError>;

    /// Renders `item` and extracts its links
    ///
    /// The frontier has already waited `politeness` out for the first
    /// request. Any further request to the item's domain must wait its turn
    /// on the same policy.
    async fn render(
        &self,
        session: &mut Self::Session,
        item: &CrawlItem,
        politeness: &Mutex<DomainPolicy>,
    ) -> Result<Vec<String>, HarvestError>;
}

/// A reusable HTTP session
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
}

impl HttpSession {
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Renderer that expands paginated listings over plain HTTP
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    link_selector: Selector,
    timeout: std::time::Duration,
    max_scroll_attempts: u32,
    stable_scroll_rounds: u32,
    viewport: (u32, u32),
}

impl HttpRenderer {
    /// Creates a renderer from the crawler section of the configuration
    pub fn new(config: &CrawlerConfig) -> Result<Self, HarvestError> {
        let link_selector = Selector::parse(&config.link_selector).map_err(|e| {
            crate::ConfigError::InvalidSelector(format!("'{}': {:?}", config.link_selector, e))
        })?;

        Ok(Self {
            link_selector,
            timeout: config.request_timeout(),
            max_scroll_attempts: config.max_scroll_attempts,
            stable_scroll_rounds: config.stable_scroll_rounds,
            viewport: (config.viewport_width, config.viewport_height),
        })
    }

    /// Headers sent with every request of one render
    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(pick_user_agent()));
        headers.insert("Viewport-Width", HeaderValue::from(self.viewport.0));
        headers.insert("Sec-CH-Viewport-Height", HeaderValue::from(self.viewport.1));
        headers
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    type Session = HttpSession;

    fn open_session(&self) -> Result<HttpSession, HarvestError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(HttpSession { client })
    }

    async fn render(
        &self,
        session: &mut HttpSession,
        item: &CrawlItem,
        politeness: &Mutex<DomainPolicy>,
    ) -> Result<Vec<String>, HarvestError> {
        let headers = self.request_headers();

        let body = fetch_listing(&session.client, item.url(), &headers)
            .await
            .map_err(|message| HarvestError::Render {
                url: item.as_str().to_string(),
                message,
            })?;

        let mut listing = ListingPages {
            client: &session.client,
            base: item.url(),
            headers: &headers,
            selector: &self.link_selector,
            politeness,
            next_page: 2,
            links: Vec::new(),
            seen: HashSet::new(),
        };
        listing.absorb(&body);

        let initial = listing.links.len();
        let outcome = expand_until_stable(
            &mut listing,
            initial,
            self.max_scroll_attempts,
            self.stable_scroll_rounds,
        )
        .await;

        tracing::debug!(
            url = %item.url(),
            steps = outcome.steps,
            links = outcome.size,
            "Listing expanded"
        );

        Ok(listing.links)
    }
}

/// A listing being expanded one page at a time
struct ListingPages<'a> {
    client: &'a Client,
    base: &'a Url,
    headers: &'a HeaderMap,
    selector: &'a Selector,
    politeness: &'a Mutex<DomainPolicy>,
    next_page: u32,
    links: Vec<String>,
    seen: HashSet<String>,
}

impl<'a> ListingPages<'a> {
    /// Adds the links of one page, ignoring ones already collected
    fn absorb(&mut self, html: &str) {
        for link in extract_links(html, self.base, self.selector) {
            if self.seen.insert(link.clone()) {
                self.links.push(link);
            }
        }
    }
}

#[async_trait]
impl<'a> Expandable for ListingPages<'a> {
    type Error = String;

    async fn expand(&mut self) -> Result<usize, String> {
        let url = page_url(self.base, self.next_page);
        self.next_page += 1;

        // Every page is a separate request to the listing's domain
        wait_turn(self.politeness).await;
        let body = fetch_listing(self.client, &url, self.headers).await?;
        self.absorb(&body);
        Ok(self.links.len())
    }
}

/// URL of page `n` of a listing
pub fn page_url(base: &Url, page: u32) -> Url {
    let mut url = base.clone();
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair("page", &page.to_string());
    url
}

/// GETs a listing page; non-200 responses are errors
async fn fetch_listing(client: &Client, url: &Url, headers: &HeaderMap) -> Result<String, String> {
    let response = client
        .get(url.clone())
        .headers(headers.clone())
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if response.status() != StatusCode::OK {
        return Err(format!("HTTP {} for {}", response.status().as_u16(), url));
    }

    response.text().await.map_err(|e| e.to_string())
}

/// Extracts the `href`s matched by `selector`, resolved against `base`
///
/// Unresolvable hrefs are logged and skipped. Order of first appearance is
/// kept.
pub fn extract_links(html: &str, base: &Url, selector: &Selector) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for element in document.select(selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        match normalize_url(base.as_str(), href) {
            Ok(url) => links.push(url.to_string()),
            Err(e) => tracing::debug!("Skipping link {:?} on {}: {}", href, base, e),
        }
    }

    links
}
