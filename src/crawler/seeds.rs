//! Seed discovery
//!
//! The crawl starts from the category pages listed on a single index page,
//! plus any explicitly configured URLs. All seeds enter at depth 0.

use crate::config::SeedConfig;
use crate::crawler::item::CrawlItem;
use crate::crawler::renderer::extract_links;
use crate::useragent::pick_user_agent;
use crate::{ConfigError, HarvestError};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use scraper::Selector;
use url::Url;

/// Supplies the initial batch of crawl items
#[async_trait]
pub trait SeedSource: Send + Sync {
    async fn seeds(&self) -> Result<Vec<CrawlItem>, HarvestError>;
}

/// Seeds from a category index page and a fixed URL list
pub struct CategorySeeds {
    client: Client,
    categories_url: Option<Url>,
    selector: Selector,
    extra: Vec<String>,
}

impl CategorySeeds {
    pub fn new(client: Client, config: &SeedConfig) -> Result<Self, HarvestError> {
        let categories_url = if config.categories_url.is_empty() {
            None
        } else {
            Some(Url::parse(&config.categories_url)?)
        };

        let selector = Selector::parse(&config.category_selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("'{}': {:?}", config.category_selector, e))
        })?;

        Ok(Self {
            client,
            categories_url,
            selector,
            extra: config.urls.clone(),
        })
    }

    async fn discover_categories(&self, index: &Url) -> Result<Vec<String>, HarvestError> {
        tracing::info!("Getting categories from {}", index);

        let render_error = |message: String| HarvestError::Render {
            url: index.to_string(),
            message,
        };

        let response = self
            .client
            .get(index.clone())
            .header(USER_AGENT, pick_user_agent())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(render_error(format!("HTTP {}", response.status().as_u16())));
        }

        let body = response.text().await?;
        Ok(extract_links(&body, index, &self.selector))
    }
}

#[async_trait]
impl SeedSource for CategorySeeds {
    /// Returns the seeds, failing only if none could be produced
    ///
    /// An unreachable category page is tolerated as long as explicit seeds
    /// are configured.
    async fn seeds(&self) -> Result<Vec<CrawlItem>, HarvestError> {
        let mut raw = Vec::new();

        if let Some(index) = &self.categories_url {
            match self.discover_categories(index).await {
                Ok(links) => raw.extend(links),
                Err(e) if !self.extra.is_empty() => {
                    tracing::warn!("Category discovery failed, using configured seeds: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        raw.extend(self.extra.iter().cloned());

        let items: Vec<CrawlItem> = raw
            .iter()
            .filter_map(|url| match CrawlItem::new(url, 0) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("Skipping seed {}: {}", url, e);
                    None
                }
            })
            .collect();

        tracing::info!("Discovered {} seeds", items.len());
        Ok(items)
    }
}
