//! Article field extraction
//!
//! Parsing is synchronous: `scraper::Html` is not `Send`, so a document is
//! built and dropped inside one call and never lives across an `.await`.

use crate::fetch::retry::FetchError;
use crate::storage::ArticleRecord;
use crate::HarvestError;
use chrono::{DateTime, SecondsFormat, Utc};
use scraper::{ElementRef, Html, Selector};

/// Fields pulled out of one article page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub author: String,
    /// RFC 3339 in UTC when the page's timestamp parses, otherwise verbatim
    pub published_at: String,
    pub tags: Vec<String>,
    /// Plain text of the article body
    pub body: String,
}

impl Article {
    /// Splits the article into its results row and its raw text
    ///
    /// `content_path` is left empty; the file writer fills it in.
    pub fn into_record(self, url: &str) -> (ArticleRecord, String) {
        let record = ArticleRecord {
            url: url.to_string(),
            title: self.title,
            author: self.author,
            published_at: self.published_at,
            content_path: String::new(),
            tags: self.tags.join("/"),
        };
        (record, self.body)
    }
}

/// Maps raw HTML to article fields
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str, url: &str) -> Result<Article, FetchError>;
}

/// Extractor for the dev.to article layout
#[derive(Debug, Clone)]
pub struct DevToExtractor {
    header: Selector,
    title: Selector,
    author: Selector,
    time: Selector,
    tag: Selector,
    body: Selector,
}

fn selector(css: &str) -> Result<Selector, HarvestError> {
    Selector::parse(css).map_err(|e| HarvestError::Extract {
        url: String::new(),
        message: format!("bad selector '{}': {:?}", css, e),
    })
}

impl DevToExtractor {
    pub fn new() -> Result<Self, HarvestError> {
        Ok(Self {
            header: selector("div.crayons-article__header__meta")?,
            title: selector("h1")?,
            author: selector("a.crayons-link")?,
            time: selector("time")?,
            tag: selector("a.crayons-tag")?,
            body: selector(".crayons-article__main")?,
        })
    }

    fn first_text(&self, scope: ElementRef<'_>, selector: &Selector) -> String {
        scope
            .select(selector)
            .next()
            .map(element_text)
            .unwrap_or_default()
    }
}

/// Concatenated, trimmed text of an element and its descendants
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Normalizes a `datetime` attribute to UTC, keeping unparsable values as-is
fn normalize_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        Err(e) => {
            tracing::debug!("Keeping unparsed timestamp {:?}: {}", raw, e);
            raw.to_string()
        }
    }
}

impl ContentExtractor for DevToExtractor {
    /// Extracts the header fields and body text
    ///
    /// Missing fields come back empty. A page with neither an article header
    /// nor a body is not an article and fails with [`FetchError::Extract`].
    fn extract(&self, html: &str, url: &str) -> Result<Article, FetchError> {
        let document = Html::parse_document(html);
        let mut article = Article::default();

        let header = document.select(&self.header).next();
        let body = document.select(&self.body).next();
        if header.is_none() && body.is_none() {
            return Err(FetchError::Extract(format!("no article found at {}", url)));
        }

        if let Some(header) = header {
            article.title = self.first_text(header, &self.title);
            article.author = self.first_text(header, &self.author);
            article.published_at = header
                .select(&self.time)
                .next()
                .and_then(|t| t.value().attr("datetime"))
                .map(normalize_timestamp)
                .unwrap_or_default();
            article.tags = header
                .select(&self.tag)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect();
        }

        if let Some(body) = body {
            article.body = element_text(body);
        }

        Ok(article)
    }
}
