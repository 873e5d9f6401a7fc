//! Article search and retrieval.
//!
//! Provides trait-based locators (topic -> article URL) and fetchers
//! (URL -> main-content HTML) so the notes pipeline can be driven by stubs.

mod fetcher;
mod locator;

pub use fetcher::{extract_content, PageFetcher, CHROME_ELEMENTS};
pub use locator::{extract_post_url, SearchLocator};

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// An article's main content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Page the content came from.
    pub url: String,
    /// Serialized content container with chrome removed.
    pub html: String,
}

/// Finds the article URL for a topic.
#[async_trait]
pub trait ArticleLocator: Send + Sync {
    /// Return the first matching article URL, or None when nothing usable
    /// came back. Failures are logged, never raised.
    async fn locate(&self, topic: &str) -> Option<String>;
}

/// Retrieves an article's main content.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    /// Return the cleaned content container, or None when the page could not
    /// be fetched or has no container.
    async fn fetch(&self, url: &str) -> Option<Article>;
}

/// Build the HTTP client shared by the scrapers.
///
/// No timeout unless one is configured.
pub fn http_client(timeout_secs: Option<u64>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}
