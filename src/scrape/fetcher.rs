//! Article page fetcher.
//!
//! Downloads an article page and isolates its main content container.

use super::{http_client, Article, ArticleFetcher};
use crate::config::ScraperSettings;
use crate::error::{Result, StudyError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

/// Elements removed from the content container (ads, navigation chrome).
pub const CHROME_ELEMENTS: &str = "script, style, nav, footer, aside, form";

/// Find the first element matching `selector` in `page_html`, strip chrome
/// subtrees from it and serialize what remains.
///
/// Returns Ok(None) when the page has no such element.
pub fn extract_content(page_html: &str, selector: &str) -> Result<Option<String>> {
    let container_selector = Selector::parse(selector).map_err(|e| {
        StudyError::Config(format!("Invalid content selector '{}': {:?}", selector, e))
    })?;
    let chrome_selector = Selector::parse(CHROME_ELEMENTS)
        .map_err(|e| StudyError::Scrape(format!("Invalid chrome selector: {:?}", e)))?;

    let mut document = Html::parse_document(page_html);

    let Some(container) = document.select(&container_selector).next() else {
        return Ok(None);
    };
    let container_id = container.id();
    let chrome: Vec<_> = container
        .select(&chrome_selector)
        .map(|e| e.id())
        .filter(|id| *id != container_id)
        .collect();

    for id in chrome {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    Ok(document
        .tree
        .get(container_id)
        .and_then(ElementRef::wrap)
        .map(|e| e.html()))
}

/// Fetches article pages over HTTP.
pub struct PageFetcher {
    client: Client,
    content_selector: String,
}

impl PageFetcher {
    pub fn new(settings: &ScraperSettings) -> Result<Self> {
        Ok(Self::with_client(http_client(settings.timeout_secs)?, settings))
    }

    pub fn with_client(client: Client, settings: &ScraperSettings) -> Self {
        Self {
            client,
            content_selector: settings.content_selector.clone(),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StudyError::Scrape(format!("HTTP {} for {}", status, url)));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ArticleFetcher for PageFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Option<Article> {
        let page = match self.fetch_page(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to fetch article {}: {}", url, e);
                return None;
            }
        };
        debug!("Fetched {} bytes", page.len());

        match extract_content(&page, &self.content_selector) {
            Ok(Some(html)) => {
                info!("Extracted {} bytes of content from {}", html.len(), url);
                Some(Article {
                    url: url.to_string(),
                    html,
                })
            }
            Ok(None) => {
                warn!("No '{}' container in {}", self.content_selector, url);
                None
            }
            Err(e) => {
                warn!("Content extraction failed for {}: {}", url, e);
                None
            }
        }
    }
}
