//! Search-endpoint article locator.

use super::{http_client, ArticleLocator};
use crate::config::ScraperSettings;
use crate::error::{Result, StudyError};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// Expected search response: `{detail: {articles: {data: [{post_url}]}}}`.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    detail: SearchDetail,
}

#[derive(Debug, Deserialize)]
struct SearchDetail {
    articles: SearchArticles,
}

#[derive(Debug, Deserialize)]
struct SearchArticles {
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    post_url: String,
}

/// Pull the first result's `post_url` out of a search response body.
///
/// Anything that does not match the expected shape yields None.
pub fn extract_post_url(body: &str) -> Option<String> {
    let response: SearchResponse = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            debug!("Unexpected search response shape: {}", e);
            return None;
        }
    };
    response
        .detail
        .articles
        .data
        .into_iter()
        .next()
        .map(|hit| hit.post_url)
        .filter(|url| !url.trim().is_empty())
}

/// Locates articles through the site's global search API.
pub struct SearchLocator {
    client: Client,
    endpoint: String,
    user_agent: String,
    articles_count: u32,
}

impl SearchLocator {
    pub fn new(settings: &ScraperSettings) -> Result<Self> {
        Ok(Self::with_client(http_client(settings.timeout_secs)?, settings))
    }

    pub fn with_client(client: Client, settings: &ScraperSettings) -> Self {
        Self {
            client,
            endpoint: settings.search_endpoint.clone(),
            user_agent: settings.user_agent.clone(),
            articles_count: settings.articles_count,
        }
    }

    async fn search(&self, topic: &str) -> Result<Option<String>> {
        let count = self.articles_count.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("products", "articles"),
                ("query", topic),
                ("articles_count", count.as_str()),
            ])
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StudyError::Scrape(format!("search returned HTTP {}", status)));
        }

        let body = response.text().await?;
        Ok(extract_post_url(&body))
    }
}

#[async_trait]
impl ArticleLocator for SearchLocator {
    #[instrument(skip(self))]
    async fn locate(&self, topic: &str) -> Option<String> {
        if topic.trim().is_empty() {
            return None;
        }

        match self.search(topic).await {
            Ok(Some(url)) => {
                debug!("Found article {}", url);
                Some(url)
            }
            Ok(None) => {
                warn!("No article found for topic: {}", topic);
                None
            }
            Err(e) => {
                warn!("Search failed for topic {}: {}", topic, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> ScraperSettings {
        ScraperSettings {
            search_endpoint: format!("{}/api/v1/global-search", server.uri()),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_post_url() {
        let body = r#"{"detail":{"articles":{"data":[{"post_url":"https://example.org/bst/"},{"post_url":"https://example.org/other/"}]}}}"#;
        assert_eq!(extract_post_url(body).as_deref(), Some("https://example.org/bst/"));
    }

    #[test]
    fn test_extract_post_url_bad_shapes() {
        assert!(extract_post_url(r#"{"detail":{}}"#).is_none());
        assert!(extract_post_url(r#"{"detail":{"articles":{"data":[]}}}"#).is_none());
        assert!(extract_post_url(r#"{"detail":{"articles":{"data":[{"post_url":42}]}}}"#).is_none());
        assert!(extract_post_url(r#"{"detail":{"articles":{"data":[{"post_url":""}]}}}"#).is_none());
        assert!(extract_post_url("<html>rate limited</html>").is_none());
    }

    #[tokio::test]
    async fn test_locate_sends_expected_query() {
        let server = MockServer::start().await;
        let settings = settings_for(&server);

        Mock::given(method("GET"))
            .and(path("/api/v1/global-search"))
            .and(query_param("products", "articles"))
            .and(query_param("query", "Binary Search Tree"))
            .and(query_param("articles_count", "1"))
            .and(header("user-agent", settings.user_agent.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "detail": {"articles": {"data": [{"post_url": "https://example.org/bst/"}]}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let locator = SearchLocator::new(&settings).unwrap();
        let url = locator.locate("Binary Search Tree").await;
        assert_eq!(url.as_deref(), Some("https://example.org/bst/"));
    }

    #[tokio::test]
    async fn test_locate_missing_path_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "detail": {"message": "nothing here"}
            })))
            .mount(&server)
            .await;

        let locator = SearchLocator::new(&settings_for(&server)).unwrap();
        assert!(locator.locate("AVL Tree").await.is_none());
    }

    #[tokio::test]
    async fn test_locate_http_error_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let locator = SearchLocator::new(&settings_for(&server)).unwrap();
        assert!(locator.locate("AVL Tree").await.is_none());
    }

    #[tokio::test]
    async fn test_locate_unreachable_is_not_found() {
        let settings = ScraperSettings {
            search_endpoint: "http://127.0.0.1:1/search".to_string(),
            timeout_secs: Some(5),
            ..Default::default()
        };
        let locator = SearchLocator::new(&settings).unwrap();
        assert!(locator.locate("AVL Tree").await.is_none());
    }
}
