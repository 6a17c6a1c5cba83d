use crate::Error;
use async_trait::async_trait;
use std::time::Duration;

/// Webpage fetcher (§4.9): `fetch(url) -> html`, 30s timeout, 3 retries.
/// An external collaborator behind this trait so `ExtractProblemTask` can
/// be tested without a real HTTP call.
#[async_trait]
pub trait WebpageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, Error>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder().timeout(Duration::from_secs(30)).build().expect("reqwest client builds with a concrete timeout"),
        }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebpageFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, Error> {
        let response = self.client.get(url).send().await.map_err(|e| Error::Fetch { url: url.to_string(), message: e.to_string() })?;
        if !response.status().is_success() {
            return Err(Error::Fetch { url: url.to_string(), message: format!("HTTP {}", response.status()) });
        }
        response.text().await.map_err(|e| Error::Fetch { url: url.to_string(), message: e.to_string() })
    }
}

/// In-memory fetcher for tests: serves canned HTML by exact URL match.
#[derive(Default)]
pub struct MockFetcher {
    pages: std::collections::HashMap<String, Result<String, String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), Ok(html.into()));
        self
    }

    #[must_use]
    pub fn with_failure(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.pages.insert(url.into(), Err(message.into()));
        self
    }
}

#[async_trait]
impl WebpageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, Error> {
        match self.pages.get(url) {
            Some(Ok(html)) => Ok(html.clone()),
            Some(Err(message)) => Err(Error::Fetch { url: url.to_string(), message: message.clone() }),
            None => Err(Error::Fetch { url: url.to_string(), message: "no mock page registered".to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_fetcher_returns_registered_page() {
        let fetcher = MockFetcher::new().with_page("https://example.com/1", "<html>A+B</html>");
        let html = fetcher.fetch("https://example.com/1").await.unwrap();
        assert_eq!(html, "<html>A+B</html>");
    }

    #[tokio::test]
    async fn mock_fetcher_surfaces_configured_failure() {
        let fetcher = MockFetcher::new().with_failure("https://example.com/down", "connection refused");
        let err = fetcher.fetch("https://example.com/down").await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}
