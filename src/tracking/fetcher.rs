use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;

use crate::core::config::FetcherConfig;

/// Retrieves the raw content of a listing page.
///
/// `Ok(None)` means nothing usable came back; `Err` means the fetch itself
/// failed. Both leave the listing trackable for the next cycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<Option<String>>;
}

/// Plain GET fetcher. Retries and rate limiting belong to whoever wraps it.
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        let status = response.status();

        // Marketplaces answer removed postings with 404/410 and a body that
        // carries the sold markers, so those pages are still worth reading.
        let readable = status.is_success()
            || status == StatusCode::NOT_FOUND
            || status == StatusCode::GONE;
        if !readable {
            tracing::debug!("Listing page {} returned {}", url, status);
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        Ok(if body.trim().is_empty() { None } else { Some(body) })
    }
}

/// Adapts an async closure into a [`PageFetcher`].
pub struct FnPageFetcher<F> {
    fetch: F,
}

impl<F, Fut> FnPageFetcher<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<String>>> + Send + 'static,
{
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl<F, Fut> PageFetcher for FnPageFetcher<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<String>>> + Send + 'static,
{
    async fn fetch_page(&self, url: &str) -> Result<Option<String>> {
        (self.fetch)(url.to_string()).await
    }
}
