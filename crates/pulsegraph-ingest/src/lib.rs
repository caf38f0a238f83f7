//! Discovery and acquisition: search services that turn a query into ranked
//! candidate URLs, and fetchers that turn a URL into normalized text.

pub mod brightdata;
pub mod direct;
pub mod error;
pub mod google_news;
pub(crate) mod retry;
pub mod text;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use pulsegraph_core::{AppConfig, Candidate, SearchVertical};
use reqwest::Client;

pub use brightdata::BrightDataClient;
pub use direct::DirectFetcher;
pub use error::IngestError;
pub use google_news::GoogleNewsRss;

/// Ranked web or news search.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Return at most `max_results` candidates, de-duplicated by URL and
    /// ranked from 1.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        vertical: SearchVertical,
    ) -> Result<Vec<Candidate>, IngestError>;
}

/// Retrieves the readable text of one URL.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    fn name(&self) -> &str;

    /// `locale` is a two-letter country code used for geo-targeted fetches.
    async fn fetch(&self, url: &str, locale: &str) -> Result<String, IngestError>;
}

/// Shared HTTP behaviour for every upstream client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "pulsegraph/0.1 (event-intelligence)".to_string(),
            max_retries: 3,
            retry_backoff_ms: 1000,
        }
    }
}

impl HttpSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.http_request_timeout_secs,
            user_agent: config.http_user_agent.clone(),
            max_retries: config.http_max_retries,
            retry_backoff_ms: config.http_retry_backoff_ms,
        }
    }

    pub(crate) fn build_client(&self) -> Result<Client, IngestError> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(self.user_agent.clone())
            .build()?)
    }
}

/// Keep the first occurrence of each URL, cap the list at `max_results` and
/// renumber ranks from 1 in order.
#[must_use]
pub fn dedupe_candidates(candidates: Vec<Candidate>, max_results: usize) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| !c.url.trim().is_empty() && seen.insert(c.url.clone()))
        .take(max_results)
        .zip(1u32..)
        .map(|(candidate, rank)| Candidate { rank, ..candidate })
        .collect()
}
