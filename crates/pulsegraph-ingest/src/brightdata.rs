//! Bright Data client: Google SERP via the SERP zone and page acquisition
//! via the Web Unlocker zone, both through the `/request` endpoint.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use pulsegraph_core::{Candidate, SearchVertical};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::retry::retry_with_backoff;
use crate::{dedupe_candidates, ContentFetcher, HttpSettings, SearchService};

const DEFAULT_BASE_URL: &str = "https://api.brightdata.com";

#[derive(Debug, Serialize)]
struct UnlockRequest<'a> {
    zone: &'a str,
    url: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<&'a str>,
}

/// The subset of Bright Data's parsed SERP (`brd_json=1`) we read. Web
/// results arrive under `organic`, news-vertical results under `news`.
#[derive(Debug, Default, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic: Vec<SerpItem>,
    #[serde(default)]
    news: Vec<SerpItem>,
}

#[derive(Debug, Deserialize)]
struct SerpItem {
    #[serde(alias = "url")]
    link: Option<String>,
    title: Option<String>,
    #[serde(alias = "snippet")]
    description: Option<String>,
}

pub struct BrightDataClient {
    client: Client,
    api_key: String,
    serp_zone: String,
    unlocker_zone: String,
    base_url: String,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl BrightDataClient {
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the HTTP client cannot be built, or
    /// [`IngestError::InvalidConfig`] if the API key is blank.
    pub fn new(
        api_key: &str,
        serp_zone: &str,
        unlocker_zone: &str,
        http: &HttpSettings,
    ) -> Result<Self, IngestError> {
        Self::with_base_url(api_key, serp_zone, unlocker_zone, http, DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`BrightDataClient::new`].
    pub fn with_base_url(
        api_key: &str,
        serp_zone: &str,
        unlocker_zone: &str,
        http: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, IngestError> {
        if api_key.trim().is_empty() {
            return Err(IngestError::InvalidConfig(
                "Bright Data API key is empty".to_string(),
            ));
        }
        Ok(Self {
            client: http.build_client()?,
            api_key: api_key.to_owned(),
            serp_zone: serp_zone.to_owned(),
            unlocker_zone: unlocker_zone.to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            max_retries: http.max_retries,
            retry_backoff_ms: http.retry_backoff_ms,
        })
    }

    fn serp_url(query: &str, max_results: usize, vertical: SearchVertical) -> String {
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC);
        let mut url =
            format!("https://www.google.com/search?q={encoded}&num={max_results}&brd_json=1");
        if vertical == SearchVertical::News {
            url.push_str("&tbm=nws");
        }
        url
    }

    async fn request(&self, body: &UnlockRequest<'_>) -> Result<String, IngestError> {
        let endpoint = format!("{}/request", self.base_url);
        retry_with_backoff(self.max_retries, self.retry_backoff_ms, || {
            let endpoint = endpoint.clone();
            async move {
                let response = self
                    .client
                    .post(&endpoint)
                    .bearer_auth(&self.api_key)
                    .json(body)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(IngestError::Status {
                        status: status.as_u16(),
                        url: body.url.to_string(),
                    });
                }
                Ok(response.text().await?)
            }
        })
        .await
    }
}

/// Parse a `brd_json=1` SERP body into candidates in result order.
///
/// # Errors
///
/// Returns [`IngestError::Deserialize`] if the body is not the expected JSON.
pub fn parse_serp(body: &str) -> Result<Vec<Candidate>, IngestError> {
    let parsed: SerpResponse =
        serde_json::from_str(body).map_err(|source| IngestError::Deserialize {
            context: "Bright Data SERP".to_string(),
            source,
        })?;

    Ok(parsed
        .organic
        .into_iter()
        .chain(parsed.news)
        .filter_map(|item| {
            let url = item.link?.trim().to_string();
            Some(Candidate {
                url,
                title: item.title.filter(|t| !t.trim().is_empty()),
                description: item.description.filter(|d| !d.trim().is_empty()),
                rank: 0,
            })
        })
        .collect())
}

#[async_trait]
impl SearchService for BrightDataClient {
    fn name(&self) -> &str {
        "brightdata_serp"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        vertical: SearchVertical,
    ) -> Result<Vec<Candidate>, IngestError> {
        let serp_url = Self::serp_url(query, max_results, vertical);
        let body = self
            .request(&UnlockRequest {
                zone: &self.serp_zone,
                url: &serp_url,
                format: "raw",
                data_format: None,
                country: None,
            })
            .await?;

        let candidates = dedupe_candidates(parse_serp(&body)?, max_results);
        tracing::debug!(query, count = candidates.len(), "Bright Data SERP results");
        Ok(candidates)
    }
}

#[async_trait]
impl ContentFetcher for BrightDataClient {
    fn name(&self) -> &str {
        "brightdata_unlocker"
    }

    async fn fetch(&self, url: &str, locale: &str) -> Result<String, IngestError> {
        let markdown = self
            .request(&UnlockRequest {
                zone: &self.unlocker_zone,
                url,
                format: "raw",
                data_format: Some("markdown"),
                country: Some(locale).filter(|l| !l.is_empty()),
            })
            .await?;

        let markdown = markdown.trim();
        if markdown.is_empty() {
            return Err(IngestError::EmptyContent(url.to_string()));
        }
        Ok(markdown.to_string())
    }
}
