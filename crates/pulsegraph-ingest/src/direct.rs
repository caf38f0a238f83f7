use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::error::IngestError;
use crate::retry::retry_with_backoff;
use crate::text::html_to_text;
use crate::{ContentFetcher, HttpSettings};

/// [`ContentFetcher`] that GETs the page itself and strips the markup.
/// Used when no unlocker credentials are configured.
pub struct DirectFetcher {
    client: Client,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl DirectFetcher {
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the HTTP client cannot be built.
    pub fn new(http: &HttpSettings) -> Result<Self, IngestError> {
        Ok(Self {
            client: http.build_client()?,
            max_retries: http.max_retries,
            retry_backoff_ms: http.retry_backoff_ms,
        })
    }
}

#[async_trait]
impl ContentFetcher for DirectFetcher {
    fn name(&self) -> &str {
        "direct"
    }

    async fn fetch(&self, url: &str, _locale: &str) -> Result<String, IngestError> {
        let (is_html, body) =
            retry_with_backoff(self.max_retries, self.retry_backoff_ms, || async move {
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(IngestError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                let is_html = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|ct| ct.contains("html"));
                Ok((is_html, response.text().await?))
            })
            .await?;

        let text = if is_html {
            html_to_text(&body)
        } else {
            body.trim().to_string()
        };
        if text.is_empty() {
            return Err(IngestError::EmptyContent(url.to_string()));
        }
        Ok(text)
    }
}
