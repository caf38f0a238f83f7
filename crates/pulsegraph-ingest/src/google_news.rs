//! Google News RSS search.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use pulsegraph_core::{Candidate, SearchVertical};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;

use crate::error::IngestError;
use crate::retry::retry_with_backoff;
use crate::text::strip_html;
use crate::{dedupe_candidates, HttpSettings, SearchService};

const DEFAULT_BASE_URL: &str = "https://news.google.com";

/// [`SearchService`] over the public Google News RSS feed. The feed only
/// carries news, so the requested vertical is ignored.
pub struct GoogleNewsRss {
    client: Client,
    base_url: String,
    locale: String,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl GoogleNewsRss {
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the HTTP client cannot be built.
    pub fn new(locale: &str, http: &HttpSettings) -> Result<Self, IngestError> {
        Self::with_base_url(locale, http, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(
        locale: &str,
        http: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, IngestError> {
        Ok(Self {
            client: http.build_client()?,
            base_url: base_url.trim_end_matches('/').to_owned(),
            locale: locale.to_uppercase(),
            max_retries: http.max_retries,
            retry_backoff_ms: http.retry_backoff_ms,
        })
    }

    fn feed_url(&self, query: &str) -> String {
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC);
        let gl = &self.locale;
        format!(
            "{}/rss/search?q={encoded}&hl=en-{gl}&gl={gl}&ceid={gl}:en",
            self.base_url
        )
    }
}

/// Parse an RSS body into candidates in feed order.
///
/// # Errors
///
/// Returns [`IngestError::Xml`] if the XML is malformed.
pub fn parse_rss_feed(xml: &str) -> Result<Vec<Candidate>, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut candidates = Vec::new();
    let mut title = String::new();
    let mut link = String::new();
    let mut description = String::new();
    let mut in_item = false;
    let mut current_tag = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "item" {
                    in_item = true;
                    title.clear();
                    link.clear();
                    description.clear();
                }
                current_tag = name;
            }
            Event::End(e) => {
                if e.name().as_ref() == b"item" && in_item {
                    in_item = false;
                    if !link.is_empty() {
                        candidates.push(Candidate {
                            url: link.clone(),
                            title: Some(title.clone()).filter(|t| !t.is_empty()),
                            description: Some(description.clone()).filter(|d| !d.is_empty()),
                            rank: 0,
                        });
                    }
                }
                current_tag.clear();
            }
            Event::Text(e) if in_item => {
                let text = e.unescape().unwrap_or_default().into_owned();
                assign_field(&current_tag, text, &mut title, &mut link, &mut description);
            }
            Event::CData(e) if in_item => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                assign_field(&current_tag, text, &mut title, &mut link, &mut description);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(candidates)
}

fn assign_field(
    tag: &str,
    text: String,
    title: &mut String,
    link: &mut String,
    description: &mut String,
) {
    match tag {
        "title" => *title = text,
        "link" => *link = text.trim().to_string(),
        "description" => *description = strip_html(&text),
        _ => {}
    }
}

#[async_trait]
impl SearchService for GoogleNewsRss {
    fn name(&self) -> &str {
        "google_news_rss"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        _vertical: SearchVertical,
    ) -> Result<Vec<Candidate>, IngestError> {
        let url = self.feed_url(query);
        let body = retry_with_backoff(self.max_retries, self.retry_backoff_ms, || {
            let url = url.clone();
            async move {
                let response = self.client.get(&url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(IngestError::Status {
                        status: status.as_u16(),
                        url,
                    });
                }
                Ok(response.text().await?)
            }
        })
        .await?;

        let candidates = dedupe_candidates(parse_rss_feed(&body)?, max_results);
        tracing::debug!(query, count = candidates.len(), "Google News RSS results");
        Ok(candidates)
    }
}
