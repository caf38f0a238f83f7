use std::path::PathBuf;

use crate::types::FreshnessThresholds;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which discovery adapter backs the search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackend {
    BrightData,
    GoogleNewsRss,
}

impl std::fmt::Display for SearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchBackend::BrightData => write!(f, "brightdata"),
            SearchBackend::GoogleNewsRss => write!(f, "google_news_rss"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub companies_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub brightdata_api_key: Option<String>,
    pub brightdata_serp_zone: String,
    pub brightdata_unlocker_zone: String,
    pub search_backend: SearchBackend,
    pub locale: String,
    pub freshness: FreshnessThresholds,
    pub refresh_max_results: usize,
    pub refresh_max_concurrency: usize,
    pub refresh_error_cap: usize,
    pub refresh_deadline_secs: Option<u64>,
    pub acquire_timeout_secs: u64,
    pub extract_timeout_secs: u64,
    pub extract_max_chars: usize,
    pub http_user_agent: String,
    pub http_request_timeout_secs: u64,
    pub http_max_retries: u32,
    pub http_retry_backoff_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("companies_path", &self.companies_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field(
                "brightdata_api_key",
                &self.brightdata_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("brightdata_serp_zone", &self.brightdata_serp_zone)
            .field("brightdata_unlocker_zone", &self.brightdata_unlocker_zone)
            .field("search_backend", &self.search_backend)
            .field("locale", &self.locale)
            .field("freshness", &self.freshness)
            .field("refresh_max_results", &self.refresh_max_results)
            .field("refresh_max_concurrency", &self.refresh_max_concurrency)
            .field("refresh_error_cap", &self.refresh_error_cap)
            .field("refresh_deadline_secs", &self.refresh_deadline_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("extract_timeout_secs", &self.extract_timeout_secs)
            .field("extract_max_chars", &self.extract_max_chars)
            .field("http_user_agent", &self.http_user_agent)
            .field("http_request_timeout_secs", &self.http_request_timeout_secs)
            .field("http_max_retries", &self.http_max_retries)
            .field("http_retry_backoff_ms", &self.http_retry_backoff_ms)
            .finish()
    }
}
