use chrono::TimeDelta;

use crate::app_config::{AppConfig, Environment, SearchBackend};
use crate::types::FreshnessThresholds;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// `HashMap` instead of `set_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_hours = |var: &str, default: &str| -> Result<TimeDelta, ConfigError> {
        let hours = or_default(var, default)
            .parse::<i64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if hours <= 0 {
            return Err(invalid(var, "must be a positive number of hours".to_string()));
        }
        TimeDelta::try_hours(hours).ok_or_else(|| invalid(var, "out of range".to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("PULSEGRAPH_ENV", "development"))?;
    let log_level = or_default("PULSEGRAPH_LOG_LEVEL", "info");
    let companies_path = PathBuf::from(or_default(
        "PULSEGRAPH_COMPANIES_PATH",
        "./config/companies.yaml",
    ));

    let db_max_connections = parse_u32("PULSEGRAPH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PULSEGRAPH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PULSEGRAPH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let openai_api_key = optional("OPENAI_API_KEY");
    let openai_model = or_default("PULSEGRAPH_OPENAI_MODEL", "gpt-4o-mini");
    let openai_base_url = or_default("PULSEGRAPH_OPENAI_BASE_URL", "https://api.openai.com/v1");

    let brightdata_api_key = optional("BRIGHTDATA_API_KEY");
    let brightdata_serp_zone = or_default("BRIGHTDATA_SERP_ZONE", "serp_api1");
    let brightdata_unlocker_zone = or_default("BRIGHTDATA_UNLOCKER_ZONE", "web_unlocker1");
    let search_backend = parse_search_backend(&or_default(
        "PULSEGRAPH_SEARCH_BACKEND",
        "brightdata",
    ))?;
    let locale = or_default("PULSEGRAPH_LOCALE", "us");

    let defaults = FreshnessThresholds::default();
    let freshness = FreshnessThresholds {
        news: parse_hours(
            "PULSEGRAPH_FRESHNESS_NEWS_HOURS",
            &defaults.news.num_hours().to_string(),
        )?,
        blog: parse_hours(
            "PULSEGRAPH_FRESHNESS_BLOG_HOURS",
            &defaults.blog.num_hours().to_string(),
        )?,
        forum: parse_hours(
            "PULSEGRAPH_FRESHNESS_FORUM_HOURS",
            &defaults.forum.num_hours().to_string(),
        )?,
        social: parse_hours(
            "PULSEGRAPH_FRESHNESS_SOCIAL_HOURS",
            &defaults.social.num_hours().to_string(),
        )?,
        filing: parse_hours(
            "PULSEGRAPH_FRESHNESS_FILING_HOURS",
            &defaults.filing.num_hours().to_string(),
        )?,
    };

    let refresh_max_results = parse_usize("PULSEGRAPH_REFRESH_MAX_RESULTS", "5")?;
    let refresh_max_concurrency = parse_usize("PULSEGRAPH_REFRESH_MAX_CONCURRENCY", "4")?;
    let refresh_error_cap = parse_usize("PULSEGRAPH_REFRESH_ERROR_CAP", "3")?;
    let refresh_deadline_secs = match optional("PULSEGRAPH_REFRESH_DEADLINE_SECS") {
        Some(raw) => Some(
            raw.parse::<u64>()
                .map_err(|e| invalid("PULSEGRAPH_REFRESH_DEADLINE_SECS", e.to_string()))?,
        ),
        None => None,
    };
    let acquire_timeout_secs = parse_u64("PULSEGRAPH_ACQUIRE_TIMEOUT_SECS", "45")?;
    let extract_timeout_secs = parse_u64("PULSEGRAPH_EXTRACT_TIMEOUT_SECS", "60")?;
    let extract_max_chars = parse_usize("PULSEGRAPH_EXTRACT_MAX_CHARS", "12000")?;

    let http_user_agent = or_default(
        "PULSEGRAPH_HTTP_USER_AGENT",
        "pulsegraph/0.1 (event-intelligence)",
    );
    let http_request_timeout_secs = parse_u64("PULSEGRAPH_HTTP_REQUEST_TIMEOUT_SECS", "30")?;
    let http_max_retries = parse_u32("PULSEGRAPH_HTTP_MAX_RETRIES", "3")?;
    let http_retry_backoff_ms = parse_u64("PULSEGRAPH_HTTP_RETRY_BACKOFF_MS", "1000")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        companies_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        openai_api_key,
        openai_model,
        openai_base_url,
        brightdata_api_key,
        brightdata_serp_zone,
        brightdata_unlocker_zone,
        search_backend,
        locale,
        freshness,
        refresh_max_results,
        refresh_max_concurrency,
        refresh_error_cap,
        refresh_deadline_secs,
        acquire_timeout_secs,
        extract_timeout_secs,
        extract_max_chars,
        http_user_agent,
        http_request_timeout_secs,
        http_max_retries,
        http_retry_backoff_ms,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PULSEGRAPH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_search_backend(s: &str) -> Result<SearchBackend, ConfigError> {
    match s {
        "brightdata" => Ok(SearchBackend::BrightData),
        "google_news_rss" => Ok(SearchBackend::GoogleNewsRss),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PULSEGRAPH_SEARCH_BACKEND".to_string(),
            reason: format!("expected 'brightdata' or 'google_news_rss', got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
