//! Seed data for the batch seed tool: companies with their events, sources,
//! claims and signals, loaded from YAML.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::period::Period;
use crate::registry::{ClaimType, EventType, SignalType, SourceType};
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub name: String,
    pub ticker: Option<String>,
    pub industry: Option<String>,
    #[serde(default)]
    pub events: Vec<EventConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    pub period: Period,
    #[serde(default = "default_event_type")]
    pub event_type: EventType,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub signals: Vec<SignalConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    pub title: String,
    pub text: String,
    #[serde(default = "default_source_type")]
    pub source_type: SourceType,
    pub published_at: Option<DateTime<Utc>>,
    pub site_name: Option<String>,
    pub query: Option<String>,
    #[serde(default)]
    pub claims: Vec<ClaimConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimConfig {
    pub text: String,
    pub claim_type: ClaimType,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    pub signal_type: SignalType,
    pub window: Option<String>,
    pub score: Decimal,
    pub volume: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CompaniesFile {
    pub companies: Vec<CompanyConfig>,
}

fn default_event_type() -> EventType {
    EventType::Earnings
}

fn default_source_type() -> SourceType {
    SourceType::News
}

/// Load and validate the seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_companies(path: &Path) -> Result<CompaniesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CompaniesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_companies(&content)
}

/// Parse and validate seed YAML from a string.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_companies(content: &str) -> Result<CompaniesFile, ConfigError> {
    let file: CompaniesFile =
        serde_yaml::from_str(content).map_err(ConfigError::CompaniesFileParse)?;
    validate_companies(&file)?;
    Ok(file)
}

fn validate_companies(file: &CompaniesFile) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for company in &file.companies {
        let name = company.name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidCompanies(
                "company name must not be empty".to_string(),
            ));
        }
        if !names.insert(name.to_lowercase()) {
            return Err(ConfigError::InvalidCompanies(format!(
                "duplicate company name: '{name}'"
            )));
        }

        let mut periods = HashSet::new();
        for event in &company.events {
            if !periods.insert(event.period) {
                return Err(ConfigError::InvalidCompanies(format!(
                    "company '{name}' declares period {} more than once",
                    event.period
                )));
            }

            for source in &event.sources {
                if !source.url.starts_with("http://") && !source.url.starts_with("https://") {
                    return Err(ConfigError::InvalidCompanies(format!(
                        "source url must be http(s): '{}'",
                        source.url
                    )));
                }
                for claim in &source.claims {
                    if claim.text.trim().is_empty() {
                        return Err(ConfigError::InvalidCompanies(format!(
                            "empty claim text in source '{}'",
                            source.url
                        )));
                    }
                    if !(0.0..=1.0).contains(&claim.confidence) {
                        return Err(ConfigError::InvalidCompanies(format!(
                            "claim confidence {} out of range [0, 1] in source '{}'",
                            claim.confidence, source.url
                        )));
                    }
                }
            }

            let mut signal_keys = HashSet::new();
            for signal in &event.signals {
                let window = signal
                    .window
                    .clone()
                    .unwrap_or_else(|| event.event_type.default_window().to_string());
                if !signal_keys.insert((signal.signal_type, window.clone())) {
                    return Err(ConfigError::InvalidCompanies(format!(
                        "company '{name}' period {} declares {} / {window} twice",
                        event.period, signal.signal_type
                    )));
                }
            }
        }
    }

    Ok(())
}
