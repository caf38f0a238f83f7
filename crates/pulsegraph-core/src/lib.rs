//! Shared domain vocabulary for PulseGraph: fiscal periods, type registries,
//! value types and application configuration.

pub mod app_config;
pub mod companies;
pub mod config;
pub mod period;
pub mod registry;
pub mod types;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, SearchBackend};
pub use companies::{
    load_companies, parse_companies, ClaimConfig, CompaniesFile, CompanyConfig, EventConfig,
    SignalConfig, SourceConfig,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use period::{
    comparison_period, current_quarter, default_pair, parse_period, validate_period, Period,
    PeriodError, MAX_YEAR, MIN_YEAR,
};
pub use registry::{ClaimType, EventType, SignalType, SourceType, UnknownVariant};
pub use types::{
    normalize_claim_text, Candidate, ExtractedClaim, FreshnessThresholds, LatestFetch, NewSignal,
    SearchVertical, SourceDoc,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read companies file {path}: {source}")]
    CompaniesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse companies file: {0}")]
    CompaniesFileParse(#[source] serde_yaml::Error),

    #[error("invalid companies file: {0}")]
    InvalidCompanies(String),
}
