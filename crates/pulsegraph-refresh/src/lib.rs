//! The freshness-driven refresh pipeline: freshness evaluation, query
//! synthesis, claim extraction, the refresh orchestrator, signal deltas and
//! the period comparison built on them.

pub mod compare;
pub mod delta;
pub mod error;
pub mod extract;
pub mod freshness;
pub mod orchestrator;
pub mod query;

pub use compare::{compare_periods, CompanySummary, CompareRequest, ComparisonReport};
pub use delta::{compute_delta, signal_delta, SignalDelta};
pub use error::{CandidateError, CandidateStage, ExtractError, RefreshError};
pub use extract::ClaimExtractor;
pub use freshness::{FreshnessEvaluator, FreshnessReport};
pub use orchestrator::{
    CandidateFailure, RefreshOptions, RefreshRequest, RefreshSummary, Refresher, SourceQuery,
};
pub use query::{fallback_query, QueryContext, QuerySynthesizer, SearchQuery};
