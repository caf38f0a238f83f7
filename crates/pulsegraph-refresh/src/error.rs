use pulsegraph_core::PeriodError;
use pulsegraph_db::DbError;
use pulsegraph_ingest::IngestError;
use pulsegraph_llm::LlmError;
use serde::Serialize;
use thiserror::Error;

/// Errors from the claim extractor for one source.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no extraction backend configured")]
    Unavailable,

    #[error("extraction backend failed: {0}")]
    Backend(#[from] LlmError),
}

/// Fatal errors for a whole refresh or comparison invocation.
///
/// Per-candidate problems never surface here; they are recorded in the
/// summary's `errors` instead.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("graph store unavailable: {0}")]
    StoreUnavailable(#[source] DbError),

    #[error("graph store error: {0}")]
    Store(#[source] DbError),

    #[error("company not found: {0}")]
    CompanyNotFound(String),

    #[error(transparent)]
    Period(#[from] PeriodError),
}

impl From<DbError> for RefreshError {
    fn from(err: DbError) -> Self {
        if err.is_unavailable() {
            RefreshError::StoreUnavailable(err)
        } else {
            RefreshError::Store(err)
        }
    }
}

/// Where in the per-candidate pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStage {
    Discovery,
    Acquire,
    UpsertSource,
    Extract,
    UpsertClaims,
    LinkMentions,
}

impl CandidateStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStage::Discovery => "discovery",
            CandidateStage::Acquire => "acquire",
            CandidateStage::UpsertSource => "upsert_source",
            CandidateStage::Extract => "extract",
            CandidateStage::UpsertClaims => "upsert_claims",
            CandidateStage::LinkMentions => "link_mentions",
        }
    }

    /// `true` once the document text has been acquired.
    #[must_use]
    pub fn is_after_fetch(self) -> bool {
        self > CandidateStage::Acquire
    }
}

impl std::fmt::Display for CandidateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one candidate (or one discovery query) failed.
#[derive(Debug, Error)]
pub enum CandidateError {
    #[error("search failed: {0}")]
    Search(#[source] IngestError),

    #[error("acquisition failed: {0}")]
    Acquire(#[source] IngestError),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("extraction failed: {0}")]
    Extract(#[source] ExtractError),

    #[error("store write failed: {0}")]
    Store(#[source] DbError),
}

impl CandidateError {
    /// `true` when the failure means the store is gone for every candidate.
    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, CandidateError::Store(err) if err.is_unavailable())
    }
}
