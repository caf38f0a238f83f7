//! The refresh orchestrator.
//!
//! For each requested source type: synthesize a query, discover candidates,
//! then run every candidate through acquire → upsert source → extract →
//! upsert claims → link mentions on a bounded pool. A failing candidate is
//! recorded by URL and never stops the others.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use pulsegraph_core::{
    AppConfig, Candidate, EventType, Period, SearchVertical, SourceDoc, SourceType,
};
use pulsegraph_db::{CompanyRow, DbError, GraphStore};
use pulsegraph_ingest::{ContentFetcher, SearchService};
use serde::Serialize;
use serde_json::json;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{CandidateError, CandidateStage, RefreshError};
use crate::extract::ClaimExtractor;
use crate::query::{QueryContext, QuerySynthesizer, SearchQuery};

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Candidates requested from the search service per source type.
    pub max_results: usize,
    pub max_concurrency: usize,
    pub acquire_timeout: Duration,
    pub extract_timeout: Duration,
    /// Maximum failures kept in [`RefreshSummary::errors`].
    pub error_cap: usize,
    /// Stop launching new candidates once this much time has passed.
    pub deadline: Option<Duration>,
    /// Two-letter country code passed to the fetcher.
    pub locale: String,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            max_concurrency: 4,
            acquire_timeout: Duration::from_secs(45),
            extract_timeout: Duration::from_secs(60),
            error_cap: 3,
            deadline: None,
            locale: "us".to_string(),
        }
    }
}

impl RefreshOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_results: config.refresh_max_results,
            max_concurrency: config.refresh_max_concurrency,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
            extract_timeout: Duration::from_secs(config.extract_timeout_secs),
            error_cap: config.refresh_error_cap,
            deadline: config.refresh_deadline_secs.map(Duration::from_secs),
            locale: config.locale.clone(),
        }
    }
}

/// One refresh invocation for a company and period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub company_id: i64,
    pub company_name: String,
    pub ticker: Option<String>,
    pub industry: Option<String>,
    pub period: Period,
    pub event_type: EventType,
    /// Empty means `news`.
    pub source_types: Vec<SourceType>,
}

impl RefreshRequest {
    #[must_use]
    pub fn for_company(
        company: &CompanyRow,
        period: Period,
        event_type: EventType,
        source_types: Vec<SourceType>,
    ) -> Self {
        Self {
            company_id: company.id,
            company_name: company.name.clone(),
            ticker: company.ticker.clone(),
            industry: company.industry.clone(),
            period,
            event_type,
            source_types,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFailure {
    /// Candidate URL, or the query text for a discovery failure.
    pub url: String,
    pub stage: CandidateStage,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceQuery {
    pub source_type: SourceType,
    #[serde(flatten)]
    pub query: SearchQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub company: String,
    pub period: Period,
    pub event_type: EventType,
    pub queries: Vec<SourceQuery>,
    pub discovered_count: usize,
    pub fetched_count: usize,
    /// Candidates that completed every stage.
    pub upserted_count: usize,
    pub claim_count: usize,
    /// At most `error_cap` entries; see `error_count` for the total.
    pub errors: Vec<CandidateFailure>,
    pub error_count: usize,
    /// Candidates never launched because of cancellation or the deadline.
    pub skipped_count: usize,
    pub cancelled: bool,
    pub refreshed_at: DateTime<Utc>,
}

struct CandidateJob {
    source_type: SourceType,
    query: String,
    candidate: Candidate,
}

struct StageFailure {
    stage: CandidateStage,
    error: CandidateError,
}

impl StageFailure {
    fn new(stage: CandidateStage, error: CandidateError) -> Self {
        Self { stage, error }
    }

    fn store(stage: CandidateStage, err: DbError) -> Self {
        Self::new(stage, CandidateError::Store(err))
    }
}

/// Capped failure list plus the uncapped total.
struct FailureLog {
    cap: usize,
    kept: Vec<CandidateFailure>,
    total: usize,
}

impl FailureLog {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            kept: Vec::new(),
            total: 0,
        }
    }

    fn record(&mut self, failure: CandidateFailure) {
        self.total += 1;
        if self.kept.len() < self.cap {
            self.kept.push(failure);
        }
    }
}

pub struct Refresher {
    store: Arc<dyn GraphStore>,
    search: Arc<dyn SearchService>,
    fetcher: Arc<dyn ContentFetcher>,
    queries: QuerySynthesizer,
    extractor: ClaimExtractor,
    options: RefreshOptions,
}

impl Refresher {
    #[must_use]
    pub fn new(
        store: Arc<dyn GraphStore>,
        search: Arc<dyn SearchService>,
        fetcher: Arc<dyn ContentFetcher>,
        queries: QuerySynthesizer,
        extractor: ClaimExtractor,
        options: RefreshOptions,
    ) -> Self {
        Self {
            store,
            search,
            fetcher,
            queries,
            extractor,
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &RefreshOptions {
        &self.options
    }

    /// Run one refresh.
    ///
    /// Cancelling `cancel` (or passing the configured deadline) stops new
    /// candidates from launching; in-flight candidates run to completion.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::StoreUnavailable`] if the store cannot be
    /// reached, and [`RefreshError::Store`] if the event itself cannot be
    /// written. Every other failure is recorded in the summary.
    #[allow(clippy::too_many_lines)]
    pub async fn refresh(
        &self,
        request: &RefreshRequest,
        cancel: &CancellationToken,
    ) -> Result<RefreshSummary, RefreshError> {
        let deadline = self.options.deadline.map(|d| Instant::now() + d);
        let source_types = requested_types(&request.source_types);

        tracing::info!(
            company = %request.company_name,
            period = %request.period,
            event_type = %request.event_type,
            source_types = ?source_types,
            "refresh started"
        );

        let event = self
            .store
            .upsert_event(request.company_id, request.period, request.event_type, None)
            .await?;

        let ctx = QueryContext {
            company: &request.company_name,
            ticker: request.ticker.as_deref(),
            industry: request.industry.as_deref(),
            period: request.period,
            event_type: request.event_type,
            source_type: SourceType::News,
        };
        let queries = self.queries.synthesize_many(&ctx, &source_types).await;

        let mut failures = FailureLog::new(self.options.error_cap);
        let mut discovery_interrupted = false;
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();

        for (source_type, query) in &queries {
            if is_stopped(cancel, deadline) {
                discovery_interrupted = true;
                break;
            }
            let vertical = SearchVertical::for_source_type(*source_type);
            match self
                .search
                .search(&query.primary, self.options.max_results, vertical)
                .await
            {
                Ok(candidates) => {
                    tracing::info!(
                        source_type = %source_type,
                        query = %query.primary,
                        count = candidates.len(),
                        "candidates discovered"
                    );
                    jobs.extend(
                        candidates
                            .into_iter()
                            .filter(|c| seen.insert(c.url.clone()))
                            .map(|candidate| CandidateJob {
                                source_type: *source_type,
                                query: query.primary.clone(),
                                candidate,
                            }),
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        source_type = %source_type,
                        query = %query.primary,
                        error = %e,
                        "discovery failed"
                    );
                    failures.record(CandidateFailure {
                        url: query.primary.clone(),
                        stage: CandidateStage::Discovery,
                        reason: CandidateError::Search(e).to_string(),
                    });
                }
            }
        }

        let discovered_count = jobs.len();
        let mut fetched_count = 0usize;
        let mut upserted_count = 0usize;
        let mut claim_count = 0usize;
        let mut skipped_count = 0usize;
        let mut store_failure: Option<DbError> = None;

        let batch = cancel.child_token();
        let batch_ref = &batch;
        let event_id = event.id;

        let mut outcomes = stream::iter(&jobs)
            .map(|job| async move {
                if is_stopped(batch_ref, deadline) {
                    return (job, None);
                }
                (job, Some(self.process_candidate(request, event_id, job).await))
            })
            .buffer_unordered(self.options.max_concurrency.max(1));

        while let Some((job, outcome)) = outcomes.next().await {
            match outcome {
                None => skipped_count += 1,
                Some(Ok(claims)) => {
                    fetched_count += 1;
                    upserted_count += 1;
                    claim_count += claims;
                }
                Some(Err(failure)) => {
                    if failure.stage.is_after_fetch() {
                        fetched_count += 1;
                    }
                    tracing::warn!(
                        url = %job.candidate.url,
                        stage = %failure.stage,
                        error = %failure.error,
                        "candidate failed"
                    );
                    failures.record(CandidateFailure {
                        url: job.candidate.url.clone(),
                        stage: failure.stage,
                        reason: failure.error.to_string(),
                    });
                    if store_failure.is_none() && failure.error.is_store_unavailable() {
                        batch.cancel();
                        if let CandidateError::Store(err) = failure.error {
                            store_failure = Some(err);
                        }
                    }
                }
            }
        }
        drop(outcomes);

        if let Some(err) = store_failure {
            tracing::error!(
                company = %request.company_name,
                error = %err,
                "graph store unavailable, aborting refresh"
            );
            return Err(RefreshError::StoreUnavailable(err));
        }

        let summary = RefreshSummary {
            company: request.company_name.clone(),
            period: request.period,
            event_type: request.event_type,
            queries: queries
                .into_iter()
                .map(|(source_type, query)| SourceQuery { source_type, query })
                .collect(),
            discovered_count,
            fetched_count,
            upserted_count,
            claim_count,
            errors: failures.kept,
            error_count: failures.total,
            skipped_count,
            cancelled: discovery_interrupted || skipped_count > 0 || cancel.is_cancelled(),
            refreshed_at: Utc::now(),
        };

        tracing::info!(
            company = %summary.company,
            period = %summary.period,
            discovered = summary.discovered_count,
            fetched = summary.fetched_count,
            upserted = summary.upserted_count,
            claims = summary.claim_count,
            errors = summary.error_count,
            skipped = summary.skipped_count,
            "refresh complete"
        );
        Ok(summary)
    }

    async fn process_candidate(
        &self,
        request: &RefreshRequest,
        event_id: i64,
        job: &CandidateJob,
    ) -> Result<usize, StageFailure> {
        let url = job.candidate.url.as_str();

        let raw_text = match timeout(
            self.options.acquire_timeout,
            self.fetcher.fetch(url, &self.options.locale),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                return Err(StageFailure::new(
                    CandidateStage::Acquire,
                    CandidateError::Acquire(e),
                ))
            }
            Err(_) => {
                return Err(StageFailure::new(
                    CandidateStage::Acquire,
                    CandidateError::Timeout(self.options.acquire_timeout.as_secs()),
                ))
            }
        };

        let doc = SourceDoc {
            url: url.to_string(),
            title: job
                .candidate
                .title
                .clone()
                .unwrap_or_else(|| url.to_string()),
            raw_text,
            source_type: job.source_type,
            fetched_at: Utc::now(),
            published_at: None,
            query: Some(job.query.clone()),
            site_name: None,
            metadata: json!({
                "serp_title": job.candidate.title,
                "serp_description": job.candidate.description,
                "serp_rank": job.candidate.rank,
            }),
        };
        tracing::info!(url, chars = doc.raw_text.len(), "fetched source");

        let source = self
            .store
            .upsert_source(&doc)
            .await
            .map_err(|e| StageFailure::store(CandidateStage::UpsertSource, e))?;

        let claims = match timeout(
            self.options.extract_timeout,
            self.extractor
                .extract(&request.company_name, request.period, &doc),
        )
        .await
        {
            Ok(Ok(claims)) => claims,
            Ok(Err(e)) => {
                return Err(StageFailure::new(
                    CandidateStage::Extract,
                    CandidateError::Extract(e),
                ))
            }
            Err(_) => {
                return Err(StageFailure::new(
                    CandidateStage::Extract,
                    CandidateError::Timeout(self.options.extract_timeout.as_secs()),
                ))
            }
        };

        for claim in &claims {
            self.store
                .upsert_claim(request.company_id, event_id, source.id, claim)
                .await
                .map_err(|e| StageFailure::store(CandidateStage::UpsertClaims, e))?;
        }

        self.store
            .link_source_mentions_company(source.id, request.company_id)
            .await
            .map_err(|e| StageFailure::store(CandidateStage::LinkMentions, e))?;

        Ok(claims.len())
    }
}

fn requested_types(requested: &[SourceType]) -> Vec<SourceType> {
    if requested.is_empty() {
        return vec![SourceType::News];
    }
    let mut seen = HashSet::new();
    requested
        .iter()
        .copied()
        .filter(|t| seen.insert(*t))
        .collect()
}

fn is_stopped(token: &CancellationToken, deadline: Option<Instant>) -> bool {
    token.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d)
}
