//! The [`GraphStore`] seam between the refresh pipeline and persistence.

use async_trait::async_trait;
use chrono::NaiveDate;
use pulsegraph_core::{
    EventType, ExtractedClaim, LatestFetch, NewSignal, Period, SignalType, SourceDoc,
};
use sqlx::PgPool;

use crate::claims::{ClaimRow, ClaimWithSourceRow};
use crate::companies::CompanyRow;
use crate::events::EventRow;
use crate::signals::SignalRow;
use crate::sources::SourceRow;
use crate::DbError;

/// Idempotent graph writes and the reads the pipeline needs.
///
/// Every upsert is keyed (see the table constraints in `migrations/`) so
/// repeating a call with the same key updates instead of duplicating, and
/// distinct keys may be written concurrently.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn upsert_company(
        &self,
        name: &str,
        ticker: Option<&str>,
        industry: Option<&str>,
    ) -> Result<CompanyRow, DbError>;

    async fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyRow>, DbError>;

    async fn get_company(&self, id: i64) -> Result<Option<CompanyRow>, DbError>;

    async fn upsert_event(
        &self,
        company_id: i64,
        period: Period,
        event_type: EventType,
        date: Option<NaiveDate>,
    ) -> Result<EventRow, DbError>;

    async fn get_event(&self, company_id: i64, period: Period)
        -> Result<Option<EventRow>, DbError>;

    async fn upsert_source(&self, doc: &SourceDoc) -> Result<SourceRow, DbError>;

    async fn get_source_by_url(&self, url: &str) -> Result<Option<SourceRow>, DbError>;

    async fn link_source_mentions_company(
        &self,
        source_id: i64,
        company_id: i64,
    ) -> Result<(), DbError>;

    async fn upsert_claim(
        &self,
        company_id: i64,
        event_id: i64,
        source_id: i64,
        claim: &ExtractedClaim,
    ) -> Result<ClaimRow, DbError>;

    async fn list_claims_with_sources(
        &self,
        company_id: i64,
        period: Period,
        limit: i64,
    ) -> Result<Vec<ClaimWithSourceRow>, DbError>;

    async fn upsert_signal(
        &self,
        company_id: i64,
        event_id: i64,
        signal: &NewSignal,
    ) -> Result<SignalRow, DbError>;

    async fn get_signal(
        &self,
        company_id: i64,
        period: Period,
        signal_type: SignalType,
        window: &str,
    ) -> Result<Option<SignalRow>, DbError>;

    async fn latest_fetch_by_type(
        &self,
        company_id: i64,
        period: Period,
    ) -> Result<Vec<LatestFetch>, DbError>;
}

/// Postgres-backed store. Same-key writes serialize on the table's unique
/// constraints via `INSERT … ON CONFLICT`.
#[derive(Debug, Clone)]
pub struct PgGraphStore {
    pool: PgPool,
}

impl PgGraphStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl GraphStore for PgGraphStore {
    async fn upsert_company(
        &self,
        name: &str,
        ticker: Option<&str>,
        industry: Option<&str>,
    ) -> Result<CompanyRow, DbError> {
        crate::companies::upsert_company(&self.pool, name, ticker, industry).await
    }

    async fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyRow>, DbError> {
        crate::companies::find_company_by_name(&self.pool, name).await
    }

    async fn get_company(&self, id: i64) -> Result<Option<CompanyRow>, DbError> {
        crate::companies::get_company(&self.pool, id).await
    }

    async fn upsert_event(
        &self,
        company_id: i64,
        period: Period,
        event_type: EventType,
        date: Option<NaiveDate>,
    ) -> Result<EventRow, DbError> {
        crate::events::upsert_event(&self.pool, company_id, period, event_type, date).await
    }

    async fn get_event(
        &self,
        company_id: i64,
        period: Period,
    ) -> Result<Option<EventRow>, DbError> {
        crate::events::get_event(&self.pool, company_id, period).await
    }

    async fn upsert_source(&self, doc: &SourceDoc) -> Result<SourceRow, DbError> {
        crate::sources::upsert_source(&self.pool, doc).await
    }

    async fn get_source_by_url(&self, url: &str) -> Result<Option<SourceRow>, DbError> {
        crate::sources::get_source_by_url(&self.pool, url).await
    }

    async fn link_source_mentions_company(
        &self,
        source_id: i64,
        company_id: i64,
    ) -> Result<(), DbError> {
        crate::sources::link_source_mentions_company(&self.pool, source_id, company_id).await
    }

    async fn upsert_claim(
        &self,
        company_id: i64,
        event_id: i64,
        source_id: i64,
        claim: &ExtractedClaim,
    ) -> Result<ClaimRow, DbError> {
        crate::claims::upsert_claim(&self.pool, company_id, event_id, source_id, claim).await
    }

    async fn list_claims_with_sources(
        &self,
        company_id: i64,
        period: Period,
        limit: i64,
    ) -> Result<Vec<ClaimWithSourceRow>, DbError> {
        crate::claims::list_claims_with_sources(&self.pool, company_id, period, limit).await
    }

    async fn upsert_signal(
        &self,
        company_id: i64,
        event_id: i64,
        signal: &NewSignal,
    ) -> Result<SignalRow, DbError> {
        crate::signals::upsert_signal(&self.pool, company_id, event_id, signal).await
    }

    async fn get_signal(
        &self,
        company_id: i64,
        period: Period,
        signal_type: SignalType,
        window: &str,
    ) -> Result<Option<SignalRow>, DbError> {
        crate::signals::get_signal(&self.pool, company_id, period, signal_type, window).await
    }

    async fn latest_fetch_by_type(
        &self,
        company_id: i64,
        period: Period,
    ) -> Result<Vec<LatestFetch>, DbError> {
        crate::sources::latest_fetch_by_type(&self.pool, company_id, period).await
    }
}
