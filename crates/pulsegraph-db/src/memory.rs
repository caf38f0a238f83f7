//! In-process [`GraphStore`] used by tests and dry runs.
//!
//! A single mutex guards all tables, so every upsert is serialized and the
//! key semantics match the Postgres constraints.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pulsegraph_core::{
    EventType, ExtractedClaim, LatestFetch, NewSignal, Period, SignalType, SourceDoc, SourceType,
};
use uuid::Uuid;

use crate::claims::{claim_text_hash, ClaimRow, ClaimWithSourceRow};
use crate::companies::CompanyRow;
use crate::events::EventRow;
use crate::signals::SignalRow;
use crate::sources::SourceRow;
use crate::store::GraphStore;
use crate::DbError;

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    companies: BTreeMap<i64, CompanyRow>,
    events: BTreeMap<i64, EventRow>,
    sources: BTreeMap<i64, SourceRow>,
    mentions: BTreeSet<(i64, i64)>,
    claims: BTreeMap<i64, ClaimRow>,
    signals: BTreeMap<i64, SignalRow>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_company(&self, company_id: i64) -> Result<(), DbError> {
        if self.companies.contains_key(&company_id) {
            Ok(())
        } else {
            Err(DbError::Referential {
                entity: "company",
                key: format!("company_id={company_id}"),
            })
        }
    }

    fn require_event(&self, company_id: i64, event_id: i64) -> Result<(), DbError> {
        match self.events.get(&event_id) {
            Some(event) if event.company_id == company_id => Ok(()),
            _ => Err(DbError::Referential {
                entity: "event",
                key: format!("company_id={company_id} event_id={event_id}"),
            }),
        }
    }

    fn require_source(&self, source_id: i64) -> Result<(), DbError> {
        if self.sources.contains_key(&source_id) {
            Ok(())
        } else {
            Err(DbError::Referential {
                entity: "source",
                key: format!("source_id={source_id}"),
            })
        }
    }

    fn event_for(&self, company_id: i64, period: Period) -> Option<&EventRow> {
        let token = period.token();
        self.events
            .values()
            .find(|e| e.company_id == company_id && e.period == token)
    }
}

#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryGraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`DbError::Unavailable`] until
    /// reset, mimicking a lost database connection.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    #[must_use]
    pub fn company_count(&self) -> usize {
        self.lock().companies.len()
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.lock().events.len()
    }

    #[must_use]
    pub fn source_count(&self) -> usize {
        self.lock().sources.len()
    }

    #[must_use]
    pub fn claim_count(&self) -> usize {
        self.lock().claims.len()
    }

    #[must_use]
    pub fn signal_count(&self) -> usize {
        self.lock().signals.len()
    }

    #[must_use]
    pub fn mention_count(&self) -> usize {
        self.lock().mentions.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DbError::Unavailable(
                "memory store marked unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn upsert_company(
        &self,
        name: &str,
        ticker: Option<&str>,
        industry: Option<&str>,
    ) -> Result<CompanyRow, DbError> {
        self.check_available()?;
        let mut tables = self.lock();
        let now = Utc::now();
        let name = name.trim();
        let key = name.to_lowercase();

        if let Some(row) = tables
            .companies
            .values_mut()
            .find(|c| c.name.to_lowercase() == key)
        {
            if let Some(ticker) = ticker {
                row.ticker = Some(ticker.to_string());
            }
            if let Some(industry) = industry {
                row.industry = Some(industry.to_string());
            }
            row.updated_at = now;
            return Ok(row.clone());
        }

        let id = tables.allocate_id();
        let row = CompanyRow {
            id,
            public_id: Uuid::new_v4(),
            name: name.to_string(),
            ticker: ticker.map(str::to_string),
            industry: industry.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        tables.companies.insert(id, row.clone());
        Ok(row)
    }

    async fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyRow>, DbError> {
        self.check_available()?;
        let key = name.trim().to_lowercase();
        Ok(self
            .lock()
            .companies
            .values()
            .find(|c| c.name.to_lowercase() == key)
            .cloned())
    }

    async fn get_company(&self, id: i64) -> Result<Option<CompanyRow>, DbError> {
        self.check_available()?;
        Ok(self.lock().companies.get(&id).cloned())
    }

    async fn upsert_event(
        &self,
        company_id: i64,
        period: Period,
        event_type: EventType,
        date: Option<NaiveDate>,
    ) -> Result<EventRow, DbError> {
        self.check_available()?;
        let mut tables = self.lock();
        tables.require_company(company_id)?;
        let now = Utc::now();
        let token = period.token();

        if let Some(row) = tables
            .events
            .values_mut()
            .find(|e| e.company_id == company_id && e.period == token)
        {
            if let Some(date) = date {
                row.event_date = date;
            }
            row.updated_at = now;
            return Ok(row.clone());
        }

        let id = tables.allocate_id();
        let row = EventRow {
            id,
            public_id: Uuid::new_v4(),
            company_id,
            period: token,
            event_type: event_type.as_str().to_string(),
            event_date: date.unwrap_or_else(|| period.start_date()),
            created_at: now,
            updated_at: now,
        };
        tables.events.insert(id, row.clone());
        Ok(row)
    }

    async fn get_event(
        &self,
        company_id: i64,
        period: Period,
    ) -> Result<Option<EventRow>, DbError> {
        self.check_available()?;
        Ok(self.lock().event_for(company_id, period).cloned())
    }

    async fn upsert_source(&self, doc: &SourceDoc) -> Result<SourceRow, DbError> {
        self.check_available()?;
        let mut tables = self.lock();
        let now = Utc::now();

        if let Some(row) = tables.sources.values_mut().find(|s| s.url == doc.url) {
            row.title.clone_from(&doc.title);
            row.raw_text.clone_from(&doc.raw_text);
            row.source_type = doc.source_type.as_str().to_string();
            row.fetched_at = doc.fetched_at;
            if doc.published_at.is_some() {
                row.published_at = doc.published_at;
            }
            if doc.query.is_some() {
                row.query.clone_from(&doc.query);
            }
            if doc.site_name.is_some() {
                row.site_name.clone_from(&doc.site_name);
            }
            row.metadata = doc.metadata.clone();
            row.updated_at = now;
            return Ok(row.clone());
        }

        let id = tables.allocate_id();
        let row = SourceRow {
            id,
            public_id: Uuid::new_v4(),
            url: doc.url.clone(),
            title: doc.title.clone(),
            raw_text: doc.raw_text.clone(),
            source_type: doc.source_type.as_str().to_string(),
            fetched_at: doc.fetched_at,
            published_at: doc.published_at,
            query: doc.query.clone(),
            site_name: doc.site_name.clone(),
            metadata: doc.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.sources.insert(id, row.clone());
        Ok(row)
    }

    async fn get_source_by_url(&self, url: &str) -> Result<Option<SourceRow>, DbError> {
        self.check_available()?;
        Ok(self
            .lock()
            .sources
            .values()
            .find(|s| s.url == url)
            .cloned())
    }

    async fn link_source_mentions_company(
        &self,
        source_id: i64,
        company_id: i64,
    ) -> Result<(), DbError> {
        self.check_available()?;
        let mut tables = self.lock();
        tables.require_source(source_id)?;
        tables.require_company(company_id)?;
        tables.mentions.insert((source_id, company_id));
        Ok(())
    }

    async fn upsert_claim(
        &self,
        company_id: i64,
        event_id: i64,
        source_id: i64,
        claim: &ExtractedClaim,
    ) -> Result<ClaimRow, DbError> {
        self.check_available()?;
        let mut tables = self.lock();
        tables.require_company(company_id)?;
        tables.require_event(company_id, event_id)?;
        tables.require_source(source_id)?;
        let now = Utc::now();
        let text_hash = claim_text_hash(&claim.text);

        if let Some(row) = tables.claims.values_mut().find(|c| {
            c.company_id == company_id
                && c.event_id == event_id
                && c.source_id == source_id
                && c.text_hash == text_hash
        }) {
            row.text.clone_from(&claim.text);
            row.claim_type = claim.claim_type.as_str().to_string();
            row.confidence = claim.confidence;
            row.last_updated_at = now;
            return Ok(row.clone());
        }

        let id = tables.allocate_id();
        let row = ClaimRow {
            id,
            public_id: Uuid::new_v4(),
            company_id,
            event_id,
            source_id,
            text: claim.text.clone(),
            text_hash,
            claim_type: claim.claim_type.as_str().to_string(),
            confidence: claim.confidence,
            last_updated_at: now,
            created_at: now,
        };
        tables.claims.insert(id, row.clone());
        Ok(row)
    }

    async fn list_claims_with_sources(
        &self,
        company_id: i64,
        period: Period,
        limit: i64,
    ) -> Result<Vec<ClaimWithSourceRow>, DbError> {
        self.check_available()?;
        let tables = self.lock();
        let Some(event_id) = tables.event_for(company_id, period).map(|e| e.id) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<ClaimWithSourceRow> = tables
            .claims
            .values()
            .filter(|c| c.company_id == company_id && c.event_id == event_id)
            .filter_map(|c| {
                let source = tables.sources.get(&c.source_id)?;
                Some(ClaimWithSourceRow {
                    claim_id: c.id,
                    text: c.text.clone(),
                    claim_type: c.claim_type.clone(),
                    confidence: c.confidence,
                    last_updated_at: c.last_updated_at,
                    source_url: source.url.clone(),
                    source_title: source.title.clone(),
                    source_type: source.source_type.clone(),
                    fetched_at: source.fetched_at,
                    published_at: source.published_at,
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(b.last_updated_at.cmp(&a.last_updated_at))
                .then(b.claim_id.cmp(&a.claim_id))
        });
        rows.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn upsert_signal(
        &self,
        company_id: i64,
        event_id: i64,
        signal: &NewSignal,
    ) -> Result<SignalRow, DbError> {
        self.check_available()?;
        let mut tables = self.lock();
        tables.require_company(company_id)?;
        tables.require_event(company_id, event_id)?;
        let now = Utc::now();
        let signal_type = signal.signal_type.as_str();

        if let Some(row) = tables.signals.values_mut().find(|s| {
            s.company_id == company_id
                && s.event_id == event_id
                && s.signal_type == signal_type
                && s.window == signal.window
        }) {
            row.score = signal.score;
            row.volume = signal.volume;
            row.computed_at = now;
            return Ok(row.clone());
        }

        let id = tables.allocate_id();
        let row = SignalRow {
            id,
            public_id: Uuid::new_v4(),
            company_id,
            event_id,
            signal_type: signal_type.to_string(),
            window: signal.window.clone(),
            score: signal.score,
            volume: signal.volume,
            computed_at: now,
        };
        tables.signals.insert(id, row.clone());
        Ok(row)
    }

    async fn get_signal(
        &self,
        company_id: i64,
        period: Period,
        signal_type: SignalType,
        window: &str,
    ) -> Result<Option<SignalRow>, DbError> {
        self.check_available()?;
        let tables = self.lock();
        let Some(event_id) = tables.event_for(company_id, period).map(|e| e.id) else {
            return Ok(None);
        };
        Ok(tables
            .signals
            .values()
            .find(|s| {
                s.company_id == company_id
                    && s.event_id == event_id
                    && s.signal_type == signal_type.as_str()
                    && s.window == window
            })
            .cloned())
    }

    async fn latest_fetch_by_type(
        &self,
        company_id: i64,
        period: Period,
    ) -> Result<Vec<LatestFetch>, DbError> {
        self.check_available()?;
        let tables = self.lock();
        let Some(event_id) = tables.event_for(company_id, period).map(|e| e.id) else {
            return Ok(Vec::new());
        };

        let mut latest: BTreeMap<SourceType, DateTime<Utc>> = BTreeMap::new();
        for claim in tables
            .claims
            .values()
            .filter(|c| c.company_id == company_id && c.event_id == event_id)
        {
            let Some(source) = tables.sources.get(&claim.source_id) else {
                continue;
            };
            let source_type = source
                .source_type
                .parse::<SourceType>()
                .map_err(|e| DbError::Sqlx(sqlx::Error::Decode(Box::new(e))))?;
            latest
                .entry(source_type)
                .and_modify(|at| *at = (*at).max(source.fetched_at))
                .or_insert(source.fetched_at);
        }

        Ok(latest
            .into_iter()
            .map(|(source_type, fetched_at)| LatestFetch {
                source_type,
                fetched_at: Some(fetched_at),
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
