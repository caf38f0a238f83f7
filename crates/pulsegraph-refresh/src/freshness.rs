//! Decides which source types need a refresh for a company and period.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use pulsegraph_core::{FreshnessThresholds, LatestFetch, Period, SourceType};
use pulsegraph_db::{DbError, GraphStore};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreshnessReport {
    pub was_stale: bool,
    /// Sorted, without duplicates.
    pub stale_types: Vec<SourceType>,
    pub checked_at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct FreshnessEvaluator {
    thresholds: FreshnessThresholds,
    required: BTreeSet<SourceType>,
}

impl FreshnessEvaluator {
    /// An evaluator that requires `news` coverage.
    #[must_use]
    pub fn new(thresholds: FreshnessThresholds) -> Self {
        Self {
            thresholds,
            required: BTreeSet::from([SourceType::News]),
        }
    }

    /// Replace the set of source types that must have at least one fetch.
    #[must_use]
    pub fn with_required(mut self, required: impl IntoIterator<Item = SourceType>) -> Self {
        self.required = required.into_iter().collect();
        self
    }

    #[must_use]
    pub fn thresholds(&self) -> &FreshnessThresholds {
        &self.thresholds
    }

    /// Evaluate latest-fetch records against the thresholds.
    ///
    /// A type is stale when it is required but absent, has no fetch
    /// timestamp, or its newest fetch is older than its threshold. When a type
    /// appears more than once (one record per period) the newest fetch wins.
    #[must_use]
    pub fn evaluate(&self, records: &[LatestFetch], now: DateTime<Utc>) -> FreshnessReport {
        let mut newest: BTreeMap<SourceType, Option<DateTime<Utc>>> =
            self.required.iter().map(|t| (*t, None)).collect();
        for record in records {
            let entry = newest.entry(record.source_type).or_insert(None);
            *entry = (*entry).max(record.fetched_at);
        }

        let stale_types: Vec<SourceType> = newest
            .into_iter()
            .filter(|(source_type, fetched_at)| match fetched_at {
                None => true,
                Some(at) => now.signed_duration_since(*at) > self.thresholds.for_type(*source_type),
            })
            .map(|(source_type, _)| source_type)
            .collect();

        let was_stale = !stale_types.is_empty();
        let reason = if was_stale {
            let names: Vec<&str> = stale_types.iter().map(|t| t.as_str()).collect();
            format!("Stale source types detected: {}", names.join(", "))
        } else {
            "All source data within freshness thresholds.".to_string()
        };

        FreshnessReport {
            was_stale,
            stale_types,
            checked_at: now,
            reason,
        }
    }

    /// Load latest fetches for every period in `periods` and evaluate them
    /// together.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the latest-fetch lookup fails.
    pub async fn check(
        &self,
        store: &dyn GraphStore,
        company_id: i64,
        periods: &[Period],
        now: DateTime<Utc>,
    ) -> Result<FreshnessReport, DbError> {
        let mut records = Vec::new();
        for period in periods {
            records.extend(store.latest_fetch_by_type(company_id, *period).await?);
        }
        let report = self.evaluate(&records, now);
        tracing::debug!(
            company_id,
            was_stale = report.was_stale,
            stale = ?report.stale_types,
            "freshness evaluated"
        );
        Ok(report)
    }
}
