//! Period comparison: freshness over both periods, an optional refresh of the
//! stale source types, then claims and the signal delta.

use chrono::{DateTime, Utc};
use pulsegraph_core::{default_pair, EventType, Period, SignalType};
use pulsegraph_db::{ClaimWithSourceRow, CompanyRow, GraphStore};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::delta::{signal_delta, SignalDelta};
use crate::error::RefreshError;
use crate::freshness::{FreshnessEvaluator, FreshnessReport};
use crate::orchestrator::{RefreshRequest, RefreshSummary, Refresher};

/// Claims returned per period.
pub const CLAIMS_PER_PERIOD: i64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareRequest {
    pub company: String,
    /// Defaults to the current quarter.
    pub period_a: Option<Period>,
    /// Defaults to the quarter before the current one.
    pub period_b: Option<Period>,
    pub event_type: EventType,
    pub signal_type: SignalType,
    /// Defaults to the event type's default window.
    pub window: Option<String>,
    pub auto_refresh: bool,
}

impl CompareRequest {
    #[must_use]
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            period_a: None,
            period_b: None,
            event_type: EventType::Earnings,
            signal_type: SignalType::Sentiment,
            window: None,
            auto_refresh: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanySummary {
    pub id: i64,
    pub name: String,
    pub ticker: Option<String>,
    pub industry: Option<String>,
}

impl From<&CompanyRow> for CompanySummary {
    fn from(row: &CompanyRow) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            ticker: row.ticker.clone(),
            industry: row.industry.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub company: CompanySummary,
    pub period_a: Period,
    pub period_b: Period,
    pub freshness: FreshnessReport,
    pub refresh: Option<RefreshSummary>,
    pub claims_a: Vec<ClaimWithSourceRow>,
    pub claims_b: Vec<ClaimWithSourceRow>,
    pub delta: SignalDelta,
}

/// Compare two periods for one company.
///
/// The refresh runs only when `request.auto_refresh` is set, a `refresher`
/// is supplied and freshness reports stale types; it targets `period_a` and
/// only the stale types.
///
/// # Errors
///
/// Returns [`RefreshError::CompanyNotFound`] for an unknown company, or a
/// store error from any lookup or from the refresh.
pub async fn compare_periods(
    store: &dyn GraphStore,
    evaluator: &FreshnessEvaluator,
    refresher: Option<&Refresher>,
    request: &CompareRequest,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> Result<ComparisonReport, RefreshError> {
    let company = store
        .find_company_by_name(&request.company)
        .await?
        .ok_or_else(|| RefreshError::CompanyNotFound(request.company.clone()))?;

    let (default_a, default_b) = default_pair(now);
    let period_a = request.period_a.unwrap_or(default_a);
    let period_b = request.period_b.unwrap_or(default_b);
    let window = request
        .window
        .clone()
        .unwrap_or_else(|| request.event_type.default_window().to_string());

    let freshness = evaluator
        .check(store, company.id, &[period_a, period_b], now)
        .await?;

    let refresh = match refresher {
        Some(refresher) if request.auto_refresh && freshness.was_stale => {
            let refresh_request = RefreshRequest::for_company(
                &company,
                period_a,
                request.event_type,
                freshness.stale_types.clone(),
            );
            Some(refresher.refresh(&refresh_request, cancel).await?)
        }
        _ => None,
    };

    let claims_a = store
        .list_claims_with_sources(company.id, period_a, CLAIMS_PER_PERIOD)
        .await?;
    let claims_b = store
        .list_claims_with_sources(company.id, period_b, CLAIMS_PER_PERIOD)
        .await?;

    let delta = signal_delta(
        store,
        company.id,
        period_a,
        period_b,
        &window,
        request.signal_type,
    )
    .await?;

    Ok(ComparisonReport {
        company: CompanySummary::from(&company),
        period_a,
        period_b,
        freshness,
        refresh,
        claims_a,
        claims_b,
        delta,
    })
}
