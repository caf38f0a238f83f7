//! Freshness, refresh, delta and compare command handlers.

use chrono::Utc;
use pulsegraph_core::{
    current_quarter, default_pair, AppConfig, EventType, Period, SignalType, SourceType,
};
use pulsegraph_db::{ClaimWithSourceRow, CompanyRow, GraphStore, PgGraphStore};
use pulsegraph_refresh::{
    compare_periods, signal_delta, CompareRequest, ComparisonReport, FreshnessEvaluator,
    RefreshError, RefreshRequest, RefreshSummary, SignalDelta,
};
use tokio_util::sync::CancellationToken;

use crate::services::build_services;

async fn require_company(store: &dyn GraphStore, name: &str) -> anyhow::Result<CompanyRow> {
    store
        .find_company_by_name(name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("company '{name}' not found; run `pulsegraph seed` first"))
}

/// Show which source types are stale across two periods.
///
/// # Errors
///
/// Returns an error if the company is unknown or the store lookup fails.
pub(crate) async fn run_freshness(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    company: &str,
    period_a: Option<Period>,
    period_b: Option<Period>,
) -> anyhow::Result<()> {
    let store = PgGraphStore::new(pool.clone());
    let company = require_company(&store, company).await?;

    let now = Utc::now();
    let (default_a, default_b) = default_pair(now);
    let periods = [period_a.unwrap_or(default_a), period_b.unwrap_or(default_b)];

    println!("{:<10}{:<10}{:<22}MAX AGE", "PERIOD", "SOURCE", "LAST FETCHED");
    for period in periods {
        let records = store.latest_fetch_by_type(company.id, period).await?;
        for record in &records {
            let fetched = record.fetched_at.map_or_else(
                || "never".to_string(),
                |at| at.format("%Y-%m-%d %H:%M UTC").to_string(),
            );
            println!(
                "{:<10}{:<10}{:<22}{}h",
                period.to_string(),
                record.source_type.as_str(),
                fetched,
                config.freshness.for_type(record.source_type).num_hours()
            );
        }
    }

    let report = FreshnessEvaluator::new(config.freshness)
        .check(&store, company.id, &periods, now)
        .await?;
    println!();
    println!("{}: {}", company.name, report.reason);
    Ok(())
}

/// Arguments of the `refresh` command.
#[derive(Debug)]
pub(crate) struct RefreshArgs<'a> {
    pub company: &'a str,
    pub period: Option<Period>,
    pub source_types: Vec<SourceType>,
    pub event_type: EventType,
    pub deadline_secs: Option<u64>,
    pub force: bool,
}

/// Source types a refresh should target.
///
/// Forced runs take the request as-is. Otherwise only stale types are
/// refreshed, narrowed to the requested ones when any were given.
pub(crate) fn select_targets(
    requested: &[SourceType],
    stale: &[SourceType],
    force: bool,
) -> Vec<SourceType> {
    if force {
        return requested.to_vec();
    }
    if requested.is_empty() {
        return stale.to_vec();
    }
    requested
        .iter()
        .copied()
        .filter(|t| stale.contains(t))
        .collect()
}

/// Refresh stale knowledge for one company and period.
///
/// # Errors
///
/// Returns an error if the company is unknown, the services cannot be built
/// or the store becomes unreachable. Per-candidate failures are reported in
/// the summary, not returned.
pub(crate) async fn run_refresh(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    args: &RefreshArgs<'_>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let services = build_services(pool, config, args.deadline_secs)?;
    let company = require_company(services.store.as_ref(), args.company).await?;
    let now = Utc::now();
    let period = args.period.unwrap_or_else(|| current_quarter(now));

    let targets = if args.force {
        select_targets(&args.source_types, &[], true)
    } else {
        let evaluator = if args.source_types.is_empty() {
            services.evaluator.clone()
        } else {
            services
                .evaluator
                .clone()
                .with_required(args.source_types.iter().copied())
        };
        let report = evaluator
            .check(services.store.as_ref(), company.id, &[period], now)
            .await?;
        let targets = select_targets(&args.source_types, &report.stale_types, false);
        if targets.is_empty() {
            println!("{}: {} (use --force to refresh anyway)", company.name, report.reason);
            return Ok(());
        }
        targets
    };

    let request = RefreshRequest::for_company(&company, period, args.event_type, targets);
    let summary = match services.refresher.refresh(&request, cancel).await {
        Ok(summary) => summary,
        Err(RefreshError::StoreUnavailable(e)) => {
            anyhow::bail!("knowledge store unavailable; refresh aborted: {e}")
        }
        Err(e) => return Err(e.into()),
    };

    print_refresh_summary(&summary);
    Ok(())
}

fn print_refresh_summary(summary: &RefreshSummary) {
    println!(
        "refresh {} {} ({})",
        summary.company, summary.period, summary.event_type
    );
    for query in &summary.queries {
        println!("{:<10}{}", query.source_type.as_str(), query.query.primary);
    }
    println!(
        "discovered {}  fetched {}  upserted {}  claims {}  errors {}  skipped {}",
        summary.discovered_count,
        summary.fetched_count,
        summary.upserted_count,
        summary.claim_count,
        summary.error_count,
        summary.skipped_count
    );
    for failure in &summary.errors {
        println!("  {:<14}{}  {}", failure.stage.as_str(), failure.url, failure.reason);
    }
    if summary.error_count > summary.errors.len() {
        println!(
            "  ... {} more error(s) not shown",
            summary.error_count - summary.errors.len()
        );
    }
    if summary.cancelled {
        println!("refresh cancelled before all candidates were processed");
    }
}

/// Show the delta of one signal between two periods.
///
/// # Errors
///
/// Returns an error if the company is unknown or the store lookup fails.
pub(crate) async fn run_delta(
    pool: &sqlx::PgPool,
    company: &str,
    period_a: Option<Period>,
    period_b: Option<Period>,
    window: Option<&str>,
    signal_type: SignalType,
) -> anyhow::Result<()> {
    let store = PgGraphStore::new(pool.clone());
    let company = require_company(&store, company).await?;

    let (default_a, default_b) = default_pair(Utc::now());
    let window = window.unwrap_or_else(|| EventType::Earnings.default_window());
    let delta = signal_delta(
        &store,
        company.id,
        period_a.unwrap_or(default_a),
        period_b.unwrap_or(default_b),
        window,
        signal_type,
    )
    .await?;

    print_delta(&company.name, &delta);
    Ok(())
}

fn print_delta(company: &str, delta: &SignalDelta) {
    let score = |row: Option<&pulsegraph_db::SignalRow>| {
        row.map_or_else(|| "\u{2014}".to_string(), |r| r.score.to_string())
    };
    println!(
        "{company} {} ({}): {} {} vs {} {}",
        delta.signal_type,
        delta.window,
        delta.period_a,
        score(delta.a.as_ref()),
        delta.period_b,
        score(delta.b.as_ref())
    );
    match (&delta.delta, &delta.note) {
        (Some(value), _) => println!("delta {value:+}"),
        (None, Some(note)) => println!("{note}"),
        (None, None) => {}
    }
}

/// Compare two periods, optionally refreshing stale knowledge first.
///
/// # Errors
///
/// Returns an error if the company is unknown, the refresh services cannot
/// be built, or the store fails.
pub(crate) async fn run_compare(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    request: &CompareRequest,
    json: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let report = if request.auto_refresh {
        let services = build_services(pool, config, None)?;
        compare_periods(
            services.store.as_ref(),
            &services.evaluator,
            Some(&services.refresher),
            request,
            now,
            cancel,
        )
        .await
    } else {
        let store = PgGraphStore::new(pool.clone());
        let evaluator = FreshnessEvaluator::new(config.freshness);
        compare_periods(&store, &evaluator, None, request, now, cancel).await
    };

    let report = match report {
        Ok(report) => report,
        Err(RefreshError::CompanyNotFound(name)) => {
            anyhow::bail!("company '{name}' not found; run `pulsegraph seed` first")
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_comparison(&report);
    }
    Ok(())
}

fn print_claims(period: Period, claims: &[ClaimWithSourceRow]) {
    println!();
    println!("{period}: {} claim(s)", claims.len());
    if claims.is_empty() {
        return;
    }
    println!("{:<12}{:<7}{:<10}TEXT", "TYPE", "CONF", "SOURCE");
    for claim in claims {
        let text = if claim.text.chars().count() > 80 {
            format!("{}...", claim.text.chars().take(80).collect::<String>())
        } else {
            claim.text.clone()
        };
        println!(
            "{:<12}{:<7.2}{:<10}{}",
            claim.claim_type, claim.confidence, claim.source_type, text
        );
    }
}

fn print_comparison(report: &ComparisonReport) {
    let ticker = report
        .company
        .ticker
        .as_deref()
        .map(|t| format!(" ({t})"))
        .unwrap_or_default();
    println!(
        "{}{ticker}: {} vs {}",
        report.company.name, report.period_a, report.period_b
    );
    println!("freshness: {}", report.freshness.reason);
    if let Some(refresh) = &report.refresh {
        print_refresh_summary(refresh);
    }
    print_claims(report.period_a, &report.claims_a);
    print_claims(report.period_b, &report.claims_b);
    println!();
    print_delta(&report.company.name, &report.delta);
}
