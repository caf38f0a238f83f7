use chrono::{DateTime, Utc};
use pulsegraph_core::{CompanyConfig, ExtractedClaim, NewSignal, SourceDoc};
use serde::Serialize;

use crate::store::GraphStore;
use crate::DbError;

/// Counts of rows written (inserted or updated) by [`seed_companies`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub companies: usize,
    pub events: usize,
    pub sources: usize,
    pub claims: usize,
    pub signals: usize,
}

/// Upsert companies from the seed file together with their events, sources,
/// claims and signals.
///
/// Seeded sources are stamped as fetched at `now`. Running the seed twice
/// leaves the graph unchanged apart from timestamps.
///
/// # Errors
///
/// Returns the first [`DbError`] raised by the store; rows written before the
/// failure stay written.
pub async fn seed_companies(
    store: &dyn GraphStore,
    companies: &[CompanyConfig],
    now: DateTime<Utc>,
) -> Result<SeedSummary, DbError> {
    let mut summary = SeedSummary::default();

    for company in companies {
        let company_row = store
            .upsert_company(
                &company.name,
                company.ticker.as_deref(),
                company.industry.as_deref(),
            )
            .await?;
        summary.companies += 1;

        for event in &company.events {
            let event_row = store
                .upsert_event(company_row.id, event.period, event.event_type, event.date)
                .await?;
            summary.events += 1;

            for source in &event.sources {
                let doc = SourceDoc {
                    url: source.url.clone(),
                    title: source.title.clone(),
                    raw_text: source.text.clone(),
                    source_type: source.source_type,
                    fetched_at: now,
                    published_at: source.published_at,
                    query: source.query.clone(),
                    site_name: source.site_name.clone(),
                    metadata: serde_json::json!({ "seeded": true }),
                };
                let source_row = store.upsert_source(&doc).await?;
                store
                    .link_source_mentions_company(source_row.id, company_row.id)
                    .await?;
                summary.sources += 1;

                for claim in &source.claims {
                    let claim =
                        ExtractedClaim::new(&claim.text, claim.claim_type.clone(), claim.confidence);
                    store
                        .upsert_claim(company_row.id, event_row.id, source_row.id, &claim)
                        .await?;
                    summary.claims += 1;
                }
            }

            for signal in &event.signals {
                let signal = NewSignal {
                    signal_type: signal.signal_type,
                    window: signal
                        .window
                        .clone()
                        .unwrap_or_else(|| event.event_type.default_window().to_string()),
                    score: signal.score,
                    volume: signal.volume,
                };
                store
                    .upsert_signal(company_row.id, event_row.id, &signal)
                    .await?;
                summary.signals += 1;
            }
        }

        tracing::info!(company = %company.name, events = company.events.len(), "seeded company");
    }

    Ok(summary)
}
