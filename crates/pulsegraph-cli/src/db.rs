//! Database maintenance commands.

use std::path::Path;

use chrono::Utc;
use pulsegraph_db::PgGraphStore;

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails.
pub(crate) async fn run_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = pulsegraph_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Load the seed file into the graph.
///
/// Running the seed again updates rows in place; nothing is duplicated.
///
/// # Errors
///
/// Returns an error if the seed file cannot be read or validated, or the
/// first store write that fails.
pub(crate) async fn run_seed(
    pool: &sqlx::PgPool,
    config: &pulsegraph_core::AppConfig,
    path: Option<&Path>,
) -> anyhow::Result<()> {
    let path = path.unwrap_or(&config.companies_path);
    let file = pulsegraph_core::load_companies(path)?;
    let store = PgGraphStore::new(pool.clone());

    let summary = pulsegraph_db::seed_companies(&store, &file.companies, Utc::now()).await?;
    tracing::info!(
        path = %path.display(),
        companies = summary.companies,
        events = summary.events,
        sources = summary.sources,
        claims = summary.claims,
        signals = summary.signals,
        "seed complete"
    );
    println!(
        "seeded {} companies, {} events, {} sources, {} claims, {} signals",
        summary.companies, summary.events, summary.sources, summary.claims, summary.signals
    );
    Ok(())
}
