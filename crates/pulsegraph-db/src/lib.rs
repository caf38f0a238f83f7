//! Graph upsert layer: Postgres persistence for companies, events, sources,
//! claims and signals, plus the [`GraphStore`] seam the refresh pipeline
//! talks to.

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/pulsegraph-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &pulsegraph_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    /// An upsert referenced a parent that does not exist yet.
    #[error("referenced {entity} does not exist ({key})")]
    Referential { entity: &'static str, key: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    /// `true` when the store itself cannot be reached, as opposed to a
    /// problem with one particular write.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        match self {
            DbError::Unavailable(_) => true,
            DbError::Sqlx(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::WorkerCrashed
            ),
            DbError::Referential { .. } => false,
        }
    }
}

/// Map a foreign-key violation to [`DbError::Referential`], naming the parent
/// from the violated constraint. Other errors pass through as [`DbError::Sqlx`].
pub(crate) fn map_fk_violation(err: sqlx::Error, key: impl FnOnce() -> String) -> DbError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_foreign_key_violation() {
            let entity = match db_err.constraint() {
                Some(c) if c.contains("event") && !c.starts_with("events_") => "event",
                Some(c) if c.contains("source") && !c.starts_with("sources_") => "source",
                Some(c) if c.contains("company") => "company",
                _ => "parent",
            };
            return DbError::Referential { entity, key: key() };
        }
    }
    DbError::Sqlx(err)
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table may not exist yet on a fresh database; treat
    // absence as zero applied.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Ping the pool, reporting failure as [`DbError::Unavailable`].
///
/// # Errors
///
/// Returns [`DbError::Unavailable`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool)
        .await
        .map_err(|e| DbError::Unavailable(e.to_string()))
}

pub mod claims;
pub mod companies;
pub mod events;
pub mod memory;
pub mod seed;
pub mod signals;
pub mod sources;
pub mod store;

pub use claims::{
    claim_text_hash, list_claims_with_sources, upsert_claim, ClaimRow, ClaimWithSourceRow,
};
pub use companies::{find_company_by_name, get_company, upsert_company, CompanyRow};
pub use events::{get_event, upsert_event, EventRow};
pub use memory::MemoryGraphStore;
pub use seed::{seed_companies, SeedSummary};
pub use signals::{get_signal, upsert_signal, SignalRow};
pub use sources::{
    get_source_by_url, latest_fetch_by_type, link_source_mentions_company, upsert_source,
    SourceRow,
};
pub use store::{GraphStore, PgGraphStore};
