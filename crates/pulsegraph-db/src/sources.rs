//! Database operations for the `sources` and `source_mentions` tables.

use chrono::{DateTime, Utc};
use pulsegraph_core::{LatestFetch, Period, SourceDoc, SourceType};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{map_fk_violation, DbError};

/// A row from the `sources` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SourceRow {
    pub id: i64,
    pub public_id: Uuid,
    pub url: String,
    pub title: String,
    pub raw_text: String,
    pub source_type: String,
    pub fetched_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub query: Option<String>,
    pub site_name: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SOURCE_COLUMNS: &str = "id, public_id, url, title, raw_text, source_type, fetched_at, \
     published_at, query, site_name, metadata, created_at, updated_at";

/// Insert a source or refresh the existing one with the same URL.
///
/// The latest write wins for title, text, type, fetch time and metadata.
/// Optional fields keep their stored value when the new document omits them.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_source(pool: &PgPool, doc: &SourceDoc) -> Result<SourceRow, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(&format!(
        "INSERT INTO sources \
             (public_id, url, title, raw_text, source_type, fetched_at, published_at, \
              query, site_name, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (url) DO UPDATE SET \
             title = EXCLUDED.title, \
             raw_text = EXCLUDED.raw_text, \
             source_type = EXCLUDED.source_type, \
             fetched_at = EXCLUDED.fetched_at, \
             published_at = COALESCE(EXCLUDED.published_at, sources.published_at), \
             query = COALESCE(EXCLUDED.query, sources.query), \
             site_name = COALESCE(EXCLUDED.site_name, sources.site_name), \
             metadata = EXCLUDED.metadata, \
             updated_at = NOW() \
         RETURNING {SOURCE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&doc.url)
    .bind(&doc.title)
    .bind(&doc.raw_text)
    .bind(doc.source_type.as_str())
    .bind(doc.fetched_at)
    .bind(doc.published_at)
    .bind(&doc.query)
    .bind(&doc.site_name)
    .bind(&doc.metadata)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_source_by_url(pool: &PgPool, url: &str) -> Result<Option<SourceRow>, DbError> {
    let row = sqlx::query_as::<_, SourceRow>(&format!(
        "SELECT {SOURCE_COLUMNS} FROM sources WHERE url = $1"
    ))
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Record that a source mentions a company. Repeated calls are no-ops.
///
/// # Errors
///
/// Returns [`DbError::Referential`] if either side does not exist, or
/// [`DbError::Sqlx`] for any other failure.
pub async fn link_source_mentions_company(
    pool: &PgPool,
    source_id: i64,
    company_id: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO source_mentions (source_id, company_id) \
         VALUES ($1, $2) \
         ON CONFLICT (source_id, company_id) DO NOTHING",
    )
    .bind(source_id)
    .bind(company_id)
    .execute(pool)
    .await
    .map_err(|e| {
        map_fk_violation(e, || {
            format!("source_id={source_id} company_id={company_id}")
        })
    })?;

    Ok(())
}

/// Most recent fetch per source type among the sources that back at least one
/// claim of the company's event for `period`.
///
/// Source types with no backing source are absent from the result.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or a stored source type is
/// not part of the known vocabulary.
pub async fn latest_fetch_by_type(
    pool: &PgPool,
    company_id: i64,
    period: Period,
) -> Result<Vec<LatestFetch>, DbError> {
    let rows = sqlx::query_as::<_, (String, DateTime<Utc>)>(
        "SELECT s.source_type, MAX(s.fetched_at) \
         FROM claims c \
         JOIN events e ON e.id = c.event_id \
         JOIN sources s ON s.id = c.source_id \
         WHERE c.company_id = $1 AND e.period = $2 \
         GROUP BY s.source_type \
         ORDER BY s.source_type",
    )
    .bind(company_id)
    .bind(period.token())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(source_type, fetched_at)| {
            let source_type = source_type
                .parse::<SourceType>()
                .map_err(|e| DbError::Sqlx(sqlx::Error::Decode(Box::new(e))))?;
            Ok(LatestFetch {
                source_type,
                fetched_at: Some(fetched_at),
            })
        })
        .collect()
}
