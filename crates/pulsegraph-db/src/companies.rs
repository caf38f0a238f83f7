//! Database operations for the `companies` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `companies` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CompanyRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub ticker: Option<String>,
    pub industry: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COMPANY_COLUMNS: &str = "id, public_id, name, ticker, industry, created_at, updated_at";

/// Insert a company or update the existing one with the same name
/// (case-insensitive).
///
/// Known ticker and industry values are never cleared by a later call that
/// omits them.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_company(
    pool: &PgPool,
    name: &str,
    ticker: Option<&str>,
    industry: Option<&str>,
) -> Result<CompanyRow, DbError> {
    let row = sqlx::query_as::<_, CompanyRow>(&format!(
        "INSERT INTO companies (public_id, name, ticker, industry) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT ((lower(name))) DO UPDATE SET \
             ticker = COALESCE(EXCLUDED.ticker, companies.ticker), \
             industry = COALESCE(EXCLUDED.industry, companies.industry), \
             updated_at = NOW() \
         RETURNING {COMPANY_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(name.trim())
    .bind(ticker)
    .bind(industry)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Look up a company by name, ignoring case and surrounding whitespace.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_company_by_name(pool: &PgPool, name: &str) -> Result<Option<CompanyRow>, DbError> {
    let row = sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies WHERE lower(name) = lower($1)"
    ))
    .bind(name.trim())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_company(pool: &PgPool, id: i64) -> Result<Option<CompanyRow>, DbError> {
    let row = sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
