//! Database operations for the `claims` table.

use chrono::{DateTime, Utc};
use pulsegraph_core::{normalize_claim_text, ExtractedClaim, Period};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{map_fk_violation, DbError};

/// A row from the `claims` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ClaimRow {
    pub id: i64,
    pub public_id: Uuid,
    pub company_id: i64,
    pub event_id: i64,
    pub source_id: i64,
    pub text: String,
    pub text_hash: String,
    pub claim_type: String,
    pub confidence: f64,
    pub last_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A claim joined with the source it was extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ClaimWithSourceRow {
    pub claim_id: i64,
    pub text: String,
    pub claim_type: String,
    pub confidence: f64,
    pub last_updated_at: DateTime<Utc>,
    pub source_url: String,
    pub source_title: String,
    pub source_type: String,
    pub fetched_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

const CLAIM_COLUMNS: &str = "id, public_id, company_id, event_id, source_id, text, text_hash, \
     claim_type, confidence, last_updated_at, created_at";

/// SHA-256 hex digest of the normalized claim text; the text part of the
/// claim upsert key.
#[must_use]
pub fn claim_text_hash(text: &str) -> String {
    let digest = Sha256::digest(normalize_claim_text(text).as_bytes());
    format!("{digest:x}")
}

/// Insert a claim or refresh the one with the same
/// `(company, event, source, normalized text)` key.
///
/// # Errors
///
/// Returns [`DbError::Referential`] if the company, event or source does not
/// exist (or the event belongs to another company), or [`DbError::Sqlx`] for
/// any other failure.
pub async fn upsert_claim(
    pool: &PgPool,
    company_id: i64,
    event_id: i64,
    source_id: i64,
    claim: &ExtractedClaim,
) -> Result<ClaimRow, DbError> {
    let row = sqlx::query_as::<_, ClaimRow>(&format!(
        "INSERT INTO claims \
             (public_id, company_id, event_id, source_id, text, text_hash, claim_type, confidence) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT ON CONSTRAINT claims_upsert_key DO UPDATE SET \
             text = EXCLUDED.text, \
             claim_type = EXCLUDED.claim_type, \
             confidence = EXCLUDED.confidence, \
             last_updated_at = NOW() \
         RETURNING {CLAIM_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(event_id)
    .bind(source_id)
    .bind(&claim.text)
    .bind(claim_text_hash(&claim.text))
    .bind(claim.claim_type.as_str())
    .bind(claim.confidence)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        map_fk_violation(e, || {
            format!("company_id={company_id} event_id={event_id} source_id={source_id}")
        })
    })?;

    Ok(row)
}

/// Claims of the company's event for `period`, highest confidence first,
/// then most recently updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_claims_with_sources(
    pool: &PgPool,
    company_id: i64,
    period: Period,
    limit: i64,
) -> Result<Vec<ClaimWithSourceRow>, DbError> {
    let rows = sqlx::query_as::<_, ClaimWithSourceRow>(
        "SELECT c.id AS claim_id, c.text, c.claim_type, c.confidence, c.last_updated_at, \
                s.url AS source_url, s.title AS source_title, s.source_type, \
                s.fetched_at, s.published_at \
         FROM claims c \
         JOIN events e ON e.id = c.event_id \
         JOIN sources s ON s.id = c.source_id \
         WHERE c.company_id = $1 AND e.period = $2 \
         ORDER BY c.confidence DESC, c.last_updated_at DESC, c.id DESC \
         LIMIT $3",
    )
    .bind(company_id)
    .bind(period.token())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ignores_case_and_whitespace() {
        assert_eq!(
            claim_text_hash("Revenue rose 15%"),
            claim_text_hash("  revenue   ROSE\t15%\n")
        );
        assert_ne!(
            claim_text_hash("Revenue rose 15%"),
            claim_text_hash("Revenue rose 16%")
        );
    }

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        let hash = claim_text_hash("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
