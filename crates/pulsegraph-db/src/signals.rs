//! Database operations for the `signals` table.

use chrono::{DateTime, Utc};
use pulsegraph_core::{NewSignal, Period, SignalType};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{map_fk_violation, DbError};

/// A row from the `signals` table.
///
/// `score` is bound to a `NUMERIC(8,3)` column, so arithmetic on it is exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SignalRow {
    pub id: i64,
    pub public_id: Uuid,
    pub company_id: i64,
    pub event_id: i64,
    pub signal_type: String,
    #[sqlx(rename = "signal_window")]
    pub window: String,
    pub score: Decimal,
    pub volume: Option<i64>,
    pub computed_at: DateTime<Utc>,
}

const SIGNAL_COLUMNS: &str =
    "id, public_id, company_id, event_id, signal_type, signal_window, score, volume, computed_at";

/// Insert a signal or overwrite the one with the same
/// `(company, event, type, window)` key, bumping `computed_at`.
///
/// # Errors
///
/// Returns [`DbError::Referential`] if the company or event does not exist,
/// or [`DbError::Sqlx`] for any other failure.
pub async fn upsert_signal(
    pool: &PgPool,
    company_id: i64,
    event_id: i64,
    signal: &NewSignal,
) -> Result<SignalRow, DbError> {
    let row = sqlx::query_as::<_, SignalRow>(&format!(
        "INSERT INTO signals \
             (public_id, company_id, event_id, signal_type, signal_window, score, volume) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT ON CONSTRAINT signals_upsert_key DO UPDATE SET \
             score = EXCLUDED.score, \
             volume = EXCLUDED.volume, \
             computed_at = NOW() \
         RETURNING {SIGNAL_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(event_id)
    .bind(signal.signal_type.as_str())
    .bind(&signal.window)
    .bind(signal.score)
    .bind(signal.volume)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        map_fk_violation(e, || {
            format!(
                "company_id={company_id} event_id={event_id} signal={}",
                signal.signal_type
            )
        })
    })?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_signal(
    pool: &PgPool,
    company_id: i64,
    period: Period,
    signal_type: SignalType,
    window: &str,
) -> Result<Option<SignalRow>, DbError> {
    let row = sqlx::query_as::<_, SignalRow>(
        "SELECT s.id, s.public_id, s.company_id, s.event_id, s.signal_type, s.signal_window, \
                s.score, s.volume, s.computed_at \
         FROM signals s \
         JOIN events e ON e.id = s.event_id \
         WHERE s.company_id = $1 AND e.period = $2 \
           AND s.signal_type = $3 AND s.signal_window = $4",
    )
    .bind(company_id)
    .bind(period.token())
    .bind(signal_type.as_str())
    .bind(window)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
