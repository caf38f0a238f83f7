//! Database operations for the `events` table.

use chrono::{DateTime, NaiveDate, Utc};
use pulsegraph_core::{EventType, Period};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{map_fk_violation, DbError};

/// A row from the `events` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct EventRow {
    pub id: i64,
    pub public_id: Uuid,
    pub company_id: i64,
    pub period: String,
    pub event_type: String,
    pub event_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const EVENT_COLUMNS: &str =
    "id, public_id, company_id, period, event_type, event_date, created_at, updated_at";

/// Insert the event for `(company_id, period)` or update its date.
///
/// When `date` is `None` a new event is dated on the first day of the period
/// and an existing event keeps its date. The event type of an existing event
/// is left untouched.
///
/// # Errors
///
/// Returns [`DbError::Referential`] if the company does not exist, or
/// [`DbError::Sqlx`] for any other failure.
pub async fn upsert_event(
    pool: &PgPool,
    company_id: i64,
    period: Period,
    event_type: EventType,
    date: Option<NaiveDate>,
) -> Result<EventRow, DbError> {
    let row = sqlx::query_as::<_, EventRow>(&format!(
        "INSERT INTO events (public_id, company_id, period, event_type, event_date) \
         VALUES ($1, $2, $3, $4, COALESCE($5::date, $6::date)) \
         ON CONFLICT ON CONSTRAINT events_company_period_key DO UPDATE SET \
             event_date = COALESCE($5::date, events.event_date), \
             updated_at = NOW() \
         RETURNING {EVENT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(period.token())
    .bind(event_type.as_str())
    .bind(date)
    .bind(period.start_date())
    .fetch_one(pool)
    .await
    .map_err(|e| map_fk_violation(e, || format!("company_id={company_id}")))?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_event(
    pool: &PgPool,
    company_id: i64,
    period: Period,
) -> Result<Option<EventRow>, DbError> {
    let row = sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE company_id = $1 AND period = $2"
    ))
    .bind(company_id)
    .bind(period.token())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
