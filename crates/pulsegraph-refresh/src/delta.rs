//! Period-over-period comparison of one signal.

use pulsegraph_core::{Period, SignalType};
use pulsegraph_db::{DbError, GraphStore, SignalRow};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalDelta {
    pub period_a: Period,
    pub period_b: Period,
    pub window: String,
    pub signal_type: SignalType,
    /// `score(a) - score(b)`, present only when both sides exist.
    pub delta: Option<Decimal>,
    pub a: Option<SignalRow>,
    pub b: Option<SignalRow>,
    /// Explains why `delta` is absent: a missing side or an out-of-range
    /// difference.
    pub note: Option<String>,
}

/// Compare two already-loaded signal rows. Missing data is never an error.
#[must_use]
pub fn compute_delta(
    period_a: Period,
    period_b: Period,
    window: &str,
    signal_type: SignalType,
    a: Option<SignalRow>,
    b: Option<SignalRow>,
) -> SignalDelta {
    let (delta, note) = match (&a, &b) {
        (Some(a), Some(b)) => match a.score.checked_sub(b.score) {
            Some(delta) => (Some(delta), None),
            None => (
                None,
                Some(format!(
                    "{signal_type} delta between {period_a} and {period_b} is out of range."
                )),
            ),
        },
        (None, Some(_)) => (None, Some(format!("Missing {signal_type} signal for {period_a}."))),
        (Some(_), None) => (None, Some(format!("Missing {signal_type} signal for {period_b}."))),
        (None, None) => (
            None,
            Some(format!(
                "Missing {signal_type} signal for {period_a} and {period_b}."
            )),
        ),
    };

    SignalDelta {
        period_a,
        period_b,
        window: window.to_string(),
        signal_type,
        delta,
        a,
        b,
        note,
    }
}

/// Load both periods' signals for `company_id` and compare them.
///
/// # Errors
///
/// Returns [`DbError`] only if the store lookup itself fails.
pub async fn signal_delta(
    store: &dyn GraphStore,
    company_id: i64,
    period_a: Period,
    period_b: Period,
    window: &str,
    signal_type: SignalType,
) -> Result<SignalDelta, DbError> {
    let a = store
        .get_signal(company_id, period_a, signal_type, window)
        .await?;
    let b = store
        .get_signal(company_id, period_b, signal_type, window)
        .await?;
    Ok(compute_delta(period_a, period_b, window, signal_type, a, b))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;

    use super::*;

    fn row(score: &str) -> SignalRow {
        SignalRow {
            id: 1,
            public_id: Default::default(),
            company_id: 1,
            event_id: 1,
            signal_type: "sentiment".to_string(),
            window: "post_earnings_7d".to_string(),
            score: Decimal::from_str(score).unwrap(),
            volume: Some(2500),
            computed_at: Utc::now(),
        }
    }

    fn periods() -> (Period, Period) {
        (Period::new(1, 2026).unwrap(), Period::new(4, 2025).unwrap())
    }

    #[test]
    fn delta_is_exact_difference() {
        let (a, b) = periods();
        let out = compute_delta(
            a,
            b,
            "post_earnings_7d",
            SignalType::Sentiment,
            Some(row("0.78")),
            Some(row("0.68")),
        );
        assert_eq!(out.delta, Some(Decimal::from_str("0.10").unwrap()));
        assert!(out.note.is_none());
    }

    #[test]
    fn missing_b_has_note_and_no_delta() {
        let (a, b) = periods();
        let out = compute_delta(
            a,
            b,
            "post_earnings_7d",
            SignalType::Sentiment,
            Some(row("0.78")),
            None,
        );
        assert!(out.delta.is_none());
        assert_eq!(
            out.note.as_deref(),
            Some("Missing sentiment signal for Q4-2025.")
        );
        assert!(out.a.is_some());
    }

    #[test]
    fn both_missing_names_both_periods() {
        let (a, b) = periods();
        let out = compute_delta(a, b, "w", SignalType::Volatility, None, None);
        assert_eq!(
            out.note.as_deref(),
            Some("Missing volatility signal for Q1-2026 and Q4-2025.")
        );
    }

    #[test]
    fn overflowing_difference_is_explained() {
        let (a, b) = periods();
        let out = compute_delta(
            a,
            b,
            "post_earnings_7d",
            SignalType::Sentiment,
            Some(row(&Decimal::MAX.to_string())),
            Some(row("-1")),
        );
        assert!(out.delta.is_none());
        assert_eq!(
            out.note.as_deref(),
            Some("sentiment delta between Q1-2026 and Q4-2025 is out of range.")
        );
        assert!(out.a.is_some() && out.b.is_some());
    }
}
