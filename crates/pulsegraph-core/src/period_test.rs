use chrono::TimeZone;

use super::*;

fn p(q: u8, y: i32) -> Period {
    Period::new(q, y).unwrap()
}

#[test]
fn current_quarter_maps_months_to_quarters() {
    let cases = [(1, 1), (3, 1), (4, 2), (6, 2), (7, 3), (9, 3), (10, 4), (12, 4)];
    for (month, quarter) in cases {
        let now = Utc.with_ymd_and_hms(2025, month, 15, 12, 0, 0).unwrap();
        assert_eq!(current_quarter(now), p(quarter, 2025), "month {month}");
    }
}

#[test]
fn previous_of_q1_borrows_a_year() {
    assert_eq!(p(1, 2025).previous(), p(4, 2024));
    assert_eq!(p(3, 2025).previous(), p(2, 2025));
}

#[test]
fn next_of_q4_carries_a_year() {
    assert_eq!(p(4, 2024).next(), p(1, 2025));
    assert_eq!(p(2, 2025).next(), p(3, 2025));
}

#[test]
fn format_then_parse_round_trips() {
    for year in [1999, 2024, 2025, 2100] {
        for quarter in 1..=4 {
            let period = p(quarter, year);
            assert_eq!(parse_period(&period.to_string()).unwrap(), period);
        }
    }
}

#[test]
fn display_uses_canonical_token() {
    assert_eq!(p(3, 2025).to_string(), "Q3-2025");
    assert_eq!(p(3, 2025).token(), "Q3-2025");
}

#[test]
fn parse_accepts_canonical_form() {
    assert_eq!(parse_period("Q3-2025").unwrap(), p(3, 2025));
}

#[test]
fn parse_rejects_malformed_tokens() {
    for bad in ["Q5-2025", "2025-Q3", "Q3", "Q0-2025", "q3-2025", "Q3-25", " Q3-2025", "Q3-2025x", ""] {
        assert!(
            matches!(parse_period(bad), Err(PeriodError::Format(_))),
            "expected format error for {bad:?}"
        );
        assert!(!validate_period(bad));
    }
}

#[test]
fn new_rejects_out_of_range_quarter() {
    assert_eq!(Period::new(0, 2025), Err(PeriodError::QuarterOutOfRange(0)));
    assert_eq!(Period::new(5, 2025), Err(PeriodError::QuarterOutOfRange(5)));
}

#[test]
fn offset_zero_is_identity() {
    let period = p(2, 2025);
    assert_eq!(period.offset(0), period);
}

#[test]
fn offset_forward_then_back_is_identity() {
    for quarter in 1..=4 {
        let period = p(quarter, 2025);
        assert_eq!(period.offset(1).offset(-1), period);
        assert_eq!(period.offset(-7).offset(7), period);
    }
}

#[test]
fn offset_crosses_year_boundaries() {
    assert_eq!(p(3, 2025).offset(2), p(1, 2026));
    assert_eq!(p(3, 2025).offset(-1), p(2, 2025));
    assert_eq!(p(1, 2025).offset(-5), p(4, 2023));
}

#[test]
fn default_pair_is_current_and_previous() {
    let now = Utc.with_ymd_and_hms(2025, 11, 20, 0, 0, 0).unwrap();
    assert_eq!(default_pair(now), (p(4, 2025), p(3, 2025)));

    let january = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
    assert_eq!(default_pair(january), (p(1, 2026), p(4, 2025)));
}

#[test]
fn comparison_period_walks_back() {
    let now = Utc.with_ymd_and_hms(2025, 11, 20, 0, 0, 0).unwrap();
    assert_eq!(comparison_period(now, 1), p(3, 2025));
    assert_eq!(comparison_period(now, 2), p(2, 2025));
}

#[test]
fn start_date_is_first_day_of_quarter() {
    assert_eq!(
        p(3, 2025).start_date(),
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    );
    assert_eq!(
        p(1, 2026).start_date(),
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    );
}

#[test]
fn ordering_is_chronological() {
    assert!(p(4, 2024) < p(1, 2025));
    assert!(p(2, 2025) < p(3, 2025));
}

#[test]
fn serde_uses_token_representation() {
    let json = serde_json::to_string(&p(1, 2026)).unwrap();
    assert_eq!(json, "\"Q1-2026\"");
    let back: Period = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p(1, 2026));
    assert!(serde_json::from_str::<Period>("\"2026-Q1\"").is_err());
}

#[test]
fn new_rejects_years_outside_four_digits() {
    assert_eq!(Period::new(1, 12345), Err(PeriodError::YearOutOfRange(12345)));
    assert_eq!(Period::new(4, 999), Err(PeriodError::YearOutOfRange(999)));
    assert_eq!(Period::new(4, -1), Err(PeriodError::YearOutOfRange(-1)));
    assert!(Period::new(1, MIN_YEAR).is_ok());
    assert!(Period::new(4, MAX_YEAR).is_ok());
}

#[test]
fn parse_rejects_years_below_range() {
    assert!(matches!(
        parse_period("Q1-0999"),
        Err(PeriodError::Format(_))
    ));
}

#[test]
fn stepping_saturates_at_the_year_range() {
    assert_eq!(Period::MIN, p(1, MIN_YEAR));
    assert_eq!(Period::MAX, p(4, MAX_YEAR));
    assert_eq!(Period::MIN.previous(), Period::MIN);
    assert_eq!(Period::MAX.next(), Period::MAX);
    assert_eq!(Period::MIN.checked_offset(-1), None);
    assert_eq!(Period::MAX.checked_offset(1), None);
    assert_eq!(p(3, 2025).offset(i32::MIN), Period::MIN);
    assert_eq!(p(3, 2025).offset(i32::MAX), Period::MAX);
    assert_eq!(Period::MIN.checked_offset(4), Some(p(1, 1001)));
}

#[test]
fn edge_periods_round_trip_through_text_and_serde() {
    for period in [Period::MIN, Period::MAX, Period::MIN.next(), Period::MAX.previous()] {
        let token = period.to_string();
        assert_eq!(parse_period(&token).unwrap(), period);
        let json = serde_json::to_string(&period).unwrap();
        assert_eq!(serde_json::from_str::<Period>(&json).unwrap(), period);
    }
    assert_eq!(Period::MIN.to_string(), "Q1-1000");
    assert_eq!(Period::MAX.to_string(), "Q4-9999");
}

#[test]
fn containing_clamps_dates_outside_the_year_range() {
    let early = NaiveDate::from_ymd_opt(999, 6, 1).unwrap();
    assert_eq!(Period::containing(early), Period::MIN);
    let late = NaiveDate::from_ymd_opt(10_000, 2, 1).unwrap();
    assert_eq!(Period::containing(late), Period::MAX);
}
