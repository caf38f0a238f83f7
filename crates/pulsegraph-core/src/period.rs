//! Fiscal-quarter arithmetic.
//!
//! A [`Period`] is the canonical `Q{1..4}-{YYYY}` token used to partition
//! events, claims and signals. Everything here is pure; only [`parse_period`]
//! (and the `FromStr`/`TryFrom` impls built on it) can fail.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static PERIOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Q([1-4])-(\d{4})$").expect("valid period regex"));

/// Malformed period token or out-of-range quarter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("invalid period format '{0}', expected 'Q[1-4]-YYYY'")]
    Format(String),

    #[error("quarter must be 1-4, got {0}")]
    QuarterOutOfRange(u8),

    #[error("year must be 1000-9999, got {0}")]
    YearOutOfRange(i32),
}

/// Earliest year with a four-digit token.
pub const MIN_YEAR: i32 = 1000;
/// Latest year with a four-digit token.
pub const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    // Field order gives chronological `Ord`.
    year: i32,
    quarter: u8,
}

impl Period {
    pub const MIN: Period = Period {
        year: MIN_YEAR,
        quarter: 1,
    };
    pub const MAX: Period = Period {
        year: MAX_YEAR,
        quarter: 4,
    };

    /// Build a period from a quarter number and year.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::QuarterOutOfRange`] unless `quarter` is 1–4, and
    /// [`PeriodError::YearOutOfRange`] unless `year` has four digits.
    pub fn new(quarter: u8, year: i32) -> Result<Self, PeriodError> {
        if !(1..=4).contains(&quarter) {
            return Err(PeriodError::QuarterOutOfRange(quarter));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(PeriodError::YearOutOfRange(year));
        }
        Ok(Self { year, quarter })
    }

    #[must_use]
    pub fn quarter(self) -> u8 {
        self.quarter
    }

    #[must_use]
    pub fn year(self) -> i32 {
        self.year
    }

    /// The calendar quarter containing `date`, clamped to
    /// [`Period::MIN`]..=[`Period::MAX`].
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        if date.year() < MIN_YEAR {
            return Self::MIN;
        }
        if date.year() > MAX_YEAR {
            return Self::MAX;
        }
        // month0 is 0..=11, so the quotient is always 0..=3.
        #[allow(clippy::cast_possible_truncation)]
        let quarter = (date.month0() / 3) as u8 + 1;
        Self {
            year: date.year(),
            quarter,
        }
    }

    /// The quarter before this one; [`Period::MIN`] stays put.
    #[must_use]
    pub fn previous(self) -> Self {
        self.offset(-1)
    }

    /// The quarter after this one; [`Period::MAX`] stays put.
    #[must_use]
    pub fn next(self) -> Self {
        self.offset(1)
    }

    /// Step `n` quarters forward (positive) or backward (negative),
    /// saturating at [`Period::MIN`] and [`Period::MAX`].
    #[must_use]
    pub fn offset(self, n: i32) -> Self {
        self.checked_offset(n).unwrap_or(if n < 0 { Self::MIN } else { Self::MAX })
    }

    /// Like [`Period::offset`], but `None` when the result would leave the
    /// four-digit year range.
    #[must_use]
    pub fn checked_offset(self, n: i32) -> Option<Self> {
        let index = self.index() + i64::from(n);
        let year = i32::try_from(index.div_euclid(4)).ok()?;
        // rem_euclid(4) is 0..=3.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let quarter = index.rem_euclid(4) as u8 + 1;
        Self::new(quarter, year).ok()
    }

    fn index(self) -> i64 {
        i64::from(self.year) * 4 + i64::from(self.quarter - 1)
    }

    /// First calendar day of the quarter.
    #[must_use]
    pub fn start_date(self) -> NaiveDate {
        let month = u32::from(self.quarter - 1) * 3 + 1;
        NaiveDate::from_ymd_opt(self.year, month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Canonical `Qn-YYYY` token.
    #[must_use]
    pub fn token(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}-{}", self.quarter, self.year)
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_period(s)
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_period(&value)
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}

/// Quarter containing `now`.
#[must_use]
pub fn current_quarter(now: DateTime<Utc>) -> Period {
    Period::containing(now.date_naive())
}

/// Parse a `Q[1-4]-YYYY` token.
///
/// Reordered forms (`2025-Q3`), missing parts (`Q3`), and out-of-range
/// quarters (`Q5-2025`) are all rejected.
///
/// # Errors
///
/// Returns [`PeriodError::Format`] when `s` does not match exactly.
pub fn parse_period(s: &str) -> Result<Period, PeriodError> {
    let caps = PERIOD_RE
        .captures(s)
        .ok_or_else(|| PeriodError::Format(s.to_string()))?;
    let quarter = caps[1]
        .parse::<u8>()
        .map_err(|_| PeriodError::Format(s.to_string()))?;
    let year = caps[2]
        .parse::<i32>()
        .map_err(|_| PeriodError::Format(s.to_string()))?;
    Period::new(quarter, year).map_err(|_| PeriodError::Format(s.to_string()))
}

/// `true` if `s` is a well-formed period token.
#[must_use]
pub fn validate_period(s: &str) -> bool {
    parse_period(s).is_ok()
}

/// The period `periods_back` quarters before the one containing `now`.
#[must_use]
pub fn comparison_period(now: DateTime<Utc>, periods_back: u32) -> Period {
    current_quarter(now).offset(-i32::try_from(periods_back).unwrap_or(i32::MAX))
}

/// Default `(latest, comparison)` pair: the current quarter and the one before.
#[must_use]
pub fn default_pair(now: DateTime<Utc>) -> (Period, Period) {
    let latest = current_quarter(now);
    (latest, latest.previous())
}

#[cfg(test)]
#[path = "period_test.rs"]
mod tests;
