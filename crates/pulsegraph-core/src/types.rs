//! Value types shared between the store, the adapters and the refresh pipeline.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::registry::{ClaimType, SignalType, SourceType};

/// One acquired, normalized document ready to be upserted as a Source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDoc {
    /// Canonical URL; the Source upsert key.
    pub url: String,
    pub title: String,
    pub raw_text: String,
    pub source_type: SourceType,
    pub fetched_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    /// Search query that discovered this document, if any.
    pub query: Option<String>,
    pub site_name: Option<String>,
    pub metadata: serde_json::Value,
}

/// An atomic claim produced by the extractor (or declared in seed data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedClaim {
    pub text: String,
    pub claim_type: ClaimType,
    /// Always within `[0.0, 1.0]` once produced by [`ExtractedClaim::new`].
    pub confidence: f64,
}

impl ExtractedClaim {
    /// Build a claim, trimming the text and clamping confidence into `[0, 1]`.
    /// Non-finite confidences become `0.0`.
    #[must_use]
    pub fn new(text: &str, claim_type: ClaimType, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            text: text.trim().to_string(),
            claim_type,
            confidence,
        }
    }
}

/// A metric value to write for one (company, event, type, window).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSignal {
    pub signal_type: SignalType,
    pub window: String,
    pub score: Decimal,
    pub volume: Option<i64>,
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// 1-based position in the result list.
    pub rank: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchVertical {
    Web,
    News,
}

impl SearchVertical {
    /// Vertical best suited to a source type.
    #[must_use]
    pub fn for_source_type(source_type: SourceType) -> Self {
        match source_type {
            SourceType::News => SearchVertical::News,
            _ => SearchVertical::Web,
        }
    }
}

/// Most recent fetch observed for one source type. `None` means never fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestFetch {
    pub source_type: SourceType,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Per-source-type maximum age before stored knowledge is considered stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessThresholds {
    pub news: TimeDelta,
    pub blog: TimeDelta,
    pub forum: TimeDelta,
    pub social: TimeDelta,
    pub filing: TimeDelta,
}

impl Default for FreshnessThresholds {
    fn default() -> Self {
        Self {
            news: TimeDelta::days(7),
            blog: TimeDelta::days(14),
            forum: TimeDelta::days(3),
            social: TimeDelta::days(1),
            filing: TimeDelta::days(90),
        }
    }
}

impl FreshnessThresholds {
    #[must_use]
    pub fn for_type(&self, source_type: SourceType) -> TimeDelta {
        match source_type {
            SourceType::News => self.news,
            SourceType::Blog => self.blog,
            SourceType::Forum => self.forum,
            SourceType::Social => self.social,
            SourceType::Filing => self.filing,
        }
    }
}

/// Normalize claim text for the claim upsert key: trim, collapse internal
/// whitespace, lowercase.
#[must_use]
pub fn normalize_claim_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
