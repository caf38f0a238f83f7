//! Static registries of the event, signal, source and claim vocabularies.
//!
//! Each vocabulary is a closed `enum` with `match`-based metadata; nothing here
//! is mutated after process start.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Earnings,
    ProductLaunch,
    Acquisition,
    Regulatory,
    Conference,
    Dividend,
    StockSplit,
    ExecutiveChange,
    Lawsuit,
    Partnership,
}

string_enum!(EventType, "event type", {
    Earnings => "earnings",
    ProductLaunch => "product_launch",
    Acquisition => "acquisition",
    Regulatory => "regulatory",
    Conference => "conference",
    Dividend => "dividend",
    StockSplit => "stock_split",
    ExecutiveChange => "executive_change",
    Lawsuit => "lawsuit",
    Partnership => "partnership",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventTypeMetadata {
    pub event_type: EventType,
    pub display_name: &'static str,
    pub description: &'static str,
    pub typical_frequency: &'static str,
    pub default_window: &'static str,
}

impl EventType {
    #[must_use]
    pub fn metadata(self) -> EventTypeMetadata {
        let (display_name, description, typical_frequency, default_window) = match self {
            EventType::Earnings => (
                "Earnings Report",
                "Quarterly or annual earnings report and earnings call",
                "quarterly",
                "post_earnings_7d",
            ),
            EventType::ProductLaunch => (
                "Product Launch",
                "New product or service announcement and launch",
                "ad-hoc",
                "post_event_14d",
            ),
            EventType::Acquisition => (
                "Acquisition/Merger",
                "M&A activity including announcements and closings",
                "ad-hoc",
                "post_event_30d",
            ),
            EventType::Regulatory => (
                "Regulatory Event",
                "Regulatory filings, approvals, or compliance events",
                "quarterly",
                "post_event_7d",
            ),
            EventType::Conference => (
                "Conference/Presentation",
                "Investor conferences, keynotes, and presentations",
                "ad-hoc",
                "post_event_3d",
            ),
            EventType::Dividend => (
                "Dividend Announcement",
                "Dividend declarations or changes",
                "quarterly",
                "post_event_7d",
            ),
            EventType::StockSplit => (
                "Stock Split",
                "Stock split announcements and executions",
                "ad-hoc",
                "post_event_14d",
            ),
            EventType::ExecutiveChange => (
                "Executive Change",
                "CEO, CFO, or other C-suite appointments/departures",
                "ad-hoc",
                "post_event_14d",
            ),
            EventType::Lawsuit => (
                "Legal Action",
                "Lawsuits, legal settlements, or regulatory actions",
                "ad-hoc",
                "post_event_30d",
            ),
            EventType::Partnership => (
                "Partnership/Alliance",
                "Strategic partnerships or business alliances",
                "ad-hoc",
                "post_event_14d",
            ),
        };
        EventTypeMetadata {
            event_type: self,
            display_name,
            description,
            typical_frequency,
            default_window,
        }
    }

    #[must_use]
    pub fn default_window(self) -> &'static str {
        self.metadata().default_window
    }
}

// ---------------------------------------------------------------------------
// Signal types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Sentiment,
    Volatility,
    Volume,
    SocialEngagement,
    AnalystRating,
    NewsCoverage,
    PriceMomentum,
    InstitutionalFlow,
}

string_enum!(SignalType, "signal type", {
    Sentiment => "sentiment",
    Volatility => "volatility",
    Volume => "volume",
    SocialEngagement => "social_engagement",
    AnalystRating => "analyst_rating",
    NewsCoverage => "news_coverage",
    PriceMomentum => "price_momentum",
    InstitutionalFlow => "institutional_flow",
});

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalTypeMetadata {
    pub signal_type: SignalType,
    pub display_name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    /// `None` when the direction is context-dependent.
    pub higher_is_better: Option<bool>,
}

impl SignalType {
    #[must_use]
    pub fn metadata(self) -> SignalTypeMetadata {
        let (display_name, description, unit, min_value, max_value, higher_is_better) =
            match self {
                SignalType::Sentiment => (
                    "Sentiment Score",
                    "Aggregate sentiment from news, social media, and analyst commentary",
                    "score",
                    Some(0.0),
                    Some(1.0),
                    Some(true),
                ),
                SignalType::Volatility => (
                    "Volatility Index",
                    "Stock price volatility measure",
                    "percentage",
                    Some(0.0),
                    None,
                    Some(false),
                ),
                SignalType::Volume => (
                    "Trading Volume",
                    "Stock trading volume relative to average",
                    "count",
                    Some(0.0),
                    None,
                    None,
                ),
                SignalType::SocialEngagement => (
                    "Social Engagement",
                    "Social media mentions, likes, shares, and engagement",
                    "score",
                    Some(0.0),
                    Some(1.0),
                    Some(true),
                ),
                SignalType::AnalystRating => (
                    "Analyst Rating",
                    "Aggregate analyst ratings and price targets",
                    "rating",
                    Some(1.0),
                    Some(5.0),
                    Some(true),
                ),
                SignalType::NewsCoverage => (
                    "News Coverage",
                    "Volume and prominence of news coverage",
                    "score",
                    Some(0.0),
                    Some(1.0),
                    None,
                ),
                SignalType::PriceMomentum => (
                    "Price Momentum",
                    "Stock price momentum and trend strength",
                    "score",
                    Some(-1.0),
                    Some(1.0),
                    Some(true),
                ),
                SignalType::InstitutionalFlow => (
                    "Institutional Flow",
                    "Net institutional buying/selling activity",
                    "score",
                    Some(-1.0),
                    Some(1.0),
                    Some(true),
                ),
            };
        SignalTypeMetadata {
            signal_type: self,
            display_name,
            description,
            unit,
            min_value,
            max_value,
            higher_is_better,
        }
    }
}

// ---------------------------------------------------------------------------
// Source types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    News,
    Blog,
    Forum,
    Social,
    Filing,
}

string_enum!(SourceType, "source type", {
    News => "news",
    Blog => "blog",
    Forum => "forum",
    Social => "social",
    Filing => "filing",
});

impl SourceType {
    /// Prompt guidance describing what this kind of source is good for.
    #[must_use]
    pub fn guidance(self) -> &'static str {
        match self {
            SourceType::News => {
                "Optimize for breaking news coverage, press releases, and journalist analysis."
            }
            SourceType::Blog => {
                "Target in-depth analysis, expert commentary, and thought leadership."
            }
            SourceType::Forum => {
                "Focus on community discussions, retail investor sentiment, and debates."
            }
            SourceType::Social => {
                "Capture real-time reactions, trending topics, and viral content."
            }
            SourceType::Filing => {
                "Target official documents, SEC filings, and regulatory disclosures."
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Claim types
// ---------------------------------------------------------------------------

/// Open claim vocabulary: the well-known kinds plus any other lowercase token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClaimType {
    Revenue,
    Guidance,
    SegmentGrowth,
    SegmentRevenue,
    MarketReaction,
    Other,
    Custom(String),
}

impl ClaimType {
    pub const KNOWN: &'static [&'static str] = &[
        "revenue",
        "guidance",
        "segment_growth",
        "segment_revenue",
        "market_reaction",
        "other",
    ];

    /// Normalize free text (e.g. `"Segment Growth"`) into a claim type.
    /// Blank input maps to [`ClaimType::Other`].
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let token = raw
            .trim()
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        match token.as_str() {
            "revenue" => ClaimType::Revenue,
            "guidance" => ClaimType::Guidance,
            "segment_growth" => ClaimType::SegmentGrowth,
            "segment_revenue" => ClaimType::SegmentRevenue,
            "market_reaction" => ClaimType::MarketReaction,
            "" | "other" => ClaimType::Other,
            _ => ClaimType::Custom(token),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ClaimType::Revenue => "revenue",
            ClaimType::Guidance => "guidance",
            ClaimType::SegmentGrowth => "segment_growth",
            ClaimType::SegmentRevenue => "segment_revenue",
            ClaimType::MarketReaction => "market_reaction",
            ClaimType::Other => "other",
            ClaimType::Custom(token) => token,
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ClaimType {
    fn from(value: String) -> Self {
        ClaimType::normalize(&value)
    }
}

impl From<ClaimType> for String {
    fn from(value: ClaimType) -> Self {
        value.as_str().to_string()
    }
}
