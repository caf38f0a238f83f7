//! Claim extraction from one normalized source document.

use std::sync::Arc;

use pulsegraph_core::{ClaimType, ExtractedClaim, Period, SourceDoc};
use pulsegraph_llm::{generate_structured, StructuredGenerator};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::ExtractError;

pub const DEFAULT_MAX_CHARS: usize = 24_000;

const SYSTEM_PROMPT: &str = "You extract atomic, verifiable factual claims about a company \
event from a single source document. Each claim states exactly one fact, is self-contained, \
and is supported by the text. Do not speculate or merge facts from outside the document.";

#[derive(Debug, Deserialize, JsonSchema)]
struct ClaimBatch {
    claims: Vec<RawClaim>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RawClaim {
    /// One self-contained factual statement.
    text: String,
    /// revenue, guidance, segment_growth, segment_revenue, market_reaction, other,
    /// or another short lowercase token.
    claim_type: String,
    /// Confidence between 0 and 1 that the source supports the claim.
    confidence: f64,
}

pub struct ClaimExtractor {
    generator: Option<Arc<dyn StructuredGenerator>>,
    max_chars: usize,
    temperature: f32,
    max_tokens: u32,
}

impl ClaimExtractor {
    #[must_use]
    pub fn new(generator: Option<Arc<dyn StructuredGenerator>>, max_chars: usize) -> Self {
        Self {
            generator,
            max_chars: max_chars.max(1),
            temperature: 0.1,
            max_tokens: 1500,
        }
    }

    /// Extract claims about `company` in `period` from `source`.
    ///
    /// Blank claims are dropped, confidences are clamped into `[0, 1]` and
    /// claim types are normalized.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Unavailable`] if no backend is configured, or
    /// [`ExtractError::Backend`] if the backend fails or answers malformed JSON.
    pub async fn extract(
        &self,
        company: &str,
        period: Period,
        source: &SourceDoc,
    ) -> Result<Vec<ExtractedClaim>, ExtractError> {
        let generator = self.generator.as_ref().ok_or(ExtractError::Unavailable)?;

        let prompt = build_prompt(company, period, source, self.max_chars);
        let batch: ClaimBatch = generate_structured(
            generator.as_ref(),
            SYSTEM_PROMPT,
            &prompt,
            self.temperature,
            self.max_tokens,
        )
        .await?;

        let raw_count = batch.claims.len();
        let claims: Vec<ExtractedClaim> = batch
            .claims
            .into_iter()
            .filter(|raw| !raw.text.trim().is_empty())
            .map(|raw| {
                ExtractedClaim::new(
                    &raw.text,
                    ClaimType::normalize(&raw.claim_type),
                    raw.confidence,
                )
            })
            .collect();

        tracing::debug!(
            url = %source.url,
            raw_count,
            kept = claims.len(),
            "claims extracted"
        );
        Ok(claims)
    }
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(idx, _)| &text[..idx])
}

fn build_prompt(company: &str, period: Period, source: &SourceDoc, max_chars: usize) -> String {
    format!(
        "Company: {company}\n\
         Period: {period}\n\
         Source type: {source_type}\n\
         Source title: {title}\n\
         Source URL: {url}\n\n\
         Extract the factual claims this document makes about {company} for {period}. \
         Prefer concrete figures (revenue, growth rates, guidance ranges, segment results, \
         market reaction). Use claim_type one of: {types}, or another short lowercase token. \
         Return an empty list if the document says nothing relevant.\n\n\
         Document:\n{text}",
        source_type = source.source_type,
        title = source.title,
        url = source.url,
        types = ClaimType::KNOWN.join(", "),
        text = truncate_chars(&source.raw_text, max_chars),
    )
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use pulsegraph_core::SourceType;
    use pulsegraph_llm::{GenerationRequest, LlmError};
    use serde_json::{json, Value};

    use super::*;

    struct Replies(Value);

    #[async_trait]
    impl StructuredGenerator for Replies {
        fn name(&self) -> &str {
            "replies"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<Value, LlmError> {
            assert_eq!(request.schema_name, "ClaimBatch");
            Ok(self.0.clone())
        }
    }

    fn doc(text: &str) -> SourceDoc {
        SourceDoc {
            url: "https://news.example/nvda".to_string(),
            title: "NVIDIA results".to_string(),
            raw_text: text.to_string(),
            source_type: SourceType::News,
            fetched_at: Utc::now(),
            published_at: None,
            query: None,
            site_name: None,
            metadata: json!({}),
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn prompt_is_truncated_to_budget() {
        let long = "x".repeat(50);
        let prompt = build_prompt("NVIDIA", Period::new(3, 2025).unwrap(), &doc(&long), 10);
        assert!(prompt.ends_with(&format!("Document:\n{}", "x".repeat(10))));
        assert!(prompt.contains("Period: Q3-2025"));
    }

    #[tokio::test]
    async fn claims_are_cleaned() {
        let extractor = ClaimExtractor::new(
            Some(Arc::new(Replies(json!({
                "claims": [
                    { "text": " Revenue rose 94% year over year. ", "claim_type": "Revenue", "confidence": 0.93 },
                    { "text": "   ", "claim_type": "other", "confidence": 0.5 },
                    { "text": "Gross margin was 75%.", "claim_type": "Gross Margin", "confidence": 1.4 }
                ]
            })))),
            DEFAULT_MAX_CHARS,
        );

        let claims = extractor
            .extract("NVIDIA", Period::new(3, 2025).unwrap(), &doc("body"))
            .await
            .unwrap();

        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].text, "Revenue rose 94% year over year.");
        assert_eq!(claims[0].claim_type, ClaimType::Revenue);
        assert_eq!(claims[1].claim_type.as_str(), "gross_margin");
        assert_eq!(claims[1].confidence, 1.0);
    }

    #[tokio::test]
    async fn malformed_output_is_an_error() {
        let extractor =
            ClaimExtractor::new(Some(Arc::new(Replies(json!({ "items": [] })))), 100);
        let err = extractor
            .extract("NVIDIA", Period::new(3, 2025).unwrap(), &doc("body"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Backend(LlmError::Malformed { .. })));
    }

    #[tokio::test]
    async fn missing_backend_is_unavailable() {
        let extractor = ClaimExtractor::new(None, 100);
        let err = extractor
            .extract("NVIDIA", Period::new(3, 2025).unwrap(), &doc("body"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unavailable));
    }
}
