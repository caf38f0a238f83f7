//! Discovery query synthesis with a deterministic fallback.

use std::sync::Arc;

use futures::future::join_all;
use pulsegraph_core::{EventType, Period, SourceType};
use pulsegraph_llm::{generate_structured, StructuredGenerator};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const MAX_ALTERNATIVES: usize = 3;
const MAX_KEYWORDS: usize = 10;

const SYSTEM_PROMPT: &str = "You are an expert at crafting search queries that maximize \
relevant results from search engines and news databases. You understand how journalists, \
analysts, and content creators write about business events.";

/// A discovery query for one source type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SearchQuery {
    /// The main search query optimized for finding relevant content.
    #[serde(rename = "primary_query")]
    pub primary: String,
    /// Alternative query formulations (max 3).
    #[serde(rename = "alternative_queries")]
    pub alternatives: Vec<String>,
    /// Key search terms and concepts (max 10).
    pub keywords: Vec<String>,
    /// Brief explanation of query design choices.
    pub reasoning: String,
}

/// What the query is about.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub company: &'a str,
    pub ticker: Option<&'a str>,
    pub industry: Option<&'a str>,
    pub period: Period,
    pub event_type: EventType,
    pub source_type: SourceType,
}

pub struct QuerySynthesizer {
    generator: Option<Arc<dyn StructuredGenerator>>,
    temperature: f32,
    max_tokens: u32,
}

impl QuerySynthesizer {
    /// With no generator every query comes from the fallback templates.
    #[must_use]
    pub fn new(generator: Option<Arc<dyn StructuredGenerator>>) -> Self {
        Self {
            generator,
            temperature: 0.3,
            max_tokens: 300,
        }
    }

    /// Produce a query for `ctx`. Never fails: backend errors and unusable
    /// output fall back to [`fallback_query`].
    pub async fn synthesize(&self, ctx: &QueryContext<'_>) -> SearchQuery {
        let Some(generator) = &self.generator else {
            return fallback_query(ctx, "no generation backend configured");
        };

        let prompt = build_prompt(ctx);
        match generate_structured::<SearchQuery>(
            generator.as_ref(),
            SYSTEM_PROMPT,
            &prompt,
            self.temperature,
            self.max_tokens,
        )
        .await
        {
            Ok(query) => match sanitize(query) {
                Some(query) => {
                    tracing::info!(
                        company = ctx.company,
                        period = %ctx.period,
                        source_type = %ctx.source_type,
                        query = %query.primary,
                        "generated search query"
                    );
                    query
                }
                None => {
                    tracing::warn!(
                        company = ctx.company,
                        backend = generator.name(),
                        "generated query was empty, using fallback"
                    );
                    fallback_query(ctx, "empty primary query")
                }
            },
            Err(e) => {
                tracing::warn!(
                    company = ctx.company,
                    backend = generator.name(),
                    error = %e,
                    "query generation failed, using fallback"
                );
                fallback_query(ctx, &e.to_string())
            }
        }
    }

    /// One query per source type, in the order given. `ctx.source_type` is
    /// ignored.
    pub async fn synthesize_many(
        &self,
        ctx: &QueryContext<'_>,
        source_types: &[SourceType],
    ) -> Vec<(SourceType, SearchQuery)> {
        let queries = join_all(source_types.iter().map(|source_type| {
            let ctx = QueryContext {
                source_type: *source_type,
                ..*ctx
            };
            async move { self.synthesize(&ctx).await }
        }))
        .await;
        source_types.iter().copied().zip(queries).collect()
    }
}

fn sanitize(query: SearchQuery) -> Option<SearchQuery> {
    let primary = query.primary.trim().to_string();
    if primary.is_empty() {
        return None;
    }
    let non_blank = |items: Vec<String>, cap: usize| -> Vec<String> {
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(cap)
            .collect()
    };
    Some(SearchQuery {
        primary,
        alternatives: non_blank(query.alternatives, MAX_ALTERNATIVES),
        keywords: non_blank(query.keywords, MAX_KEYWORDS),
        reasoning: query.reasoning.trim().to_string(),
    })
}

fn event_guidance(event_type: EventType) -> &'static str {
    match event_type {
        EventType::Earnings => {
            "Focus on: quarterly results, revenue, earnings per share (EPS), guidance, \
             analyst reactions, beat/miss, outlook, growth metrics, key segments performance."
        }
        EventType::ProductLaunch => {
            "Focus on: new product announcements, features, pricing, availability, \
             market reception, competitive positioning, innovation, specifications."
        }
        EventType::Acquisition => {
            "Focus on: M&A deals, acquisition terms, strategic rationale, integration plans, \
             regulatory approval, deal value, market impact, synergies."
        }
        EventType::Regulatory => {
            "Focus on: SEC filings, compliance updates, regulatory changes, government actions, \
             legal proceedings, policy impacts, disclosure requirements."
        }
        EventType::Conference => {
            "Focus on: earnings calls, investor presentations, conference keynotes, Q&A sessions, \
             management commentary, strategic updates, analyst questions."
        }
        _ => "General event coverage.",
    }
}

fn build_prompt(ctx: &QueryContext<'_>) -> String {
    let mut context = vec![format!("Company: {}", ctx.company)];
    if let Some(ticker) = ctx.ticker {
        context.push(format!("Ticker: {ticker}"));
    }
    if let Some(industry) = ctx.industry {
        context.push(format!("Industry: {industry}"));
    }
    context.push(format!("Period: {}", ctx.period));
    context.push(format!("Event Type: {}", ctx.event_type));
    context.push(format!("Source Type: {}", ctx.source_type));

    format!(
        "Generate an optimized search query to find information about a company event.\n\n\
         Context:\n{context}\n\n\
         Event Type Guidance:\n{event}\n\n\
         Source Type Guidance:\n{source}\n\n\
         Requirements:\n\
         1. Create a primary query that will find the most relevant {source_type} content\n\
         2. Include company name/ticker and period clearly\n\
         3. Add event-specific keywords that journalists/analysts would use\n\
         4. Keep queries concise (8-15 words optimal for search engines)\n\
         5. Avoid overly generic terms; be specific to the event and timeframe\n\
         6. Give up to {MAX_ALTERNATIVES} alternative phrasings\n\
         7. Extract 5-{MAX_KEYWORDS} key search terms\n\n\
         Generate a search query that maximizes recall of relevant {source_type} content about \
         {company}'s {event_type} for period {period}.",
        context = context.join("\n"),
        event = event_guidance(ctx.event_type),
        source = ctx.source_type.guidance(),
        source_type = ctx.source_type,
        company = ctx.company,
        event_type = ctx.event_type,
        period = ctx.period,
    )
}

/// Template query used whenever generation is unavailable or unusable.
#[must_use]
pub fn fallback_query(ctx: &QueryContext<'_>, detail: &str) -> SearchQuery {
    let identifier = match ctx.ticker {
        Some(ticker) => format!("{} {ticker}", ctx.company),
        None => ctx.company.to_string(),
    };
    let period = ctx.period;
    let primary = match ctx.event_type {
        EventType::Earnings => format!("{identifier} {period} earnings results revenue EPS guidance"),
        EventType::ProductLaunch => format!("{identifier} {period} product launch announcement"),
        EventType::Acquisition => format!("{identifier} {period} acquisition merger deal"),
        EventType::Regulatory => {
            format!("{identifier} {period} SEC filing regulatory disclosure")
        }
        EventType::Conference => {
            format!("{identifier} {period} earnings call investor conference")
        }
        other => format!("{identifier} {period} {other}"),
    };

    SearchQuery {
        primary,
        alternatives: Vec::new(),
        keywords: vec![
            ctx.company.to_string(),
            period.token(),
            ctx.event_type.to_string(),
        ],
        reasoning: format!("Fallback query (generation failed: {detail})"),
    }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
