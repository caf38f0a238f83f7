//! End-to-end refresh and comparison runs against the in-memory graph store
//! with scripted search, fetch and generation backends.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pulsegraph_core::{
    parse_companies, Candidate, EventType, FreshnessThresholds, Period, SearchVertical,
    SourceType,
};
use pulsegraph_db::{seed_companies, GraphStore, MemoryGraphStore};
use pulsegraph_ingest::{ContentFetcher, IngestError, SearchService};
use pulsegraph_llm::{GenerationRequest, LlmError, StructuredGenerator};
use pulsegraph_refresh::{
    compare_periods, CandidateStage, ClaimExtractor, CompareRequest, FreshnessEvaluator,
    QuerySynthesizer, RefreshError, RefreshOptions, RefreshRequest, Refresher,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeSearch {
    candidates: Vec<Candidate>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeSearch {
    fn with_urls(count: usize) -> Arc<Self> {
        let candidates = (1..=count)
            .map(|i| Candidate {
                url: format!("https://news.example/{i}"),
                title: (i != 1).then(|| format!("Story {i}")),
                description: Some(format!("Snippet {i}")),
                rank: u32::try_from(i).unwrap(),
            })
            .collect();
        Arc::new(Self {
            candidates,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            candidates: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SearchService for FakeSearch {
    fn name(&self) -> &str {
        "fake_search"
    }

    async fn search(
        &self,
        _query: &str,
        max_results: usize,
        vertical: SearchVertical,
    ) -> Result<Vec<Candidate>, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(vertical, SearchVertical::News);
        if self.fail {
            return Err(IngestError::Status {
                status: 503,
                url: "https://serp.example".to_string(),
            });
        }
        Ok(self.candidates.iter().take(max_results).cloned().collect())
    }
}

/// Tracks how many fetches run at once and the highest value seen.
#[derive(Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[derive(Default)]
struct FakeFetcher {
    failing: HashSet<String>,
    delay: Option<Duration>,
    in_flight: Option<Arc<InFlight>>,
    cancel_on_fetch: Option<CancellationToken>,
    break_store_on_fetch: Option<Arc<MemoryGraphStore>>,
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    fn name(&self) -> &str {
        "fake_fetcher"
    }

    async fn fetch(&self, url: &str, locale: &str) -> Result<String, IngestError> {
        assert_eq!(locale, "us");
        if let Some(token) = &self.cancel_on_fetch {
            token.cancel();
        }
        if let Some(store) = &self.break_store_on_fetch {
            store.set_unavailable(true);
        }
        if let Some(gauge) = &self.in_flight {
            let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
            gauge.peak.fetch_max(now, Ordering::SeqCst);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(gauge) = &self.in_flight {
            gauge.current.fetch_sub(1, Ordering::SeqCst);
        }
        if self.failing.contains(url) {
            return Err(IngestError::Status {
                status: 403,
                url: url.to_string(),
            });
        }
        Ok(format!("NVIDIA revenue rose 94% year over year. Source: {url}"))
    }
}

/// Fails every query-generation call and answers extraction with one claim.
struct ScriptedGenerator;

#[async_trait]
impl StructuredGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, LlmError> {
        match request.schema_name.as_str() {
            "SearchQuery" => Err(LlmError::Unavailable("quota exhausted".to_string())),
            "ClaimBatch" => Ok(json!({
                "claims": [
                    { "text": "Revenue rose 94% year over year.", "claim_type": "revenue", "confidence": 0.9 }
                ]
            })),
            other => panic!("unexpected schema {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn q3() -> Period {
    Period::new(3, 2025).unwrap()
}

fn options() -> RefreshOptions {
    RefreshOptions {
        max_concurrency: 2,
        acquire_timeout: Duration::from_secs(5),
        extract_timeout: Duration::from_secs(5),
        ..RefreshOptions::default()
    }
}

fn refresher(
    store: Arc<MemoryGraphStore>,
    search: Arc<FakeSearch>,
    fetcher: FakeFetcher,
    options: RefreshOptions,
) -> Refresher {
    let generator: Arc<dyn StructuredGenerator> = Arc::new(ScriptedGenerator);
    Refresher::new(
        store,
        search,
        Arc::new(fetcher),
        QuerySynthesizer::new(Some(generator.clone())),
        ClaimExtractor::new(Some(generator), 10_000),
        options,
    )
}

async fn nvidia_request(store: &MemoryGraphStore) -> RefreshRequest {
    let company = store
        .upsert_company("NVIDIA", Some("NVDA"), Some("semiconductors"))
        .await
        .unwrap();
    RefreshRequest::for_company(&company, q3(), EventType::Earnings, vec![SourceType::News])
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn acquisition_failures_are_isolated() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let fetcher = FakeFetcher {
        failing: ["https://news.example/2", "https://news.example/4"]
            .into_iter()
            .map(String::from)
            .collect(),
        ..FakeFetcher::default()
    };
    let refresher = refresher(store.clone(), FakeSearch::with_urls(5), fetcher, options());

    let summary = refresher
        .refresh(&request, &CancellationToken::new())
        .await
        .expect("partial failure is not an error");

    assert_eq!(summary.discovered_count, 5);
    assert_eq!(summary.fetched_count, 3);
    assert_eq!(summary.upserted_count, 3);
    assert_eq!(summary.claim_count, 3);
    assert_eq!(summary.error_count, 2);
    assert_eq!(summary.errors.len(), 2);
    assert!(summary
        .errors
        .iter()
        .all(|e| e.stage == CandidateStage::Acquire));
    let mut failed: Vec<&str> = summary.errors.iter().map(|e| e.url.as_str()).collect();
    failed.sort_unstable();
    assert_eq!(failed, vec!["https://news.example/2", "https://news.example/4"]);
    assert!(!summary.cancelled);
    assert_eq!(summary.skipped_count, 0);

    assert_eq!(store.source_count(), 3);
    assert_eq!(store.claim_count(), 3);
    assert_eq!(store.mention_count(), 3);
    assert_eq!(store.event_count(), 1);
}

#[tokio::test]
async fn in_flight_candidates_never_exceed_max_concurrency() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let gauge = Arc::new(InFlight::default());
    let fetcher = FakeFetcher {
        delay: Some(Duration::from_millis(20)),
        in_flight: Some(gauge.clone()),
        ..FakeFetcher::default()
    };
    let refresher = refresher(store.clone(), FakeSearch::with_urls(5), fetcher, options());

    let summary = refresher
        .refresh(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.fetched_count, 5);
    assert_eq!(summary.error_count, 0);
    assert!(summary.errors.is_empty());
    let peak = gauge.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak in-flight fetches was {peak}");
    assert_eq!(gauge.current.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_query_backend_uses_fallback_query() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let refresher = refresher(
        store.clone(),
        FakeSearch::with_urls(1),
        FakeFetcher::default(),
        options(),
    );

    let summary = refresher
        .refresh(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.queries.len(), 1);
    let query = &summary.queries[0].query;
    assert!(query.primary.contains("NVIDIA"));
    assert!(query.primary.contains("Q3-2025"));
    assert!(query.reasoning.contains("quota exhausted"));
    assert_eq!(summary.queries[0].source_type, SourceType::News);
}

#[tokio::test]
async fn sources_carry_serp_metadata_and_title_fallback() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let refresher = refresher(
        store.clone(),
        FakeSearch::with_urls(2),
        FakeFetcher::default(),
        options(),
    );

    refresher
        .refresh(&request, &CancellationToken::new())
        .await
        .unwrap();

    let untitled = store
        .get_source_by_url("https://news.example/1")
        .await
        .unwrap()
        .expect("source should exist");
    assert_eq!(untitled.title, "https://news.example/1");
    assert_eq!(untitled.source_type, "news");
    assert_eq!(untitled.metadata["serp_rank"], json!(1));
    assert_eq!(untitled.metadata["serp_title"], Value::Null);
    assert_eq!(untitled.metadata["serp_description"], json!("Snippet 1"));
    assert!(untitled
        .query
        .as_deref()
        .is_some_and(|q| q.contains("NVIDIA")));

    let titled = store
        .get_source_by_url("https://news.example/2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(titled.title, "Story 2");
}

#[tokio::test]
async fn error_list_is_capped_but_count_is_not() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let fetcher = FakeFetcher {
        failing: (1..=5).map(|i| format!("https://news.example/{i}")).collect(),
        ..FakeFetcher::default()
    };
    let refresher = refresher(store.clone(), FakeSearch::with_urls(5), fetcher, options());

    let summary = refresher
        .refresh(&request, &CancellationToken::new())
        .await
        .expect("all-failed batch still returns a summary");

    assert_eq!(summary.errors.len(), 3);
    assert_eq!(summary.error_count, 5);
    assert_eq!(summary.fetched_count, 0);
    assert_eq!(summary.upserted_count, 0);
}

#[tokio::test]
async fn discovery_failure_is_recorded_by_query() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let search = FakeSearch::failing();
    let refresher = refresher(store.clone(), search.clone(), FakeFetcher::default(), options());

    let summary = refresher
        .refresh(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    assert_eq!(summary.discovered_count, 0);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].stage, CandidateStage::Discovery);
    assert_eq!(summary.errors[0].url, summary.queries[0].query.primary);
}

#[tokio::test]
async fn extraction_failure_keeps_source_but_not_upserted() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let refresher = Refresher::new(
        store.clone(),
        FakeSearch::with_urls(2),
        Arc::new(FakeFetcher::default()),
        QuerySynthesizer::new(None),
        ClaimExtractor::new(None, 10_000),
        options(),
    );

    let summary = refresher
        .refresh(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.fetched_count, 2);
    assert_eq!(summary.upserted_count, 0);
    assert!(summary
        .errors
        .iter()
        .all(|e| e.stage == CandidateStage::Extract));
    assert_eq!(store.source_count(), 2);
    assert_eq!(store.claim_count(), 0);
}

#[tokio::test]
async fn acquisition_timeout_is_a_candidate_failure() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let fetcher = FakeFetcher {
        delay: Some(Duration::from_millis(500)),
        ..FakeFetcher::default()
    };
    let refresher = refresher(
        store.clone(),
        FakeSearch::with_urls(1),
        fetcher,
        RefreshOptions {
            acquire_timeout: Duration::from_millis(20),
            ..options()
        },
    );

    let summary = refresher
        .refresh(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.errors[0].stage, CandidateStage::Acquire);
    assert!(summary.errors[0].reason.starts_with("timed out"));
    assert_eq!(store.source_count(), 0);
}

#[tokio::test]
async fn cancellation_stops_new_candidates_but_finishes_in_flight() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let token = CancellationToken::new();
    let fetcher = FakeFetcher {
        cancel_on_fetch: Some(token.clone()),
        ..FakeFetcher::default()
    };
    let refresher = refresher(
        store.clone(),
        FakeSearch::with_urls(5),
        fetcher,
        RefreshOptions {
            max_concurrency: 1,
            ..options()
        },
    );

    let summary = refresher.refresh(&request, &token).await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.discovered_count, 5);
    assert_eq!(summary.upserted_count, 1);
    assert_eq!(summary.skipped_count, 4);
    assert_eq!(summary.error_count, 0);
    assert_eq!(store.source_count(), 1);
}

#[tokio::test]
async fn elapsed_deadline_launches_nothing() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let search = FakeSearch::with_urls(3);
    let refresher = refresher(
        store.clone(),
        search.clone(),
        FakeFetcher::default(),
        RefreshOptions {
            deadline: Some(Duration::ZERO),
            ..options()
        },
    );

    let summary = refresher
        .refresh(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary.upserted_count, 0);
    assert_eq!(store.source_count(), 0);
}

#[tokio::test]
async fn unavailable_store_aborts_refresh() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let fetcher = FakeFetcher {
        break_store_on_fetch: Some(store.clone()),
        ..FakeFetcher::default()
    };
    let refresher = refresher(store.clone(), FakeSearch::with_urls(3), fetcher, options());

    let err = refresher
        .refresh(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RefreshError::StoreUnavailable(_)));
}

#[tokio::test]
async fn repeated_refresh_is_idempotent() {
    let store = Arc::new(MemoryGraphStore::new());
    let request = nvidia_request(&store).await;
    let refresher = refresher(
        store.clone(),
        FakeSearch::with_urls(3),
        FakeFetcher::default(),
        options(),
    );

    for _ in 0..2 {
        refresher
            .refresh(&request, &CancellationToken::new())
            .await
            .unwrap();
    }

    assert_eq!(store.source_count(), 3);
    assert_eq!(store.claim_count(), 3);
    assert_eq!(store.mention_count(), 3);
    assert_eq!(store.event_count(), 1);
}

// ---------------------------------------------------------------------------
// Freshness and comparison
// ---------------------------------------------------------------------------

const SEED: &str = r#"
companies:
  - name: NVIDIA
    ticker: NVDA
    industry: semiconductors
    events:
      - period: Q3-2025
        date: 2025-08-21
        sources:
          - url: https://news.example/nvda-q3
            title: NVIDIA Q3 results
            text: Revenue rose 94% year over year.
            claims:
              - text: Revenue rose 94% year over year.
                claim_type: revenue
                confidence: 0.92
        signals:
          - signal_type: sentiment
            score: "0.78"
            volume: 2500
      - period: Q2-2025
        date: 2025-05-28
        sources:
          - url: https://news.example/nvda-q2
            title: NVIDIA Q2 results
            text: Guidance was raised.
            claims:
              - text: Guidance was raised.
                claim_type: guidance
                confidence: 0.8
        signals:
          - signal_type: sentiment
            score: "0.68"
"#;

async fn seeded_store() -> Arc<MemoryGraphStore> {
    let store = Arc::new(MemoryGraphStore::new());
    let file = parse_companies(SEED).expect("seed should parse");
    seed_companies(store.as_ref(), &file.companies, Utc::now())
        .await
        .expect("seed should succeed");
    store
}

fn compare_request() -> CompareRequest {
    CompareRequest {
        period_a: Some(Period::new(3, 2025).unwrap()),
        period_b: Some(Period::new(2, 2025).unwrap()),
        ..CompareRequest::new("nvidia")
    }
}

#[tokio::test]
async fn compare_reports_claims_and_exact_delta() {
    let store = seeded_store().await;
    let evaluator = FreshnessEvaluator::new(FreshnessThresholds::default());

    let report = compare_periods(
        store.as_ref(),
        &evaluator,
        None,
        &compare_request(),
        Utc::now(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.company.name, "NVIDIA");
    assert!(!report.freshness.was_stale);
    assert!(report.refresh.is_none());
    assert_eq!(report.claims_a.len(), 1);
    assert_eq!(report.claims_b.len(), 1);
    assert_eq!(report.claims_a[0].source_url, "https://news.example/nvda-q3");
    assert_eq!(report.delta.window, "post_earnings_7d");
    assert_eq!(report.delta.delta, Some(Decimal::new(10, 2)));
    assert!(report.delta.note.is_none());
}

#[tokio::test]
async fn compare_auto_refreshes_stale_period_a() {
    let store = seeded_store().await;
    let evaluator = FreshnessEvaluator::new(FreshnessThresholds::default());
    let refresher = refresher(
        store.clone(),
        FakeSearch::with_urls(2),
        FakeFetcher::default(),
        options(),
    );
    let later = Utc::now() + chrono::TimeDelta::days(10);

    let report = compare_periods(
        store.as_ref(),
        &evaluator,
        Some(&refresher),
        &CompareRequest {
            auto_refresh: true,
            ..compare_request()
        },
        later,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(report.freshness.was_stale);
    assert_eq!(report.freshness.stale_types, vec![SourceType::News]);
    let refresh = report.refresh.expect("stale data should trigger a refresh");
    assert_eq!(refresh.period, Period::new(3, 2025).unwrap());
    assert_eq!(refresh.upserted_count, 2);
    assert_eq!(report.claims_a.len(), 3);
}

#[tokio::test]
async fn compare_unknown_company_is_an_error() {
    let store = seeded_store().await;
    let evaluator = FreshnessEvaluator::new(FreshnessThresholds::default());

    let err = compare_periods(
        store.as_ref(),
        &evaluator,
        None,
        &CompareRequest::new("Initech"),
        Utc::now(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RefreshError::CompanyNotFound(ref name) if name == "Initech"));
}
