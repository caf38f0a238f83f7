//! Wires configuration into the store, adapters and refresh pipeline.

use std::sync::Arc;
use std::time::Duration;

use pulsegraph_core::{AppConfig, SearchBackend};
use pulsegraph_db::{GraphStore, PgGraphStore};
use pulsegraph_ingest::{
    BrightDataClient, ContentFetcher, DirectFetcher, GoogleNewsRss, HttpSettings, SearchService,
};
use pulsegraph_llm::{OpenAiGenerator, StructuredGenerator};
use pulsegraph_refresh::{
    ClaimExtractor, FreshnessEvaluator, QuerySynthesizer, RefreshOptions, Refresher,
};

pub(crate) struct Services {
    pub store: Arc<dyn GraphStore>,
    pub evaluator: FreshnessEvaluator,
    pub refresher: Refresher,
}

/// Build every service a pipeline command needs.
///
/// Without `OPENAI_API_KEY` queries fall back to templates and extraction
/// yields no claims. The Bright Data backend requires its key; without it
/// use `PULSEGRAPH_SEARCH_BACKEND=google_news_rss`.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be built or the selected search
/// backend is missing its credentials.
pub(crate) fn build_services(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    deadline_secs: Option<u64>,
) -> anyhow::Result<Services> {
    let store: Arc<dyn GraphStore> = Arc::new(PgGraphStore::new(pool.clone()));
    let http = HttpSettings::from_app_config(config);

    let generator: Option<Arc<dyn StructuredGenerator>> = match &config.openai_api_key {
        Some(key) => {
            let generator = OpenAiGenerator::with_base_url(
                key,
                &config.openai_model,
                config.extract_timeout_secs,
                &config.openai_base_url,
            )?;
            Some(Arc::new(generator) as Arc<dyn StructuredGenerator>)
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set; using fallback queries and skipping extraction");
            None
        }
    };

    let brightdata = config
        .brightdata_api_key
        .as_deref()
        .map(|key| {
            BrightDataClient::new(
                key,
                &config.brightdata_serp_zone,
                &config.brightdata_unlocker_zone,
                &http,
            )
            .map(Arc::new)
        })
        .transpose()?;

    let search: Arc<dyn SearchService> = match config.search_backend {
        SearchBackend::BrightData => match &brightdata {
            Some(client) => Arc::clone(client) as Arc<dyn SearchService>,
            None => anyhow::bail!(
                "PULSEGRAPH_SEARCH_BACKEND=brightdata requires BRIGHTDATA_API_KEY; \
                 set it or use PULSEGRAPH_SEARCH_BACKEND=google_news_rss"
            ),
        },
        SearchBackend::GoogleNewsRss => {
            Arc::new(GoogleNewsRss::new(&config.locale, &http)?) as Arc<dyn SearchService>
        }
    };

    let fetcher: Arc<dyn ContentFetcher> = match brightdata {
        Some(client) => client as Arc<dyn ContentFetcher>,
        None => Arc::new(DirectFetcher::new(&http)?) as Arc<dyn ContentFetcher>,
    };

    let mut options = RefreshOptions::from_app_config(config);
    if let Some(secs) = deadline_secs {
        options.deadline = Some(Duration::from_secs(secs));
    }

    tracing::debug!(
        search = search.name(),
        fetcher = fetcher.name(),
        max_concurrency = options.max_concurrency,
        "refresh services ready"
    );

    let refresher = Refresher::new(
        Arc::clone(&store),
        search,
        fetcher,
        QuerySynthesizer::new(generator.clone()),
        ClaimExtractor::new(generator, config.extract_max_chars),
        options,
    );

    Ok(Services {
        store,
        evaluator: FreshnessEvaluator::new(config.freshness),
        refresher,
    })
}
