mod db;
mod info;
mod pipeline;
mod services;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use pulsegraph_core::{EventType, Period, SignalType, SourceType};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pulsegraph")]
#[command(about = "PulseGraph freshness-driven knowledge refresh")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Load companies, events, sources, claims and signals from the seed file
    Seed {
        /// Seed file path (defaults to `PULSEGRAPH_COMPANIES_PATH`)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the current and comparison periods for a date
    Periods {
        /// Reference date as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List the event, signal and source type registries
    Registry,
    /// Report which source types are stale for a company
    Freshness {
        #[arg(long)]
        company: String,
        /// First period (defaults to the current quarter)
        #[arg(long)]
        period_a: Option<Period>,
        /// Second period (defaults to the previous quarter)
        #[arg(long)]
        period_b: Option<Period>,
    },
    /// Discover, fetch and extract fresh knowledge for a company
    Refresh {
        #[arg(long)]
        company: String,
        /// Target period (defaults to the current quarter)
        #[arg(long)]
        period: Option<Period>,
        /// Source types to refresh; repeat the flag for several
        #[arg(long = "source-type")]
        source_types: Vec<SourceType>,
        #[arg(long, default_value = "earnings")]
        event_type: EventType,
        /// Stop launching new candidates after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
        /// Refresh even when stored knowledge is fresh
        #[arg(long)]
        force: bool,
    },
    /// Compare one signal between two periods
    Delta {
        #[arg(long)]
        company: String,
        #[arg(long)]
        period_a: Option<Period>,
        #[arg(long)]
        period_b: Option<Period>,
        /// Signal window (defaults to the earnings window)
        #[arg(long)]
        window: Option<String>,
        #[arg(long, default_value = "sentiment")]
        signal_type: SignalType,
    },
    /// Compare two periods: freshness, claims and the signal delta
    Compare {
        #[arg(long)]
        company: String,
        #[arg(long)]
        period_a: Option<Period>,
        #[arg(long)]
        period_b: Option<Period>,
        #[arg(long, default_value = "earnings")]
        event_type: EventType,
        #[arg(long, default_value = "sentiment")]
        signal_type: SignalType,
        #[arg(long)]
        window: Option<String>,
        /// Refresh stale source types for the first period before comparing
        #[arg(long)]
        auto_refresh: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Offline commands need neither configuration nor a database.
    match &cli.command {
        Commands::Periods { date } => {
            info::run_periods(*date);
            return Ok(());
        }
        Commands::Registry => {
            info::run_registry();
            return Ok(());
        }
        _ => {}
    }

    let config = pulsegraph_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pulsegraph_db::PoolConfig::from_app_config(&config);
    let pool = pulsegraph_db::connect_pool(&config.database_url, pool_config).await?;
    pulsegraph_db::health_check(&pool).await?;
    tracing::debug!(env = %config.env, "database reachable");

    let result = dispatch(cli.command, &pool, &config).await;
    pool.close().await;
    result
}

async fn dispatch(
    command: Commands,
    pool: &sqlx::PgPool,
    config: &pulsegraph_core::AppConfig,
) -> anyhow::Result<()> {
    match command {
        Commands::Migrate => db::run_migrate(pool).await,
        Commands::Seed { path } => db::run_seed(pool, config, path.as_deref()).await,
        Commands::Periods { .. } | Commands::Registry => Ok(()),
        Commands::Freshness {
            company,
            period_a,
            period_b,
        } => pipeline::run_freshness(pool, config, &company, period_a, period_b).await,
        Commands::Refresh {
            company,
            period,
            source_types,
            event_type,
            deadline_secs,
            force,
        } => {
            let cancel = CancellationToken::new();
            let watcher = spawn_ctrl_c_watcher(cancel.clone());
            let result = pipeline::run_refresh(
                pool,
                config,
                &pipeline::RefreshArgs {
                    company: &company,
                    period,
                    source_types,
                    event_type,
                    deadline_secs,
                    force,
                },
                &cancel,
            )
            .await;
            watcher.abort();
            result
        }
        Commands::Delta {
            company,
            period_a,
            period_b,
            window,
            signal_type,
        } => {
            pipeline::run_delta(
                pool,
                &company,
                period_a,
                period_b,
                window.as_deref(),
                signal_type,
            )
            .await
        }
        Commands::Compare {
            company,
            period_a,
            period_b,
            event_type,
            signal_type,
            window,
            auto_refresh,
            json,
        } => {
            let request = pulsegraph_refresh::CompareRequest {
                company,
                period_a,
                period_b,
                event_type,
                signal_type,
                window,
                auto_refresh,
            };
            let cancel = CancellationToken::new();
            let watcher = spawn_ctrl_c_watcher(cancel.clone());
            let result = pipeline::run_compare(pool, config, &request, json, &cancel).await;
            watcher.abort();
            result
        }
    }
}

/// Cancel `token` on the first Ctrl-C. In-flight candidates finish; nothing
/// new is launched.
fn spawn_ctrl_c_watcher(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("received ctrl-c, cancelling refresh");
            token.cancel();
        }
    })
}

#[cfg(test)]
mod tests;
