use aiden_core::{
    AppConfig, CacheSettings, CoreError, ErrorReporter, LoggingConfig, Platform, TimeRange,
};
use analytics_engine::{aggregate_platforms, sentiment_distribution};
use anyhow::Context;
use clap::{Parser, Subcommand};
use community_client::{
    CacheClient, CommunityApiClient, FileStore, HttpTransport, KeyValueStore, MemoryStore,
    MockBackend, Transport,
};
use community_data::{CommunityDataHook, HookParams};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "aiden", version, about = "Community analytics for Telegram, Discord and Twitter")]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "AIDEN_CONFIG", default_value = "aiden.toml")]
    config: PathBuf,

    /// Serve data from the built-in mock backend instead of the API
    #[arg(long, global = true)]
    mock: bool,

    /// Only log errors, not recoverable warnings
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch and print the full community overview
    Overview {
        #[arg(long, default_value = "all")]
        platform: Platform,
        #[arg(long, default_value = "24h")]
        time_range: TimeRange,
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },
    /// Print the community health score
    Score {
        #[arg(long, default_value = "all")]
        platform: Platform,
        #[arg(long, default_value = "24h")]
        time_range: TimeRange,
    },
    /// Inspect or clear the response cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// Age of every cached entry in milliseconds
    Status,
    /// Entry count, byte size and timestamps
    Metrics,
    /// Remove cached entries, optionally only keys containing PATTERN
    Clear { pattern: Option<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let loaded = AppConfig::load(&cli.config);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = match &loaded {
            Ok(config) => config.logging.filter.clone(),
            Err(_) => LoggingConfig::default().filter,
        };
        EnvFilter::new(directives)
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let reporter = ErrorReporter::new().quiet(cli.quiet);
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            let e = CoreError::from(e);
            reporter.report_error(&e);
            return Err(e).context(format!("failed to load {}", cli.config.display()));
        }
    };

    info!("Starting aiden against {}", config.api.base_url);
    let api = build_client(&config, cli.mock, &reporter)?;

    let result = run(cli.command, api.clone()).await;
    log_request_metrics(&api).await;
    if let Err(e) = result {
        reporter.report_error(&e);
        return Err(e.into());
    }
    Ok(())
}

async fn log_request_metrics(api: &CommunityApiClient) {
    let requests = api.request_metrics().await;
    if requests.total_requests == 0 && requests.cache_hits == 0 {
        return;
    }
    info!(
        "{} requests ({} failed), {} cache hits ({:.0}% hit rate), average response {:?}",
        requests.total_requests,
        requests.failed_requests,
        requests.cache_hits,
        requests.hit_rate() * 100.0,
        requests.average_response_time
    );
    for (kind, count) in requests.errors_by_kind() {
        warn!("{} request(s) failed with {}", count, kind);
    }
}

fn open_store(settings: &CacheSettings, reporter: &ErrorReporter) -> Arc<dyn KeyValueStore> {
    let Some(path) = &settings.store_path else {
        return Arc::new(MemoryStore::new());
    };

    match FileStore::open(path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            reporter.report_warning(&CoreError::Storage(e));
            warn!("Falling back to an in-memory cache");
            Arc::new(MemoryStore::new())
        }
    }
}

fn build_client(
    config: &AppConfig,
    mock: bool,
    reporter: &ErrorReporter,
) -> Result<CommunityApiClient, CoreError> {
    let transport: Arc<dyn Transport> = if mock {
        info!("Using the mock backend");
        Arc::new(MockBackend::new().with_latency(Duration::from_millis(150)))
    } else {
        Arc::new(HttpTransport::new(
            &config.api.base_url,
            config.api.request_timeout(),
        )?)
    };

    let cache = CacheClient::from_settings(open_store(&config.cache, reporter), &config.cache);
    Ok(CommunityApiClient::new(transport, cache).with_request_timeout(config.api.request_timeout()))
}

async fn run(command: Command, api: CommunityApiClient) -> Result<(), CoreError> {
    match command {
        Command::Overview {
            platform,
            time_range,
            refresh,
        } => {
            let hook = CommunityDataHook::new(api.clone(), HookParams::new(time_range, platform));
            hook.refetch(refresh).await;

            let state = hook.snapshot();
            if let Some(e) = &state.error {
                return Err(e.clone().into());
            }

            let platforms = api
                .fetch_platform_metrics(time_range, Default::default())
                .await?;

            print_json(&json!({
                "platform": platform,
                "timeRange": time_range,
                "healthScore": state.health_score(),
                "metrics": &state.metrics,
                "sentimentDistribution": sentiment_distribution(&state.sentiment),
                "topics": &state.topics,
                "memberGrowth": &state.member_growth,
                "growthAnomalies": &state.growth_anomalies,
                "hourlyActivity": &state.hourly_activity,
                "platforms": aggregate_platforms(&platforms),
            }))?;
        }
        Command::Score {
            platform,
            time_range,
        } => {
            let hook = CommunityDataHook::new(api, HookParams::new(time_range, platform));
            hook.refetch(false).await;

            let state = hook.snapshot();
            if let Some(e) = &state.error {
                return Err(e.clone().into());
            }
            match state.health_score() {
                Some(score) => println!("{}", score),
                None => println!("n/a"),
            }
        }
        Command::Cache { action } => match action {
            CacheCommand::Status => print_json(&api.cache_status())?,
            CacheCommand::Metrics => print_json(&api.cache_metrics())?,
            CacheCommand::Clear { pattern } => {
                let removed = api.clear_community_cache(pattern.as_deref());
                println!("Removed {} cached entries", removed);
            }
        },
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CoreError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
