use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use volume_spike_scanner::spike_detection::{CANDLE_INTERVAL, SERIES_LENGTH};
use volume_spike_scanner::{
    run_guarded, BinanceFuturesPairSource, Config, ConsoleReporter, NtfyReporter, PairFilter,
    PairSource, RateLimiter, Reporter, RunResult, Scanner, SpikeDetector, StaticPairSource,
    TaapiVolumeProvider, VolumeQuery,
};

#[derive(Parser)]
#[command(name = "volume-spike-scanner")]
#[command(about = "Scans futures pairs for abnormal volume spikes", long_about = None)]
struct Cli {
    /// Run a single scan, print the result as JSON and exit
    #[arg(long)]
    once: bool,

    /// Scan these symbols instead of discovering pairs (e.g. BTCUSDT,ETHUSDT)
    #[arg(long, value_delimiter = ',')]
    pairs: Vec<String>,

    /// Minutes between scheduled scans
    #[arg(long)]
    interval_mins: Option<u64>,

    /// Provider fetches kept in flight
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };
    if let Some(mins) = cli.interval_mins {
        config.scan_interval = Duration::from_secs(mins.saturating_mul(60));
    }
    if let Some(concurrency) = cli.concurrency {
        config.scan_concurrency = concurrency;
    }

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    let source: Box<dyn PairSource> = if cli.pairs.is_empty() {
        let filter = PairFilter {
            min_volume_usd: config.min_volume_usd,
            min_price: config.min_price,
            quote_asset: Some(config.quote_asset.clone()),
        };
        Box::new(BinanceFuturesPairSource::new(
            config.binance_futures_url.clone(),
            filter,
            config.request_timeout,
        )?)
    } else {
        tracing::info!("Using {} pairs from the command line", cli.pairs.len());
        Box::new(StaticPairSource::new(cli.pairs.clone()))
    };

    let provider = TaapiVolumeProvider::new(
        config.taapi_base_url.clone(),
        config.taapi_api_key.clone(),
        VolumeQuery {
            exchange: config.taapi_exchange.clone(),
            quote_asset: config.quote_asset.clone(),
            interval: CANDLE_INTERVAL.to_string(),
            results: SERIES_LENGTH,
        },
        config.request_timeout,
    )?;
    let limiter = Arc::new(RateLimiter::per_call(config.rate_limit_delay));
    let detector = SpikeDetector::new(Arc::new(provider), limiter, config.volume_threshold);
    let scanner =
        Scanner::new(detector, config.max_alerts).with_concurrency(config.scan_concurrency);
    tracing::info!("✓ Spike detector initialized");

    let reporter: Box<dyn Reporter> = match &config.ntfy_topic {
        Some(topic) => {
            tracing::info!("✓ ntfy notifications enabled for topic {}", topic);
            Box::new(NtfyReporter::new(&config.ntfy_base_url, topic, config.request_timeout)?)
        }
        None => {
            tracing::warn!("NTFY_TOPIC not set, reporting to the console only");
            Box::new(ConsoleReporter)
        }
    };

    let (cancel_tx, cancel) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Shutdown requested, finishing the current pair");
            let _ = cancel_tx.send(true);
        }
    });

    if cli.once {
        let result = run_guarded(source.as_ref(), &scanner, reporter.as_ref(), &cancel).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        if !result.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    tracing::info!(
        "Scanning every {} minutes",
        config.scan_interval.as_secs() / 60
    );
    let mut ticker = tokio::time::interval(config.scan_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut shutdown = cancel.clone();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            Ok(()) = shutdown.changed() => break,
        }
        if *cancel.borrow() {
            break;
        }

        match run_guarded(source.as_ref(), &scanner, reporter.as_ref(), &cancel).await {
            RunResult::Success { alerts, .. } => {
                tracing::info!("Run finished with {} alerts", alerts.len());
            }
            RunResult::Error { error, .. } => {
                tracing::error!("Run failed: {}", error);
            }
        }
    }

    tracing::info!("Scanner stopped");
    Ok(())
}
