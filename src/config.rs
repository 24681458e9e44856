use crate::notifier::NTFY_API_BASE;
use crate::pairs::{BINANCE_FUTURES_API_BASE, MIN_PRICE, MIN_VOLUME_USD};
use crate::ranking::MAX_ALERTS;
use crate::spike_detection::VOLUME_THRESHOLD;
use crate::volume::TAAPI_API_BASE;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Volume provider
    pub taapi_api_key: String,
    pub taapi_base_url: String,
    pub taapi_exchange: String,

    // Pair discovery
    pub binance_futures_url: String,
    pub quote_asset: String,
    pub min_volume_usd: f64,
    pub min_price: f64,

    // Detection
    pub volume_threshold: f64,
    pub max_alerts: usize,

    // Quota and timing
    pub rate_limit_delay: Duration,
    pub request_timeout: Duration,
    pub scan_concurrency: usize,
    pub scan_interval: Duration,

    // Notifications - console only when no topic is set
    pub ntfy_topic: Option<String>,
    pub ntfy_base_url: String,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            taapi_api_key: env::var("TAAPI_API_KEY").context("TAAPI_API_KEY not found")?,
            taapi_base_url: env::var("TAAPI_BASE_URL")
                .unwrap_or_else(|_| TAAPI_API_BASE.to_string()),
            taapi_exchange: env::var("TAAPI_EXCHANGE")
                .unwrap_or_else(|_| "binancefutures".to_string()),

            binance_futures_url: env::var("BINANCE_FUTURES_URL")
                .unwrap_or_else(|_| BINANCE_FUTURES_API_BASE.to_string()),
            quote_asset: env::var("QUOTE_ASSET").unwrap_or_else(|_| "USDT".to_string()),
            min_volume_usd: parse_or("MIN_VOLUME_USD", MIN_VOLUME_USD),
            min_price: parse_or("MIN_PRICE", MIN_PRICE),

            volume_threshold: parse_or("VOLUME_THRESHOLD", VOLUME_THRESHOLD),
            max_alerts: parse_or("MAX_ALERTS", MAX_ALERTS),

            // 3s between requests keeps us under 400/minute
            rate_limit_delay: Duration::try_from_secs_f64(parse_or("RATE_LIMIT_DELAY_SECS", 3.0))
                .context("RATE_LIMIT_DELAY_SECS must be a non-negative number of seconds")?,
            request_timeout: Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 10)),
            scan_concurrency: parse_or("SCAN_CONCURRENCY", 1),
            scan_interval: Duration::from_secs(
                parse_or("SCAN_INTERVAL_MINS", 15u64).saturating_mul(60),
            ),

            ntfy_topic: env::var("NTFY_TOPIC").ok().filter(|t| !t.trim().is_empty()),
            ntfy_base_url: env::var("NTFY_BASE_URL").unwrap_or_else(|_| NTFY_API_BASE.to_string()),
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.taapi_api_key.trim().is_empty() {
            anyhow::bail!("TAAPI_API_KEY must not be empty");
        }

        if self.quote_asset.is_empty() {
            anyhow::bail!("QUOTE_ASSET must not be empty");
        }

        if self.volume_threshold.is_nan() || self.volume_threshold <= 0.0 {
            anyhow::bail!("VOLUME_THRESHOLD must be greater than 0");
        }

        if self.max_alerts == 0 {
            anyhow::bail!("MAX_ALERTS must be at least 1");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        if self.scan_concurrency == 0 {
            anyhow::bail!("SCAN_CONCURRENCY must be at least 1");
        }

        if self.scan_interval.is_zero() {
            anyhow::bail!("SCAN_INTERVAL_MINS must be greater than 0");
        }

        if self.scan_concurrency > 1 && self.rate_limit_delay.is_zero() {
            tracing::warn!(
                "SCAN_CONCURRENCY > 1 with no rate limit delay may exhaust the provider quota"
            );
        }

        Ok(())
    }
}
