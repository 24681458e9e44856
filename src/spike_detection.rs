use crate::error::FetchError;
use crate::rate_limit::RateLimiter;
use crate::types::{AnomalyRecord, Direction, PairAnalysis, RunStats, VolumeSeries};
use crate::volume::VolumeHistoryProvider;
use chrono::Utc;
use std::sync::Arc;

/// Alert when the last closed candle exceeds the baseline by this multiple
pub const VOLUME_THRESHOLD: f64 = 1.5;
/// Candle granularity requested from the provider
pub const CANDLE_INTERVAL: &str = "5m";
/// 49 historical candles + last closed + in-progress
pub const SERIES_LENGTH: usize = 51;

/// Median of `values`; `None` when empty
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Compare the last closed candle of `series` against the median of the history before it.
///
/// The final element is the in-progress candle and is ignored. An empty or
/// all-zero history yields a zero baseline, a zero increase and no alert.
pub fn analyze(pair: &str, series: &[f64], threshold: f64) -> Result<PairAnalysis, FetchError> {
    if series.len() < 2 {
        return Err(FetchError::Malformed(format!(
            "expected at least 2 samples, got {}",
            series.len()
        )));
    }

    let closed = series[series.len() - 2];
    let current_volume = closed.abs();
    let direction = Direction::of(closed);

    let historical: Vec<f64> = series[..series.len() - 2].iter().map(|v| v.abs()).collect();
    let baseline_volume = median(&historical).unwrap_or(0.0);

    let percentage_increase = if baseline_volume > 0.0 {
        ((current_volume / baseline_volume - 1.0) * 100.0).abs()
    } else {
        0.0
    };

    // A degenerate (zero) baseline never alerts
    let fires = baseline_volume > 0.0 && current_volume > baseline_volume * threshold;
    let alert = fires.then(|| AnomalyRecord {
        pair: pair.to_string(),
        baseline_volume,
        current_volume,
        percentage_increase,
        direction,
        timestamp: Utc::now(),
    });

    Ok(PairAnalysis {
        pair: pair.to_string(),
        baseline_volume,
        current_volume,
        percentage_increase,
        direction,
        alert,
    })
}

/// Median-baseline volume spike detector
pub struct SpikeDetector {
    provider: Arc<dyn VolumeHistoryProvider>,
    limiter: Arc<RateLimiter>,
    threshold: f64,
}

impl SpikeDetector {
    pub fn new(
        provider: Arc<dyn VolumeHistoryProvider>,
        limiter: Arc<RateLimiter>,
        threshold: f64,
    ) -> Self {
        Self {
            provider,
            limiter,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Fetch the series for `pair` through the shared rate limiter
    pub async fn fetch(&self, pair: &str) -> Result<VolumeSeries, FetchError> {
        self.limiter.acquire().await;
        tracing::debug!("Fetching volumes for {}", pair);
        self.provider.fetch_volumes(pair).await
    }

    /// Analyze a fetched series and fold the result into `stats`
    pub fn assess(
        &self,
        pair: &str,
        series: &[f64],
        stats: &mut RunStats,
    ) -> Result<Option<AnomalyRecord>, FetchError> {
        let analysis = analyze(pair, series, self.threshold)?;

        tracing::info!(
            "{}: current {:.0} ({}) | median {:.0} | threshold {:.0} | increase {:.1}%{}",
            pair,
            analysis.current_volume,
            analysis.direction,
            analysis.baseline_volume,
            analysis.baseline_volume * self.threshold,
            analysis.percentage_increase,
            if analysis.alert.is_some() { " ALERT" } else { "" }
        );

        stats.record(&analysis);
        Ok(analysis.alert)
    }

    /// Fetch, analyze and record one pair. Errors are per-pair and leave
    /// `pairs_analyzed` untouched; quota-consuming calls are still counted.
    pub async fn evaluate(
        &self,
        pair: &str,
        stats: &mut RunStats,
    ) -> Result<Option<AnomalyRecord>, FetchError> {
        let fetched = self.fetch(pair).await;
        self.settle(pair, fetched, stats)
    }

    /// Fold an already fetched result into `stats`: count it against the
    /// quota, then analyze it. Pipelined scans call this in pair order.
    pub fn settle(
        &self,
        pair: &str,
        fetched: Result<VolumeSeries, FetchError>,
        stats: &mut RunStats,
    ) -> Result<Option<AnomalyRecord>, FetchError> {
        count_api_call(&fetched, stats);
        self.assess(pair, &fetched?, stats)
    }
}

/// Count a provider call against the quota when it actually reached the provider
fn count_api_call(fetched: &Result<VolumeSeries, FetchError>, stats: &mut RunStats) {
    match fetched {
        Ok(_) => stats.record_api_call(),
        Err(e) if e.consumed_quota() => stats.record_api_call(),
        Err(_) => {}
    }
}
