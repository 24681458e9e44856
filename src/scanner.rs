use crate::error::FetchError;
use crate::ranking::rank;
use crate::spike_detection::SpikeDetector;
use crate::types::{AnomalyRecord, RunStats, TradingPair};
use chrono::Utc;
use futures::StreamExt;
use tokio::sync::watch;

/// Result of one pair within a scan
#[derive(Debug)]
pub enum PairOutcome {
    Analyzed(Option<AnomalyRecord>),
    Failed(FetchError),
}

/// Everything a finished scan produced
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Every alert in detection order, before ranking
    pub all_alerts: Vec<AnomalyRecord>,
    pub ranked: Vec<AnomalyRecord>,
    pub stats: RunStats,
}

/// Drives the detector over a pair list and ranks what it finds
pub struct Scanner {
    detector: SpikeDetector,
    max_alerts: usize,
    concurrency: usize,
}

impl Scanner {
    pub fn new(detector: SpikeDetector, max_alerts: usize) -> Self {
        Self {
            detector,
            max_alerts,
            concurrency: 1,
        }
    }

    /// Number of fetches kept in flight. All of them still go through the
    /// detector's rate limiter, and results are folded in pair order.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Scan `pairs`, stopping early (between pairs) once `cancel` reads `true`
    pub async fn scan(&self, pairs: &[TradingPair], cancel: &watch::Receiver<bool>) -> ScanReport {
        let mut stats = RunStats::new(Utc::now());
        let mut all_alerts = Vec::new();

        tracing::info!(
            "Scanning {} pairs (threshold {}x, concurrency {})",
            pairs.len(),
            self.detector.threshold(),
            self.concurrency
        );

        let fetches = futures::stream::iter(pairs)
            .take_while(|_| futures::future::ready(!*cancel.borrow()))
            .map(|pair| async move { (pair, self.detector.fetch(pair).await) })
            .buffered(self.concurrency);
        let mut fetches = std::pin::pin!(fetches);

        while let Some((pair, fetched)) = fetches.next().await {
            let outcome = match self.detector.settle(pair, fetched, &mut stats) {
                Ok(alert) => PairOutcome::Analyzed(alert),
                Err(e) => PairOutcome::Failed(e),
            };

            match outcome {
                PairOutcome::Analyzed(Some(alert)) => all_alerts.push(alert),
                PairOutcome::Analyzed(None) => {}
                PairOutcome::Failed(e) => {
                    tracing::warn!("Error processing {}: {}", pair, e);
                    stats.record_failure();
                }
            }
        }

        if *cancel.borrow() {
            tracing::warn!(
                "Scan cancelled after {} of {} pairs",
                stats.pairs_analyzed + stats.pairs_failed,
                pairs.len()
            );
        }

        let ranked = rank(&all_alerts, self.max_alerts);
        if all_alerts.len() > self.max_alerts {
            tracing::info!(
                "Found {} pairs with high volume, selecting top {} for alerts",
                all_alerts.len(),
                self.max_alerts
            );
            for alert in &ranked {
                tracing::info!("• {}: +{:.1}%", alert.pair, alert.percentage_increase);
            }
        }

        stats.finish(Utc::now());
        ScanReport {
            all_alerts,
            ranked,
            stats,
        }
    }
}
