use crate::error::ScanError;
use crate::notifier::Reporter;
use crate::pairs::PairSource;
use crate::scanner::Scanner;
use crate::types::RunResult;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::sync::watch;

/// One complete scheduled run: discover pairs, scan, report.
///
/// A pair-source failure aborts the run before anything is reported. Otherwise
/// the reporter is invoked exactly once, and its failure is only logged.
pub async fn run_once(
    source: &dyn PairSource,
    scanner: &Scanner,
    reporter: &dyn Reporter,
    cancel: &watch::Receiver<bool>,
) -> RunResult {
    let pairs = match source.fetch_pairs().await {
        Ok(pairs) => pairs,
        Err(e) => {
            tracing::error!("❌ Run aborted: {}", e);
            return RunResult::Error {
                timestamp: Utc::now(),
                error: e.to_string(),
            };
        }
    };

    if pairs.is_empty() {
        tracing::warn!("Pair source returned no pairs");
    }

    let report = scanner.scan(&pairs, cancel).await;

    if let Err(e) = reporter.report(&report.ranked, &report.stats).await {
        tracing::error!("Error sending notification: {}", e);
    }

    tracing::info!(
        "✓ Analysis complete: {} analyzed, {} with high volume, {} skipped, {} API calls",
        report.stats.pairs_analyzed,
        report.stats.pairs_with_alert,
        report.stats.pairs_failed,
        report.stats.api_calls_made
    );

    RunResult::Success {
        timestamp: Utc::now(),
        alerts: report.ranked,
        stats: report.stats,
    }
}

/// [`run_once`], with a panic anywhere in the run degraded to an error result
pub async fn run_guarded(
    source: &dyn PairSource,
    scanner: &Scanner,
    reporter: &dyn Reporter,
    cancel: &watch::Receiver<bool>,
) -> RunResult {
    match AssertUnwindSafe(run_once(source, scanner, reporter, cancel))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(payload) => {
            let error = ScanError::Internal(panic_message(payload.as_ref()));
            tracing::error!("❌ Run aborted: {}", error);
            RunResult::Error {
                timestamp: Utc::now(),
                error: error.to_string(),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
