use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange symbol as returned by the pair source (e.g. `BTCUSDT`)
pub type TradingPair = String;

/// Signed candle volumes in chronological order; the sign carries the candle direction
pub type VolumeSeries = Vec<f64>;

/// Price direction of the candle that produced a volume sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Negative samples are down-candles, everything else (zero included) is up
    pub fn of(sample: f64) -> Self {
        if sample < 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

/// A pair whose last closed candle exceeded its baseline by the alert multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub pair: TradingPair,
    pub baseline_volume: f64,
    pub current_volume: f64,
    pub percentage_increase: f64,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of analyzing one pair's series, before it is folded into the run stats
#[derive(Debug, Clone, PartialEq)]
pub struct PairAnalysis {
    pub pair: TradingPair,
    pub baseline_volume: f64,
    pub current_volume: f64,
    pub percentage_increase: f64,
    pub direction: Direction,
    pub alert: Option<AnomalyRecord>,
}

/// Run-wide counters and running maxima for a single scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub pairs_analyzed: usize,
    pub pairs_with_alert: usize,
    pub pairs_failed: usize,
    pub highest_increase_pct: f64,
    pub highest_increase_pair: Option<TradingPair>,
    pub peak_volume: f64,
    pub peak_volume_pair: Option<TradingPair>,
    pub api_calls_made: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl RunStats {
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            pairs_analyzed: 0,
            pairs_with_alert: 0,
            pairs_failed: 0,
            highest_increase_pct: 0.0,
            highest_increase_pair: None,
            peak_volume: 0.0,
            peak_volume_pair: None,
            api_calls_made: 0,
            start_time,
            end_time: None,
        }
    }

    /// Fold one analyzed pair into the counters and maxima.
    /// Maxima only move on a strict increase, so the first pair wins ties.
    pub fn record(&mut self, analysis: &PairAnalysis) {
        self.pairs_analyzed += 1;

        if analysis.percentage_increase > self.highest_increase_pct {
            self.highest_increase_pct = analysis.percentage_increase;
            self.highest_increase_pair = Some(analysis.pair.clone());
        }

        if analysis.current_volume > self.peak_volume {
            self.peak_volume = analysis.current_volume;
            self.peak_volume_pair = Some(analysis.pair.clone());
        }

        if analysis.alert.is_some() {
            self.pairs_with_alert += 1;
        }
    }

    pub fn record_failure(&mut self) {
        self.pairs_failed += 1;
    }

    pub fn record_api_call(&mut self) {
        self.api_calls_made += 1;
    }

    pub fn finish(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
    }

    /// Wall-clock duration of the run, zero until it is finished
    pub fn elapsed(&self) -> chrono::Duration {
        self.end_time
            .map(|end| end - self.start_time)
            .unwrap_or_else(chrono::Duration::zero)
    }
}

/// Structured payload returned by every scheduled run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunResult {
    Success {
        timestamp: DateTime<Utc>,
        alerts: Vec<AnomalyRecord>,
        stats: RunStats,
    },
    Error {
        timestamp: DateTime<Utc>,
        error: String,
    },
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn analysis(pair: &str, current: f64, increase: f64, alert: bool) -> PairAnalysis {
        let record = alert.then(|| AnomalyRecord {
            pair: pair.to_string(),
            baseline_volume: 100.0,
            current_volume: current,
            percentage_increase: increase,
            direction: Direction::Up,
            timestamp: Utc::now(),
        });
        PairAnalysis {
            pair: pair.to_string(),
            baseline_volume: 100.0,
            current_volume: current,
            percentage_increase: increase,
            direction: Direction::Up,
            alert: record,
        }
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::of(-0.5), Direction::Down);
        assert_eq!(Direction::of(0.0), Direction::Up);
        assert_eq!(Direction::of(12.0), Direction::Up);
        assert_eq!(serde_json::to_string(&Direction::Down).unwrap(), "\"DOWN\"");
    }

    #[test]
    fn test_record_tracks_maxima_independently() {
        let mut stats = RunStats::new(Utc::now());
        stats.record(&analysis("AAAUSDT", 900.0, 20.0, false));
        stats.record(&analysis("BBBUSDT", 300.0, 200.0, true));

        assert_eq!(stats.pairs_analyzed, 2);
        assert_eq!(stats.pairs_with_alert, 1);
        assert_eq!(stats.highest_increase_pair.as_deref(), Some("BBBUSDT"));
        assert_eq!(stats.peak_volume_pair.as_deref(), Some("AAAUSDT"));
        assert_eq!(stats.peak_volume, 900.0);
    }

    #[test]
    fn test_zero_increase_never_names_a_pair() {
        let mut stats = RunStats::new(Utc::now());
        stats.record(&analysis("FLATUSDT", 0.0, 0.0, false));

        assert_eq!(stats.pairs_analyzed, 1);
        assert!(stats.highest_increase_pair.is_none());
        assert!(stats.peak_volume_pair.is_none());
    }

    #[test]
    fn test_finish_sets_elapsed() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut stats = RunStats::new(start);
        assert_eq!(stats.elapsed(), chrono::Duration::zero());

        stats.record_failure();
        stats.record_api_call();
        stats.finish(start + chrono::Duration::seconds(30));
        assert_eq!(stats.pairs_failed, 1);
        assert_eq!(stats.api_calls_made, 1);
        assert_eq!(stats.elapsed(), chrono::Duration::seconds(30));
    }

    #[test]
    fn test_run_result_status_tag() {
        let result = RunResult::Error {
            timestamp: Utc::now(),
            error: "pair source unavailable".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "pair source unavailable");
        assert!(!result.is_success());
    }
}
