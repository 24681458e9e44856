pub mod config;
pub mod error;
pub mod notifier;
pub mod pairs;
pub mod ranking;
pub mod rate_limit;
pub mod runner;
pub mod scanner;
pub mod spike_detection;
pub mod types;
pub mod volume;

pub use config::Config;
pub use error::{FetchError, NotifyError, ScanError};
pub use notifier::{ConsoleReporter, NtfyReporter, Reporter};
pub use pairs::{BinanceFuturesPairSource, PairFilter, PairSource, StaticPairSource};
pub use ranking::rank;
pub use rate_limit::RateLimiter;
pub use runner::{run_guarded, run_once};
pub use scanner::{ScanReport, Scanner};
pub use spike_detection::SpikeDetector;
pub use types::{AnomalyRecord, Direction, RunResult, RunStats, TradingPair};
pub use volume::{TaapiVolumeProvider, VolumeHistoryProvider, VolumeQuery};
