use crate::error::ScanError;
use crate::types::TradingPair;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const BINANCE_FUTURES_API_BASE: &str = "https://fapi.binance.com";

/// $1M notional daily volume
pub const MIN_VOLUME_USD: f64 = 1_000_000.0;
/// Filters out inactive pairs
pub const MIN_PRICE: f64 = 0.00001;

/// Supplies the candidate pairs for a scan
#[async_trait]
pub trait PairSource: Send + Sync {
    async fn fetch_pairs(&self) -> Result<Vec<TradingPair>, ScanError>;
}

/// 24h ticker entry from the futures API. Numeric fields arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct Ticker24h {
    pub symbol: String,
    #[serde(default)]
    pub volume: String,
    #[serde(rename = "lastPrice", default)]
    pub last_price: String,
}

/// Liquidity criteria a ticker must meet to be scanned
#[derive(Debug, Clone)]
pub struct PairFilter {
    pub min_volume_usd: f64,
    pub min_price: f64,
    /// Only keep symbols quoted in this asset
    pub quote_asset: Option<String>,
}

impl Default for PairFilter {
    fn default() -> Self {
        Self {
            min_volume_usd: MIN_VOLUME_USD,
            min_price: MIN_PRICE,
            quote_asset: Some("USDT".to_string()),
        }
    }
}

impl PairFilter {
    pub fn accepts(&self, ticker: &Ticker24h) -> bool {
        let (Ok(volume), Ok(price)) = (
            ticker.volume.parse::<f64>(),
            ticker.last_price.parse::<f64>(),
        ) else {
            return false;
        };

        if let Some(quote) = &self.quote_asset {
            if !ticker.symbol.ends_with(quote.as_str()) || ticker.symbol.len() == quote.len() {
                return false;
            }
        }

        volume * price >= self.min_volume_usd && price >= self.min_price
    }

    pub fn apply(&self, tickers: Vec<Ticker24h>) -> Vec<TradingPair> {
        tickers
            .into_iter()
            .filter(|t| self.accepts(t))
            .map(|t| t.symbol)
            .collect()
    }
}

/// Binance USD-M futures pair discovery
pub struct BinanceFuturesPairSource {
    client: reqwest::Client,
    base_url: String,
    filter: PairFilter,
}

impl BinanceFuturesPairSource {
    pub fn new(
        base_url: impl Into<String>,
        filter: PairFilter,
        timeout: Duration,
    ) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::PairSource(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            filter,
        })
    }

    async fn fetch_tickers(&self) -> reqwest::Result<Vec<Ticker24h>> {
        let url = format!(
            "{}/fapi/v1/ticker/24hr",
            self.base_url.trim_end_matches('/')
        );
        self.client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl PairSource for BinanceFuturesPairSource {
    async fn fetch_pairs(&self) -> Result<Vec<TradingPair>, ScanError> {
        let tickers = self
            .fetch_tickers()
            .await
            .map_err(|e| ScanError::PairSource(format!("Error fetching Binance pairs: {}", e)))?;

        let total = tickers.len();
        let pairs = self.filter.apply(tickers);
        tracing::info!("Found {} valid pairs out of {} tickers", pairs.len(), total);
        Ok(pairs)
    }
}

/// Fixed pair list, for local runs against a handful of symbols
pub struct StaticPairSource {
    pairs: Vec<TradingPair>,
}

impl StaticPairSource {
    pub fn new(pairs: Vec<TradingPair>) -> Self {
        Self { pairs }
    }
}

#[async_trait]
impl PairSource for StaticPairSource {
    async fn fetch_pairs(&self) -> Result<Vec<TradingPair>, ScanError> {
        Ok(self.pairs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(symbol: &str, volume: &str, price: &str) -> Ticker24h {
        Ticker24h {
            symbol: symbol.to_string(),
            volume: volume.to_string(),
            last_price: price.to_string(),
        }
    }

    #[test]
    fn test_filter_by_notional_volume() {
        let filter = PairFilter::default();
        let pairs = filter.apply(vec![
            ticker("BTCUSDT", "20000", "60000"),
            ticker("THINUSDT", "1000", "1.5"),
            ticker("EDGEUSDT", "1000000", "1"),
        ]);
        assert_eq!(pairs, vec!["BTCUSDT", "EDGEUSDT"]);
    }

    #[test]
    fn test_filter_rejects_dust_and_garbage() {
        let filter = PairFilter::default();
        assert!(!filter.accepts(&ticker("DUSTUSDT", "1e15", "0.000001")));
        assert!(!filter.accepts(&ticker("NANUSDT", "", "1.0")));
        assert!(!filter.accepts(&ticker("BTCUSDC", "20000", "60000")));
    }

    #[test]
    fn test_filter_without_quote_restriction() {
        let filter = PairFilter {
            quote_asset: None,
            ..PairFilter::default()
        };
        assert!(filter.accepts(&ticker("BTCUSDC", "20000", "60000")));
    }

    #[test]
    fn test_ticker_payload() {
        let tickers: Vec<Ticker24h> = serde_json::from_str(
            r#"[{"symbol":"BTCUSDT","volume":"100","lastPrice":"60000.1","count":5}]"#,
        )
        .unwrap();
        assert_eq!(tickers[0].last_price, "60000.1");
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticPairSource::new(vec!["BTCUSDT".to_string()]);
        assert_eq!(source.fetch_pairs().await.unwrap(), vec!["BTCUSDT"]);
    }
}
