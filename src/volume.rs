use crate::error::FetchError;
use crate::types::VolumeSeries;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub const TAAPI_API_BASE: &str = "https://api.taapi.io";

/// Source of signed candle-volume history for a trading pair
#[async_trait]
pub trait VolumeHistoryProvider: Send + Sync {
    /// Fetch the chronological series for `pair` (exchange symbol form, e.g. `BTCUSDT`)
    async fn fetch_volumes(&self, pair: &str) -> Result<VolumeSeries, FetchError>;
}

/// Convert an exchange symbol to the provider's `BASE/QUOTE` form
pub fn to_provider_symbol(pair: &str, quote: &str) -> Result<String, FetchError> {
    match pair.strip_suffix(quote) {
        Some(base) if !base.is_empty() => Ok(format!("{}/{}", base, quote)),
        _ => Err(FetchError::InvalidSymbol(pair.to_string())),
    }
}

/// Custom deserializer that accepts volumes as JSON numbers or numeric strings
fn deserialize_volumes<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    Vec::<NumberOrString>::deserialize(deserializer)?
        .into_iter()
        .map(|v| {
            let volume = match v {
                NumberOrString::Number(n) => n,
                NumberOrString::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| D::Error::custom(format!("invalid volume '{}': {}", s, e)))?,
            };
            // `f64::from_str` accepts "inf" and "NaN"
            if volume.is_finite() {
                Ok(volume)
            } else {
                Err(D::Error::custom(format!("non-finite volume {}", volume)))
            }
        })
        .collect()
}

/// Volume indicator payload
#[derive(Debug, Deserialize)]
struct VolumeResponse {
    #[serde(deserialize_with = "deserialize_volumes")]
    value: Vec<f64>,
}

/// Parse a provider response body into a volume series
pub fn parse_volume_payload(body: &str) -> Result<VolumeSeries, FetchError> {
    let response: VolumeResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    Ok(response.value)
}

/// Request shape shared by every volume call
#[derive(Debug, Clone)]
pub struct VolumeQuery {
    pub exchange: String,
    pub quote_asset: String,
    pub interval: String,
    pub results: usize,
}

/// taapi.io `volume` indicator client
pub struct TaapiVolumeProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    query: VolumeQuery,
}

impl TaapiVolumeProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        query: VolumeQuery,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            query,
        })
    }
}

#[async_trait]
impl VolumeHistoryProvider for TaapiVolumeProvider {
    async fn fetch_volumes(&self, pair: &str) -> Result<VolumeSeries, FetchError> {
        let symbol = to_provider_symbol(pair, &self.query.quote_asset)?;
        let url = format!("{}/volume", self.base_url.trim_end_matches('/'));
        let results = self.query.results.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("secret", self.api_key.as_str()),
                ("exchange", self.query.exchange.as_str()),
                ("symbol", symbol.as_str()),
                ("interval", self.query.interval.as_str()),
                ("results", results.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_volume_payload(&body)
    }
}
