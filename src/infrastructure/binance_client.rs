//! Binance public market data client
//!
//! Read-only access to the spot REST API: 24h tickers and daily klines.
//! No credentials are involved.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const BINANCE_API_BASE: &str = "https://api.binance.com";

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Market data request failed: {0}")]
    Transport(String),

    #[error("Market data upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed market data: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for MarketDataError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MarketDataError::Malformed(e.to_string())
        } else {
            MarketDataError::Transport(e.to_string())
        }
    }
}

/// 24h rolling statistics for one trading pair
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    /// Exchange pair symbol, e.g. `BTCUSDT`
    pub symbol: String,
    pub last_price: f64,
    pub price_change_percent: f64,
    pub quote_volume: f64,
}

/// Closing price of one daily candle
#[derive(Debug, Clone, PartialEq)]
pub struct DailyClose {
    /// Candle open day, `YYYY-MM-DD` (UTC)
    pub date: String,
    pub close: f64,
}

/// Source of quotes and price history
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<Ticker>, MarketDataError>;

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, MarketDataError>;

    /// Up to `days` most recent daily closes, oldest first
    async fn fetch_daily_closes(&self, symbol: &str, days: u32) -> Result<Vec<DailyClose>, MarketDataError>;
}

/// Wire format of `/api/v3/ticker/24hr`; numbers arrive as strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    symbol: String,
    last_price: String,
    price_change_percent: String,
    quote_volume: String,
}

impl RawTicker {
    fn parse(self) -> Result<Ticker, MarketDataError> {
        Ok(Ticker {
            last_price: parse_decimal("lastPrice", &self.last_price)?,
            price_change_percent: parse_decimal("priceChangePercent", &self.price_change_percent)?,
            quote_volume: parse_decimal("quoteVolume", &self.quote_volume)?,
            symbol: self.symbol,
        })
    }
}

fn parse_decimal(field: &str, raw: &str) -> Result<f64, MarketDataError> {
    raw.parse::<f64>()
        .map_err(|_| MarketDataError::Malformed(format!("{} is not a number: '{}'", field, raw)))
}

/// Kline rows are heterogeneous arrays: open time (ms) at 0, close at 4
fn parse_kline(row: &[Value]) -> Result<DailyClose, MarketDataError> {
    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| MarketDataError::Malformed("kline open time missing".to_string()))?;
    let close = row
        .get(4)
        .and_then(Value::as_str)
        .ok_or_else(|| MarketDataError::Malformed("kline close missing".to_string()))?;

    let date = DateTime::<Utc>::from_timestamp_millis(open_time)
        .ok_or_else(|| MarketDataError::Malformed(format!("kline open time out of range: {}", open_time)))?
        .format("%Y-%m-%d")
        .to_string();

    Ok(DailyClose {
        date,
        close: parse_decimal("close", close)?,
    })
}

/// Binance REST client
#[derive(Debug, Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, MarketDataError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let resp = self.client.get(&url).query(query).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            warn!("Binance {} returned {}", path, status);
            return Err(MarketDataError::Upstream { status, body });
        }

        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<Ticker>, MarketDataError> {
        let symbols = serde_json::to_string(symbols)
            .map_err(|e| MarketDataError::Malformed(e.to_string()))?;

        let raw: Vec<RawTicker> = self
            .get_json("/api/v3/ticker/24hr", &[("symbols", symbols)])
            .await?;

        raw.into_iter().map(RawTicker::parse).collect()
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, MarketDataError> {
        let raw: RawTicker = self
            .get_json("/api/v3/ticker/24hr", &[("symbol", symbol.to_string())])
            .await?;

        raw.parse()
    }

    async fn fetch_daily_closes(&self, symbol: &str, days: u32) -> Result<Vec<DailyClose>, MarketDataError> {
        let rows: Vec<Vec<Value>> = self
            .get_json(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", "1d".to_string()),
                    ("limit", days.to_string()),
                ],
            )
            .await?;

        rows.iter().map(|row| parse_kline(row)).collect()
    }
}
