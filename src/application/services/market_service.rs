use crate::domain::errors::AppError;
use crate::infrastructure::binance_client::{MarketDataError, MarketDataSource, Ticker};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Quote currency every basket coin is priced against
const QUOTE_ASSET: &str = "USDT";

/// Days of daily closes returned with a coin detail
const HISTORY_DAYS: u32 = 30;

struct BasketCoin {
    id: &'static str,
    symbol: &'static str,
    name: &'static str,
    fallback_price: f64,
    fallback_change_24h: f64,
}

/// Coins quoted by the price listing, with the static quote served when
/// the upstream is unavailable
const BASKET: [BasketCoin; 10] = [
    BasketCoin { id: "bitcoin", symbol: "BTC", name: "Bitcoin", fallback_price: 39000.0, fallback_change_24h: 2.5 },
    BasketCoin { id: "ethereum", symbol: "ETH", name: "Ethereum", fallback_price: 2800.0, fallback_change_24h: -1.2 },
    BasketCoin { id: "ripple", symbol: "XRP", name: "Ripple", fallback_price: 0.5, fallback_change_24h: 3.1 },
    BasketCoin { id: "bitcoin-cash", symbol: "BCH", name: "Bitcoin Cash", fallback_price: 250.0, fallback_change_24h: -0.8 },
    BasketCoin { id: "litecoin", symbol: "LTC", name: "Litecoin", fallback_price: 130.0, fallback_change_24h: 1.5 },
    BasketCoin { id: "cardano", symbol: "ADA", name: "Cardano", fallback_price: 1.2, fallback_change_24h: 4.2 },
    BasketCoin { id: "polkadot", symbol: "DOT", name: "Polkadot", fallback_price: 15.0, fallback_change_24h: -2.1 },
    BasketCoin { id: "chainlink", symbol: "LINK", name: "Chainlink", fallback_price: 12.0, fallback_change_24h: 0.9 },
    BasketCoin { id: "stellar", symbol: "XLM", name: "Stellar", fallback_price: 0.3, fallback_change_24h: 2.3 },
    BasketCoin { id: "binancecoin", symbol: "BNB", name: "Binance Coin", fallback_price: 450.0, fallback_change_24h: 1.8 },
];

fn pair(symbol: &str) -> String {
    format!("{}{}", symbol, QUOTE_ASSET)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinPrice {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub price_change_percentage_24h: f64,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
}

impl CoinPrice {
    fn from_ticker(id: &str, symbol: &str, name: &str, ticker: &Ticker) -> Self {
        Self {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            current_price: ticker.last_price,
            price_change_percentage_24h: ticker.price_change_percent,
            market_cap: None,
            volume_24h: Some(ticker.quote_volume),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    #[serde(flatten)]
    pub coin: CoinPrice,
    pub price_history: Vec<PricePoint>,
}

/// Market data gateway
#[derive(Clone)]
pub struct MarketService {
    source: Arc<dyn MarketDataSource>,
}

impl MarketService {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self { source }
    }

    /// Static quotes for the whole basket
    pub fn fallback_prices() -> Vec<CoinPrice> {
        BASKET
            .iter()
            .map(|coin| CoinPrice {
                id: coin.id.to_string(),
                symbol: coin.symbol.to_string(),
                name: coin.name.to_string(),
                current_price: coin.fallback_price,
                price_change_percentage_24h: coin.fallback_change_24h,
                market_cap: None,
                volume_24h: None,
            })
            .collect()
    }

    /// Quotes for the basket. Never fails: any upstream problem yields the
    /// static table.
    pub async fn list_prices(&self) -> Vec<CoinPrice> {
        match self.live_prices().await {
            Ok(prices) => prices,
            Err(e) => {
                warn!("Serving fallback prices: {}", e);
                Self::fallback_prices()
            }
        }
    }

    async fn live_prices(&self) -> Result<Vec<CoinPrice>, MarketDataError> {
        let pairs: Vec<String> = BASKET.iter().map(|coin| pair(coin.symbol)).collect();
        let tickers: HashMap<String, Ticker> = self
            .source
            .fetch_tickers(&pairs)
            .await?
            .into_iter()
            .map(|ticker| (ticker.symbol.clone(), ticker))
            .collect();

        BASKET
            .iter()
            .map(|coin| {
                tickers
                    .get(&pair(coin.symbol))
                    .map(|ticker| CoinPrice::from_ticker(coin.id, coin.symbol, coin.name, ticker))
                    .ok_or_else(|| {
                        MarketDataError::Malformed(format!("no ticker for {}", pair(coin.symbol)))
                    })
            })
            .collect()
    }

    /// Current quote and daily history for one coin. No fallback.
    pub async fn get_detail(&self, symbol: &str) -> Result<CoinDetail, AppError> {
        let not_found = || AppError::NotFound(format!("Coin {} not found or API error", symbol));

        let base = symbol.trim().to_uppercase();
        if base.is_empty() || !base.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(not_found());
        }

        let pair = pair(&base);
        let (ticker, closes) = tokio::try_join!(
            self.source.fetch_ticker(&pair),
            self.source.fetch_daily_closes(&pair, HISTORY_DAYS),
        )
        .map_err(|e| {
            warn!("Detail lookup for {} failed: {}", pair, e);
            not_found()
        })?;

        debug!("Fetched {} daily closes for {}", closes.len(), pair);

        let known = BASKET.iter().find(|coin| coin.symbol == base);
        let id = known.map(|c| c.id.to_string()).unwrap_or_else(|| base.to_lowercase());
        let name = known.map(|c| c.name).unwrap_or(base.as_str()).to_string();

        Ok(CoinDetail {
            coin: CoinPrice::from_ticker(&id, &base, &name, &ticker),
            price_history: closes
                .into_iter()
                .map(|close| PricePoint {
                    date: close.date,
                    price: close.close,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::binance_client::DailyClose;
    use async_trait::async_trait;

    /// Canned upstream; `skip` drops one pair from ticker batches
    struct StubSource {
        healthy: bool,
        skip: Option<&'static str>,
    }

    fn ticker(symbol: &str, price: f64) -> Ticker {
        Ticker {
            symbol: symbol.to_string(),
            last_price: price,
            price_change_percent: 1.0,
            quote_volume: 1000.0,
        }
    }

    #[async_trait]
    impl MarketDataSource for StubSource {
        async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<Ticker>, MarketDataError> {
            if !self.healthy {
                return Err(MarketDataError::Upstream { status: 429, body: "slow down".to_string() });
            }
            Ok(symbols
                .iter()
                .filter(|s| Some(s.as_str()) != self.skip)
                .map(|s| ticker(s, 10.0))
                .collect())
        }

        async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, MarketDataError> {
            if !self.healthy {
                return Err(MarketDataError::Transport("connection refused".to_string()));
            }
            Ok(ticker(symbol, 42.0))
        }

        async fn fetch_daily_closes(&self, _symbol: &str, days: u32) -> Result<Vec<DailyClose>, MarketDataError> {
            if !self.healthy {
                return Err(MarketDataError::Transport("connection refused".to_string()));
            }
            Ok((1..=days)
                .map(|d| DailyClose {
                    date: format!("2024-01-{:02}", d),
                    close: d as f64,
                })
                .collect())
        }
    }

    fn service(healthy: bool, skip: Option<&'static str>) -> MarketService {
        MarketService::new(Arc::new(StubSource { healthy, skip }))
    }

    fn symbols(prices: &[CoinPrice]) -> Vec<&str> {
        prices.iter().map(|p| p.symbol.as_str()).collect()
    }

    const EXPECTED: [&str; 10] = ["BTC", "ETH", "XRP", "BCH", "LTC", "ADA", "DOT", "LINK", "XLM", "BNB"];

    #[tokio::test]
    async fn test_live_prices() {
        let prices = service(true, None).list_prices().await;
        assert_eq!(symbols(&prices), EXPECTED);
        assert_eq!(prices[0].id, "bitcoin");
        assert_eq!(prices[0].current_price, 10.0);
        assert_eq!(prices[0].volume_24h, Some(1000.0));
        assert_eq!(prices[0].market_cap, None);
    }

    #[tokio::test]
    async fn test_upstream_failure_serves_fallback() {
        let prices = service(false, None).list_prices().await;
        assert_eq!(symbols(&prices), EXPECTED);
        assert_eq!(prices, MarketService::fallback_prices());
        assert_eq!(prices[0].current_price, 39000.0);
        assert_eq!(prices[1].price_change_percentage_24h, -1.2);
    }

    #[tokio::test]
    async fn test_incomplete_upstream_serves_fallback() {
        let prices = service(true, Some("LINKUSDT")).list_prices().await;
        assert_eq!(prices, MarketService::fallback_prices());
    }

    #[tokio::test]
    async fn test_detail() {
        let detail = service(true, None).get_detail("eth").await.unwrap();
        assert_eq!(detail.coin.symbol, "ETH");
        assert_eq!(detail.coin.name, "Ethereum");
        assert_eq!(detail.coin.current_price, 42.0);
        assert_eq!(detail.price_history.len(), 30);
        assert_eq!(detail.price_history[0].date, "2024-01-01");

        let unlisted = service(true, None).get_detail("SOL").await.unwrap();
        assert_eq!(unlisted.coin.id, "sol");
        assert_eq!(unlisted.coin.name, "SOL");
    }

    #[tokio::test]
    async fn test_detail_failure_is_not_found() {
        let err = service(false, None).get_detail("BTC").await.unwrap_err();
        assert_eq!(err, AppError::NotFound("Coin BTC not found or API error".to_string()));

        assert!(matches!(
            service(true, None).get_detail("BTC/USDT").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_detail_serializes_flat() {
        let detail = CoinDetail {
            coin: MarketService::fallback_prices().remove(0),
            price_history: vec![],
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["symbol"], "BTC");
        assert!(json["price_history"].as_array().unwrap().is_empty());
    }
}
