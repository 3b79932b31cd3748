//! Live Market Data Client
//!
//! Pulls spot quotes from CoinGecko, candles and futures positioning from
//! the exchange's public spot/futures APIs, and sentiment from the
//! Alternative.me fear/greed endpoint. All endpoints are free and unkeyed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::MarketDataClient;
use crate::error::{MarketError, Result};
use crate::model::{
    Candle, FearGreedPoint, FundingRate, Interval, LongShortRatio, OpenInterest, Quote,
};

const COINGECKO: &str = "CoinGecko";
const EXCHANGE: &str = "exchange spot API";
const FUTURES: &str = "exchange futures API";
const SENTIMENT: &str = "Alternative.me";

const DEFAULT_COINGECKO_BASE: &str = "https://api.coingecko.com/api/v3";
const DEFAULT_EXCHANGE_BASE: &str = "https://api.binance.com";
const DEFAULT_FUTURES_BASE: &str = "https://fapi.binance.com";
const DEFAULT_SENTIMENT_BASE: &str = "https://api.alternative.me";

/// Live market data client over public HTTP APIs
pub struct HttpMarketClient {
    http: reqwest::Client,
    coingecko_base: String,
    exchange_base: String,
    futures_base: String,
    sentiment_base: String,
}

impl Default for HttpMarketClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpMarketClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            coingecko_base: DEFAULT_COINGECKO_BASE.into(),
            exchange_base: DEFAULT_EXCHANGE_BASE.into(),
            futures_base: DEFAULT_FUTURES_BASE.into(),
            sentiment_base: DEFAULT_SENTIMENT_BASE.into(),
        }
    }

    /// Override all base URLs (for tests or mirrors)
    pub fn with_bases(
        mut self,
        coingecko: impl Into<String>,
        exchange: impl Into<String>,
        futures: impl Into<String>,
        sentiment: impl Into<String>,
    ) -> Self {
        self.coingecko_base = coingecko.into();
        self.exchange_base = exchange.into();
        self.futures_base = futures.into();
        self.sentiment_base = sentiment.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        source: &'static str,
        url: String,
        params: &[(&str, String)],
    ) -> Result<T> {
        let resp = self.http.get(&url).query(params).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(MarketError::upstream(source, format!("{}: {}", status, preview)));
        }

        Ok(resp.json::<T>().await?)
    }
}

/// CoinGecko `simple/price` entry
#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: Option<f64>,
    usd_market_cap: Option<f64>,
    usd_24h_vol: Option<f64>,
    usd_24h_change: Option<f64>,
    last_updated_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingEntry {
    funding_time: i64,
    funding_rate: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenInterestEntry {
    open_interest: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LongShortEntry {
    long_account: String,
    short_account: String,
    long_short_ratio: String,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
struct FngResponse {
    #[serde(default)]
    data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
    value_classification: String,
    timestamp: String,
}

fn parse_decimal(source: &'static str, raw: &str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .map_err(|_| MarketError::upstream(source, format!("unparseable decimal '{}'", raw)))
}

fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
}

fn time_from_millis(source: &'static str, ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| MarketError::upstream(source, format!("bad timestamp {}", ms)))
}

/// Parse one kline row: `[open_time, open, high, low, close, volume, ...]`
/// where prices come back as strings.
fn parse_kline_row(row: &[Value]) -> Result<Candle> {
    fn decimal_at(row: &[Value], idx: usize) -> Result<Decimal> {
        match row.get(idx) {
            Some(Value::String(s)) => parse_decimal(EXCHANGE, s),
            Some(Value::Number(n)) => Ok(decimal_from_f64(n.as_f64().unwrap_or_default())),
            _ => Err(MarketError::upstream(EXCHANGE, "short kline row")),
        }
    }

    let open_time_ms = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| MarketError::upstream(EXCHANGE, "kline row missing open time"))?;

    Ok(Candle {
        open_time: time_from_millis(EXCHANGE, open_time_ms)?,
        open: decimal_at(row, 1)?,
        high: decimal_at(row, 2)?,
        low: decimal_at(row, 3)?,
        close: decimal_at(row, 4)?,
        volume: decimal_at(row, 5)?,
    })
}

#[async_trait]
impl MarketDataClient for HttpMarketClient {
    async fn quotes(&self, coin_ids: &[String]) -> Result<Vec<Quote>> {
        if coin_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/simple/price", self.coingecko_base);
        let params = [
            ("ids", coin_ids.join(",")),
            ("vs_currencies", "usd".into()),
            ("include_24hr_change", "true".into()),
            ("include_24hr_vol", "true".into()),
            ("include_market_cap", "true".into()),
            ("include_last_updated_at", "true".into()),
        ];

        let data: std::collections::HashMap<String, SimplePrice> =
            self.get_json(COINGECKO, url, &params).await?;

        let mut quotes = Vec::new();
        for coin_id in coin_ids {
            let Some(entry) = data.get(coin_id) else {
                continue;
            };
            let Some(price) = entry.usd else {
                continue;
            };

            quotes.push(Quote {
                symbol: coin_id.to_uppercase(),
                coin_id: coin_id.clone(),
                price_usd: decimal_from_f64(price),
                change_24h_percent: entry.usd_24h_change.map_or(Decimal::ZERO, decimal_from_f64),
                volume_24h: entry.usd_24h_vol.map(decimal_from_f64),
                market_cap: entry.usd_market_cap.map(decimal_from_f64),
                updated_at: entry
                    .last_updated_at
                    .and_then(|s| DateTime::from_timestamp(s, 0))
                    .unwrap_or_else(Utc::now),
            });
        }

        Ok(quotes)
    }

    async fn candles(&self, pair: &str, interval: Interval, limit: u16) -> Result<Vec<Candle>> {
        let url = format!("{}/api/v3/klines", self.exchange_base);
        let params = [
            ("symbol", pair.to_string()),
            ("interval", interval.as_str().to_string()),
            ("limit", limit.to_string()),
        ];

        let rows: Vec<Vec<Value>> = self.get_json(EXCHANGE, url, &params).await?;

        if rows.is_empty() {
            return Err(MarketError::UnsupportedAsset(pair.to_string()));
        }

        rows.iter().map(|row| parse_kline_row(row)).collect()
    }

    async fn funding_rates(&self, pair: &str, limit: u16) -> Result<Vec<FundingRate>> {
        let url = format!("{}/fapi/v1/fundingRate", self.futures_base);
        let params = [("symbol", pair.to_string()), ("limit", limit.to_string())];

        let entries: Vec<FundingEntry> = self.get_json(FUTURES, url, &params).await?;

        entries
            .iter()
            .map(|e| {
                Ok(FundingRate {
                    time: time_from_millis(FUTURES, e.funding_time)?,
                    rate: parse_decimal(FUTURES, &e.funding_rate)?,
                })
            })
            .collect()
    }

    async fn open_interest(&self, pair: &str) -> Result<OpenInterest> {
        let url = format!("{}/fapi/v1/openInterest", self.futures_base);
        let params = [("symbol", pair.to_string())];

        let entry: OpenInterestEntry = self.get_json(FUTURES, url, &params).await?;
        let contracts = parse_decimal(FUTURES, &entry.open_interest)?;

        // USD value needs the spot price; degrade to contracts-only on failure
        let value_usd = match self.spot_price(pair).await {
            Ok(price) => Some(contracts * price),
            Err(e) => {
                tracing::debug!(pair, error = %e, "Spot price unavailable for OI valuation");
                None
            }
        };

        Ok(OpenInterest {
            contracts,
            value_usd,
        })
    }

    async fn long_short_ratio(&self, pair: &str, limit: u16) -> Result<Vec<LongShortRatio>> {
        let url = format!("{}/futures/data/globalLongShortAccountRatio", self.futures_base);
        let params = [
            ("symbol", pair.to_string()),
            ("period", "1h".to_string()),
            ("limit", limit.to_string()),
        ];

        let entries: Vec<LongShortEntry> = self.get_json(FUTURES, url, &params).await?;

        let hundred = Decimal::from(100);
        entries
            .iter()
            .map(|e| {
                Ok(LongShortRatio {
                    time: time_from_millis(FUTURES, e.timestamp)?,
                    long_percent: parse_decimal(FUTURES, &e.long_account)? * hundred,
                    short_percent: parse_decimal(FUTURES, &e.short_account)? * hundred,
                    ratio: parse_decimal(FUTURES, &e.long_short_ratio)?,
                })
            })
            .collect()
    }

    async fn spot_price(&self, pair: &str) -> Result<Decimal> {
        let url = format!("{}/api/v3/ticker/price", self.exchange_base);
        let params = [("symbol", pair.to_string())];

        let ticker: TickerPrice = self.get_json(EXCHANGE, url, &params).await?;
        parse_decimal(EXCHANGE, &ticker.price)
    }

    async fn fear_greed(&self, days: u8) -> Result<Vec<FearGreedPoint>> {
        let url = format!("{}/fng/", self.sentiment_base);
        let params = [("limit", days.to_string())];

        let response: FngResponse = self.get_json(SENTIMENT, url, &params).await?;

        if response.data.is_empty() {
            return Err(MarketError::EmptySeries("fear/greed index".into()));
        }

        Ok(response
            .data
            .iter()
            .map(|e| FearGreedPoint {
                time: e
                    .timestamp
                    .parse::<i64>()
                    .ok()
                    .and_then(|s| DateTime::from_timestamp(s, 0))
                    .unwrap_or_else(Utc::now),
                value: e.value.parse::<u8>().unwrap_or(50).min(100),
                classification: e.value_classification.clone(),
            })
            .collect())
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/ping", self.coingecko_base);
        match self.http.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!("Market data health check failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "LiveMarket"
    }
}
