//! Mock Market Data Client
//!
//! Deterministic dataset for tests and offline demos. Prices are static and
//! candle series follow a fixed triangle wave, so indicator output is
//! reproducible run to run.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::MarketDataClient;
use crate::error::{MarketError, Result};
use crate::model::{
    Candle, FearGreedBand, FearGreedPoint, FundingRate, Interval, LongShortRatio, OpenInterest,
    Quote,
};

/// Mock market client with static quotes and synthetic candles
pub struct MockMarketClient {
    funding_rate: Decimal,
    long_short: Decimal,
    fear_greed_value: u8,
}

impl Default for MockMarketClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketClient {
    pub fn new() -> Self {
        Self {
            funding_rate: dec!(0.0001),
            long_short: dec!(1.2),
            fear_greed_value: 44,
        }
    }

    /// Override the funding rate (for testing the crowded-positioning reads)
    pub fn with_funding_rate(mut self, rate: Decimal) -> Self {
        self.funding_rate = rate;
        self
    }

    /// Override the long/short account ratio
    pub fn with_long_short(mut self, ratio: Decimal) -> Self {
        self.long_short = ratio;
        self
    }

    /// Override the latest fear/greed value
    pub fn with_fear_greed(mut self, value: u8) -> Self {
        self.fear_greed_value = value.min(100);
        self
    }

    /// Static dataset: (coin_id, price, 24h change %, volume, market cap)
    fn quote_row(coin_id: &str) -> Option<(Decimal, Decimal, Decimal, Decimal)> {
        match coin_id {
            "bitcoin" => Some((dec!(97500), dec!(2.5), dec!(25000000000), dec!(1900000000000))),
            "ethereum" => Some((dec!(3450), dec!(1.8), dec!(15000000000), dec!(415000000000))),
            "solana" => Some((dec!(195), dec!(4.2), dec!(3000000000), dec!(92000000000))),
            "cardano" => Some((dec!(0.95), dec!(-1.2), dec!(800000000), dec!(34000000000))),
            "polkadot" => Some((dec!(7.20), dec!(0.8), dec!(250000000), dec!(10500000000))),
            "chainlink" => Some((dec!(24.50), dec!(3.1), dec!(650000000), dec!(15000000000))),
            "avalanche-2" => Some((dec!(42.00), dec!(5.5), dec!(500000000), dec!(17000000000))),
            "dogecoin" => Some((dec!(0.38), dec!(12.0), dec!(4000000000), dec!(56000000000))),
            "ripple" => Some((dec!(2.35), dec!(0.9), dec!(5000000000), dec!(134000000000))),
            "sui" => Some((dec!(3.80), dec!(-2.4), dec!(900000000), dec!(11500000000))),
            _ => None,
        }
    }

    fn pair_price(pair: &str) -> Option<Decimal> {
        match pair {
            "BTCUSDT" => Some(dec!(97500)),
            "ETHUSDT" => Some(dec!(3450)),
            "SOLUSDT" => Some(dec!(195)),
            "ADAUSDT" => Some(dec!(0.95)),
            "DOTUSDT" => Some(dec!(7.20)),
            "LINKUSDT" => Some(dec!(24.50)),
            "AVAXUSDT" => Some(dec!(42.00)),
            "DOGEUSDT" => Some(dec!(0.38)),
            "XRPUSDT" => Some(dec!(2.35)),
            "SUIUSDT" => Some(dec!(3.80)),
            _ => None,
        }
    }
}

#[async_trait]
impl MarketDataClient for MockMarketClient {
    async fn quotes(&self, coin_ids: &[String]) -> Result<Vec<Quote>> {
        Ok(coin_ids
            .iter()
            .filter_map(|coin_id| {
                Self::quote_row(coin_id).map(|(price, change, volume, cap)| Quote {
                    symbol: coin_id.to_uppercase(),
                    coin_id: coin_id.clone(),
                    price_usd: price,
                    change_24h_percent: change,
                    volume_24h: Some(volume),
                    market_cap: Some(cap),
                    updated_at: Utc::now(),
                })
            })
            .collect())
    }

    async fn candles(&self, pair: &str, interval: Interval, limit: u16) -> Result<Vec<Candle>> {
        let base = Self::pair_price(pair).ok_or_else(|| MarketError::UnsupportedAsset(pair.into()))?;

        let step = match interval {
            Interval::M1 => Duration::minutes(1),
            Interval::M5 => Duration::minutes(5),
            Interval::M15 => Duration::minutes(15),
            Interval::M30 => Duration::minutes(30),
            Interval::H1 => Duration::hours(1),
            Interval::H4 => Duration::hours(4),
            Interval::D1 => Duration::days(1),
            Interval::W1 => Duration::weeks(1),
        };

        let now = Utc::now();
        let count = i64::from(limit);
        let mut candles = Vec::with_capacity(limit as usize);
        let mut prev_close = base;

        for i in 0..count {
            // Triangle wave, period 20 candles, amplitude +/- 2%
            let phase = (i % 20 - 10).abs() - 5; // -5..=5
            let close = base + base * Decimal::from(phase) / dec!(250);

            let open = prev_close;
            let high = open.max(close) * dec!(1.005);
            let low = open.min(close) * dec!(0.995);

            candles.push(Candle {
                open_time: now - step * (count - i) as i32,
                open,
                high,
                low,
                close,
                volume: dec!(1000),
            });
            prev_close = close;
        }

        Ok(candles)
    }

    async fn funding_rates(&self, pair: &str, limit: u16) -> Result<Vec<FundingRate>> {
        Self::pair_price(pair).ok_or_else(|| MarketError::UnsupportedAsset(pair.into()))?;

        let now = Utc::now();
        let count = i64::from(limit);
        Ok((0..count)
            .map(|i| FundingRate {
                time: now - Duration::hours(8 * (count - i)),
                rate: self.funding_rate,
            })
            .collect())
    }

    async fn open_interest(&self, pair: &str) -> Result<OpenInterest> {
        let price = Self::pair_price(pair).ok_or_else(|| MarketError::UnsupportedAsset(pair.into()))?;
        let contracts = dec!(80000);
        Ok(OpenInterest {
            contracts,
            value_usd: Some(contracts * price),
        })
    }

    async fn long_short_ratio(&self, pair: &str, limit: u16) -> Result<Vec<LongShortRatio>> {
        Self::pair_price(pair).ok_or_else(|| MarketError::UnsupportedAsset(pair.into()))?;

        let hundred = Decimal::from(100);
        let long_percent = self.long_short / (self.long_short + Decimal::ONE) * hundred;
        let short_percent = hundred - long_percent;

        let now = Utc::now();
        let count = i64::from(limit);
        Ok((0..count)
            .map(|i| LongShortRatio {
                time: now - Duration::hours(count - i),
                long_percent,
                short_percent,
                ratio: self.long_short,
            })
            .collect())
    }

    async fn spot_price(&self, pair: &str) -> Result<Decimal> {
        Self::pair_price(pair).ok_or_else(|| MarketError::UnsupportedAsset(pair.into()))
    }

    async fn fear_greed(&self, days: u8) -> Result<Vec<FearGreedPoint>> {
        let now = Utc::now();
        // Newest first, drifting one point per day back in time
        Ok((0..days.max(1))
            .map(|i| {
                let value = self.fear_greed_value.saturating_sub(i).min(100);
                FearGreedPoint {
                    time: now - Duration::days(i64::from(i)),
                    value,
                    classification: FearGreedBand::from_value(value).label().to_string(),
                }
            })
            .collect())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "MockMarket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::pair_base;

    #[tokio::test]
    async fn test_mock_quotes() {
        let client = MockMarketClient::new();
        let quotes = client.quotes(&["bitcoin".into(), "nope".into()]).await.unwrap();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].symbol, "BITCOIN");
        assert!(quotes[0].price_usd > Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_mock_candles_are_deterministic() {
        let client = MockMarketClient::new();
        let a = client.candles("BTCUSDT", Interval::H1, 100).await.unwrap();
        let b = client.candles("BTCUSDT", Interval::H1, 100).await.unwrap();

        assert_eq!(a.len(), 100);
        assert_eq!(a[10].close, b[10].close);
        assert!(a.iter().all(|c| c.low <= c.high));
    }

    #[tokio::test]
    async fn test_mock_unsupported_pair() {
        let client = MockMarketClient::new();
        let result = client.candles("NOTREALUSDT", Interval::H1, 10).await;
        assert!(matches!(result, Err(MarketError::UnsupportedAsset(_))));
    }

    #[tokio::test]
    async fn test_mock_fear_greed_newest_first() {
        let client = MockMarketClient::new().with_fear_greed(30);
        let points = client.fear_greed(7).await.unwrap();

        assert_eq!(points.len(), 7);
        assert_eq!(points[0].value, 30);
        assert!(points[0].time > points[6].time);
    }

    #[tokio::test]
    async fn test_pair_base_helper_matches_dataset() {
        let client = MockMarketClient::new();
        let oi = client.open_interest("ETHUSDT").await.unwrap();
        assert_eq!(pair_base("ETHUSDT"), "ETH");
        assert!(oi.value_usd.unwrap() > oi.contracts);
    }
}
