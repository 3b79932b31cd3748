//! Market Data Sources
//!
//! Abstractions and implementations for the public market-data APIs the
//! research tools read from.

mod http;
mod mock;

pub use http::HttpMarketClient;
pub use mock::MockMarketClient;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::model::{
    Candle, FearGreedPoint, FundingRate, Interval, LongShortRatio, OpenInterest, Quote,
};

/// Market data client trait (Strategy pattern)
///
/// One seam over every upstream source the tools need: spot quotes, candles,
/// perpetual-futures positioning, and the fear/greed sentiment index.
/// Implemented live by `HttpMarketClient` and deterministically by
/// `MockMarketClient`.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Current quotes for a set of coin ids (price, 24h change, volume, cap)
    async fn quotes(&self, coin_ids: &[String]) -> Result<Vec<Quote>>;

    /// OHLCV candles for an exchange pair
    async fn candles(&self, pair: &str, interval: Interval, limit: u16) -> Result<Vec<Candle>>;

    /// Recent funding-rate settlements, oldest first
    async fn funding_rates(&self, pair: &str, limit: u16) -> Result<Vec<FundingRate>>;

    /// Current open interest for a perpetual pair
    async fn open_interest(&self, pair: &str) -> Result<OpenInterest>;

    /// Recent long/short account ratio samples, oldest first
    async fn long_short_ratio(&self, pair: &str, limit: u16) -> Result<Vec<LongShortRatio>>;

    /// Latest spot ticker price for a pair
    async fn spot_price(&self, pair: &str) -> Result<Decimal>;

    /// Fear/greed index, newest first, one point per day
    async fn fear_greed(&self, days: u8) -> Result<Vec<FearGreedPoint>>;

    /// Check if the data source is reachable
    async fn health_check(&self) -> bool;

    /// Source name
    fn name(&self) -> &str;
}
