//! # market-research
//!
//! Market data access and research tools for the crypto research assistant.
//!
//! Three layers:
//!
//! - `market`: the `MarketDataClient` seam over the public data sources
//!   (spot quotes, candles, futures positioning, fear/greed sentiment), with
//!   a live HTTP implementation and a deterministic mock.
//! - `indicators`: RSI, MACD, Bollinger bands, EMAs, and support/resistance
//!   computed locally over candle closes in `Decimal` - no float drift in
//!   anything price-shaped.
//! - `svckit`: the `agent_core::Tool` implementations the gather loop calls
//!   (`market_snapshot`, `crypto_price`, `technical`, `fear_greed`,
//!   `futures_data`, `search`).

pub mod error;
pub mod indicators;
pub mod market;
pub mod model;
pub mod svckit;
pub mod symbols;

pub use error::{MarketError, Result};
pub use market::{HttpMarketClient, MarketDataClient, MockMarketClient};
pub use model::{Candle, FearGreedBand, FearGreedPoint, Interval, Quote};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        FearGreedTool, FuturesDataTool, MarketSnapshotTool, PriceLookupTool,
        TechnicalIndicatorTool, WebSearchTool,
    };
}
