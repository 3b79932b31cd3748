//! Domain Models
//!
//! Core data types for market research. Uses `rust_decimal` for all prices
//! and rates - never use f64 for money!

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A spot market quote for one coin
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quote {
    /// Display symbol (e.g., "BITCOIN", "ETH")
    pub symbol: String,

    /// Canonical coin id used by the quote source (e.g., "bitcoin")
    pub coin_id: String,

    /// Current price in USD
    pub price_usd: Decimal,

    /// 24-hour price change percentage
    pub change_24h_percent: Decimal,

    /// 24-hour trading volume in USD
    pub volume_24h: Option<Decimal>,

    /// Market capitalization in USD
    pub market_cap: Option<Decimal>,

    /// Last price update
    pub updated_at: DateTime<Utc>,
}

/// One OHLCV candle
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Candle interval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
}

impl Interval {
    /// Parse user input; anything unrecognized falls back to the hourly chart
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "1m" => Self::M1,
            "5m" => Self::M5,
            "15m" => Self::M15,
            "30m" => Self::M30,
            "1h" | "h" | "hour" | "hourly" => Self::H1,
            "4h" => Self::H4,
            "1d" | "d" | "day" | "daily" => Self::D1,
            "1w" | "w" | "week" | "weekly" => Self::W1,
            _ => Self::H1,
        }
    }

    /// Wire format used by the exchange klines API
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
            Self::W1 => "1w",
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::H1
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One perpetual funding-rate settlement
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FundingRate {
    pub time: DateTime<Utc>,

    /// Raw rate per settlement period (e.g., 0.0001 = 0.01%)
    pub rate: Decimal,
}

impl FundingRate {
    /// Rate expressed as a percentage
    pub fn percent(&self) -> Decimal {
        self.rate * Decimal::from(100)
    }
}

/// Open interest snapshot for a perpetual pair
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenInterest {
    /// Outstanding contracts, denominated in the base asset
    pub contracts: Decimal,

    /// USD value (requires a spot price; may be unavailable)
    pub value_usd: Option<Decimal>,
}

/// Long/short account ratio sample
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LongShortRatio {
    pub time: DateTime<Utc>,
    pub long_percent: Decimal,
    pub short_percent: Decimal,
    pub ratio: Decimal,
}

/// One fear/greed index reading
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FearGreedPoint {
    pub time: DateTime<Utc>,

    /// Index value, 0..=100
    pub value: u8,

    /// Classification label as reported upstream
    pub classification: String,
}

impl FearGreedPoint {
    pub fn band(&self) -> FearGreedBand {
        FearGreedBand::from_value(self.value)
    }
}

/// Fear/greed index bands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FearGreedBand {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl FearGreedBand {
    /// 0-24 extreme fear, 25-49 fear, 50 neutral, 51-74 greed, 75-100 extreme greed
    pub fn from_value(value: u8) -> Self {
        match value {
            0..=24 => Self::ExtremeFear,
            25..=49 => Self::Fear,
            50 => Self::Neutral,
            51..=74 => Self::Greed,
            _ => Self::ExtremeGreed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ExtremeFear => "Extreme Fear",
            Self::Fear => "Fear",
            Self::Neutral => "Neutral",
            Self::Greed => "Greed",
            Self::ExtremeGreed => "Extreme Greed",
        }
    }

    /// One-line market interpretation of the band
    pub fn interpretation(self) -> &'static str {
        match self {
            Self::ExtremeFear => {
                "Sentiment is extremely fearful; capitulation zones have historically been contrarian buying opportunities."
            }
            Self::Fear => {
                "Sentiment leans fearful; the market is cautious and may be correcting or consolidating."
            }
            Self::Neutral => "Sentiment is neutral; bulls and bears are balanced with no clear direction.",
            Self::Greed => {
                "Sentiment leans greedy; optimism is elevated, so be wary of chasing strength."
            }
            Self::ExtremeGreed => {
                "Sentiment is extremely greedy; these stretches often precede pullbacks."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_interval_parse() {
        assert_eq!(Interval::parse("4h"), Interval::H4);
        assert_eq!(Interval::parse("Daily"), Interval::D1);
        assert_eq!(Interval::parse("1w"), Interval::W1);
        // Unknown input falls back to hourly
        assert_eq!(Interval::parse("fortnightly"), Interval::H1);
        assert_eq!(Interval::parse(""), Interval::H1);
    }

    #[test]
    fn test_fear_greed_bands() {
        assert_eq!(FearGreedBand::from_value(0), FearGreedBand::ExtremeFear);
        assert_eq!(FearGreedBand::from_value(24), FearGreedBand::ExtremeFear);
        assert_eq!(FearGreedBand::from_value(25), FearGreedBand::Fear);
        assert_eq!(FearGreedBand::from_value(50), FearGreedBand::Neutral);
        assert_eq!(FearGreedBand::from_value(51), FearGreedBand::Greed);
        assert_eq!(FearGreedBand::from_value(75), FearGreedBand::ExtremeGreed);
        assert_eq!(FearGreedBand::from_value(100), FearGreedBand::ExtremeGreed);
    }

    #[test]
    fn test_funding_rate_percent() {
        let rate = FundingRate {
            time: Utc::now(),
            rate: dec!(0.0001),
        };
        assert_eq!(rate.percent(), dec!(0.01));
    }
}
