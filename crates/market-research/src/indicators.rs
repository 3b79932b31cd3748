//! Technical Indicators
//!
//! RSI, EMA, MACD, Bollinger bands, and support/resistance computed locally
//! over candle closes. All functions return `None` when the series is too
//! short for the requested window instead of producing partial values.

use rust_decimal::{Decimal, MathematicalOps};

use crate::model::Candle;

/// Simple moving average of the whole slice
fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().copied().sum();
    Some(sum / Decimal::from(values.len()))
}

/// Exponential moving average series, seeded with the SMA of the first
/// `period` values. The returned series starts at index `period - 1` of the
/// input.
pub fn ema_series(closes: &[Decimal], period: usize) -> Option<Vec<Decimal>> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let seed = mean(&closes[..period])?;
    let k = Decimal::from(2) / Decimal::from(period + 1);

    let mut out = Vec::with_capacity(closes.len() - period + 1);
    out.push(seed);

    let mut prev = seed;
    for close in &closes[period..] {
        prev = (*close - prev) * k + prev;
        out.push(prev);
    }

    Some(out)
}

/// Latest EMA value
pub fn ema(closes: &[Decimal], period: usize) -> Option<Decimal> {
    ema_series(closes, period).and_then(|s| s.last().copied())
}

/// Relative Strength Index with Wilder smoothing.
///
/// An all-gain window reads 100, an all-loss window reads 0, and a perfectly
/// flat window reads 50.
pub fn rsi(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || closes.len() <= period {
        return None;
    }

    let p = Decimal::from(period);
    let hundred = Decimal::from(100);

    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    for w in closes.windows(2).take(period) {
        let delta = w[1] - w[0];
        if delta >= Decimal::ZERO {
            gains += delta;
        } else {
            losses -= delta;
        }
    }

    let mut avg_gain = gains / p;
    let mut avg_loss = losses / p;

    for w in closes.windows(2).skip(period) {
        let delta = w[1] - w[0];
        let (gain, loss) = if delta >= Decimal::ZERO {
            (delta, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -delta)
        };
        avg_gain = (avg_gain * (p - Decimal::ONE) + gain) / p;
        avg_loss = (avg_loss * (p - Decimal::ONE) + loss) / p;
    }

    if avg_loss.is_zero() {
        if avg_gain.is_zero() {
            return Some(Decimal::from(50));
        }
        return Some(hundred);
    }

    let rs = avg_gain / avg_loss;
    Some(hundred - hundred / (Decimal::ONE + rs))
}

/// MACD (12, 26, 9) reading
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Macd {
    pub macd: Decimal,
    pub signal: Decimal,
    pub histogram: Decimal,
}

/// MACD line, signal line, and histogram from the standard 12/26/9 windows.
/// Needs at least 34 closes.
pub fn macd(closes: &[Decimal]) -> Option<Macd> {
    const FAST: usize = 12;
    const SLOW: usize = 26;
    const SIGNAL: usize = 9;

    let fast = ema_series(closes, FAST)?;
    let slow = ema_series(closes, SLOW)?;

    // fast starts at index FAST-1 of the input, slow at SLOW-1
    let offset = SLOW - FAST;
    let line: Vec<Decimal> = slow
        .iter()
        .enumerate()
        .map(|(i, s)| fast[i + offset] - *s)
        .collect();

    let signal_series = ema_series(&line, SIGNAL)?;

    let macd_value = *line.last()?;
    let signal = *signal_series.last()?;

    Some(Macd {
        macd: macd_value,
        signal,
        histogram: macd_value - signal,
    })
}

/// Bollinger band reading
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bollinger {
    pub upper: Decimal,
    pub middle: Decimal,
    pub lower: Decimal,
}

/// Bollinger bands over the trailing `period` closes: SMA middle band with
/// `mult` population standard deviations on either side.
pub fn bollinger(closes: &[Decimal], period: usize, mult: Decimal) -> Option<Bollinger> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let middle = mean(window)?;

    let variance: Decimal = window
        .iter()
        .map(|c| {
            let d = *c - middle;
            d * d
        })
        .sum::<Decimal>()
        / Decimal::from(period);

    let sigma = variance.sqrt().unwrap_or(Decimal::ZERO);
    let spread = sigma * mult;

    Some(Bollinger {
        upper: middle + spread,
        middle,
        lower: middle - spread,
    })
}

/// Recent support and resistance: the extreme low/high of the trailing
/// `lookback` candles.
pub fn support_resistance(candles: &[Candle], lookback: usize) -> Option<(Decimal, Decimal)> {
    if candles.is_empty() || lookback == 0 {
        return None;
    }

    let start = candles.len().saturating_sub(lookback);
    let window = &candles[start..];

    let support = window.iter().map(|c| c.low).min()?;
    let resistance = window.iter().map(|c| c.high).max()?;

    Some((support, resistance))
}

/// RSI classification zones
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RsiZone {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiZone {
    /// Below 30 oversold, above 70 overbought
    pub fn from_value(rsi: Decimal) -> Self {
        if rsi < Decimal::from(30) {
            Self::Oversold
        } else if rsi > Decimal::from(70) {
            Self::Overbought
        } else {
            Self::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Oversold => "oversold",
            Self::Neutral => "neutral",
            Self::Overbought => "overbought",
        }
    }
}

/// Percent distance of `price` from `anchor`, positive when above.
/// Zero when the anchor is zero.
pub fn percent_distance(price: Decimal, anchor: Decimal) -> Decimal {
    if anchor.is_zero() {
        return Decimal::ZERO;
    }
    (price - anchor) / anchor * Decimal::from(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn constant_series(value: Decimal, len: usize) -> Vec<Decimal> {
        vec![value; len]
    }

    fn rising_series(start: Decimal, step: Decimal, len: usize) -> Vec<Decimal> {
        let mut out = Vec::with_capacity(len);
        let mut v = start;
        for _ in 0..len {
            out.push(v);
            v += step;
        }
        out
    }

    #[test]
    fn test_ema_constant_series_is_constant() {
        let closes = constant_series(dec!(100), 50);
        assert_eq!(ema(&closes, 7), Some(dec!(100)));
        assert_eq!(ema(&closes, 25), Some(dec!(100)));
    }

    #[test]
    fn test_ema_requires_enough_data() {
        let closes = constant_series(dec!(100), 5);
        assert!(ema(&closes, 7).is_none());
    }

    #[test]
    fn test_rsi_extremes() {
        let rising = rising_series(dec!(100), dec!(1), 40);
        assert_eq!(rsi(&rising, 14), Some(dec!(100)));

        let falling: Vec<Decimal> = rising.iter().rev().copied().collect();
        assert_eq!(rsi(&falling, 14), Some(Decimal::ZERO));

        let flat = constant_series(dec!(100), 40);
        assert_eq!(rsi(&flat, 14), Some(dec!(50)));
    }

    #[test]
    fn test_rsi_needs_period_plus_one() {
        let closes = constant_series(dec!(1), 14);
        assert!(rsi(&closes, 14).is_none());
        let closes = constant_series(dec!(1), 15);
        assert!(rsi(&closes, 14).is_some());
    }

    #[test]
    fn test_macd_constant_series_is_zero() {
        let closes = constant_series(dec!(250), 60);
        let m = macd(&closes).unwrap();
        assert_eq!(m.macd, Decimal::ZERO);
        assert_eq!(m.signal, Decimal::ZERO);
        assert_eq!(m.histogram, Decimal::ZERO);
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let closes = rising_series(dec!(100), dec!(2), 60);
        let m = macd(&closes).unwrap();
        assert!(m.macd > Decimal::ZERO);
    }

    #[test]
    fn test_macd_insufficient_data() {
        let closes = constant_series(dec!(1), 30);
        assert!(macd(&closes).is_none());
    }

    #[test]
    fn test_bollinger_collapses_on_constant_series() {
        let closes = constant_series(dec!(50), 30);
        let b = bollinger(&closes, 20, dec!(2)).unwrap();
        assert_eq!(b.upper, dec!(50));
        assert_eq!(b.middle, dec!(50));
        assert_eq!(b.lower, dec!(50));
    }

    #[test]
    fn test_bollinger_bands_bracket_mean() {
        let mut closes = constant_series(dec!(50), 19);
        closes.push(dec!(70));
        let b = bollinger(&closes, 20, dec!(2)).unwrap();
        assert_eq!(b.middle, dec!(51));
        assert!(b.upper > b.middle);
        assert!(b.lower < b.middle);
    }

    fn candle(low: Decimal, high: Decimal) -> Candle {
        Candle {
            open_time: Utc::now(),
            open: low,
            high,
            low,
            close: high,
            volume: dec!(1),
        }
    }

    #[test]
    fn test_support_resistance_window() {
        let mut candles = vec![candle(dec!(10), dec!(200))];
        for _ in 0..20 {
            candles.push(candle(dec!(90), dec!(110)));
        }
        // The old extreme candle is outside the 20-candle lookback
        let (support, resistance) = support_resistance(&candles, 20).unwrap();
        assert_eq!(support, dec!(90));
        assert_eq!(resistance, dec!(110));
    }

    #[test]
    fn test_rsi_zones() {
        assert_eq!(RsiZone::from_value(dec!(25)), RsiZone::Oversold);
        assert_eq!(RsiZone::from_value(dec!(30)), RsiZone::Neutral);
        assert_eq!(RsiZone::from_value(dec!(71)), RsiZone::Overbought);
    }

    #[test]
    fn test_percent_distance() {
        assert_eq!(percent_distance(dec!(110), dec!(100)), dec!(10));
        assert_eq!(percent_distance(dec!(90), dec!(100)), dec!(-10));
        assert_eq!(percent_distance(dec!(1), Decimal::ZERO), Decimal::ZERO);
    }
}
