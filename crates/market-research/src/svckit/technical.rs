//! Technical Indicator Tool
//!
//! Fetches recent candles and computes RSI, MACD, Bollinger bands, EMAs, and
//! support/resistance locally, then emits a classified readout.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};
use agent_core::Result as CoreResult;

use crate::indicators::{
    bollinger, ema, macd, percent_distance, rsi, support_resistance, RsiZone,
};
use crate::market::MarketDataClient;
use crate::symbols::{parse_symbol_query, resolve_pair};

const CANDLE_LIMIT: u16 = 100;
const SR_LOOKBACK: usize = 20;

/// Tool computing technical indicators from exchange candles
pub struct TechnicalIndicatorTool {
    market: Arc<dyn MarketDataClient>,
}

impl TechnicalIndicatorTool {
    pub fn new(market: Arc<dyn MarketDataClient>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for TechnicalIndicatorTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "technical".into(),
            description: "Compute technical indicators (RSI, MACD, Bollinger bands, EMA, support/resistance) from live exchange candles. Input: symbol and optional interval, e.g. 'BTC 1h' or 'ETH 4h'.".into(),
            parameters: vec![ParameterSchema::optional_string(
                "input",
                "Symbol plus interval (e.g. 'BTC 1h', 'ETH 4h', 'SOL 1d')",
                "BTC 1h",
            )],
            category: Some("market_data".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let input = call.str_arg("input").unwrap_or("BTC 1h");
        let (symbol, interval) = parse_symbol_query(input);
        let pair = resolve_pair(&symbol);

        let candles = match self.market.candles(&pair, interval, CANDLE_LIMIT).await {
            Ok(candles) => candles,
            Err(e) => {
                return Ok(ToolResult::failure(
                    "technical",
                    format!("Candle data unavailable for {}: {}", pair, e),
                ));
            }
        };

        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
        let Some(current) = closes.last().copied() else {
            return Ok(ToolResult::failure(
                "technical",
                format!("No candles returned for {}", pair),
            ));
        };

        let mut out = format!(
            "{} {} technicals (last {} candles):\n",
            pair,
            interval,
            candles.len()
        );
        out.push_str(&format!("Current price: ${:.2}\n\n", current));

        // RSI (14)
        match rsi(&closes, 14) {
            Some(value) => {
                let zone = RsiZone::from_value(value);
                out.push_str(&format!("RSI (14): {:.1} - {}\n", value, zone.label()));
            }
            None => out.push_str("RSI (14): n/a (not enough data)\n"),
        }

        // MACD (12, 26, 9)
        match macd(&closes) {
            Some(m) => {
                let momentum = if m.histogram > Decimal::ZERO {
                    "bullish crossover (momentum up)"
                } else if m.histogram < Decimal::ZERO {
                    "bearish crossover (momentum down)"
                } else {
                    "flat"
                };
                out.push_str(&format!(
                    "MACD (12,26,9): macd={:.2} signal={:.2} hist={:.2} - {}\n",
                    m.macd, m.signal, m.histogram, momentum
                ));
            }
            None => out.push_str("MACD (12,26,9): n/a (not enough data)\n"),
        }

        // Bollinger (20, 2)
        match bollinger(&closes, 20, dec!(2)) {
            Some(b) => {
                let position = if current > b.upper * dec!(0.98) {
                    "near the upper band (stretched)"
                } else if current < b.lower * dec!(1.02) {
                    "near the lower band (washed out)"
                } else {
                    "mid-range"
                };
                out.push_str(&format!(
                    "Bollinger (20,2): upper=${:.2} middle=${:.2} lower=${:.2} - price {}\n",
                    b.upper, b.middle, b.lower, position
                ));
            }
            None => out.push_str("Bollinger (20,2): n/a (not enough data)\n"),
        }

        // EMAs
        let ema7 = ema(&closes, 7);
        let ema25 = ema(&closes, 25);
        let ema99 = ema(&closes, 99);
        let mut ema_parts = Vec::new();
        if let Some(v) = ema7 {
            ema_parts.push(format!("EMA7=${:.2}", v));
        }
        if let Some(v) = ema25 {
            ema_parts.push(format!("EMA25=${:.2}", v));
        }
        if let Some(v) = ema99 {
            ema_parts.push(format!("EMA99=${:.2}", v));
        }
        if ema_parts.is_empty() {
            out.push_str("EMA: n/a (not enough data)\n");
        } else {
            out.push_str(&format!("EMA: {}\n", ema_parts.join(" | ")));
        }
        if let (Some(short), Some(long)) = (ema7, ema25) {
            if short > long {
                out.push_str("EMA stacking: short-term above long-term (leaning bullish)\n");
            } else {
                out.push_str("EMA stacking: short-term below long-term (leaning bearish)\n");
            }
        }

        // Support / resistance from recent extremes
        if let Some((support, resistance)) = support_resistance(&candles, SR_LOOKBACK) {
            out.push_str(&format!(
                "Support/resistance (last {} candles): support=${:.2} resistance=${:.2}\n",
                SR_LOOKBACK, support, resistance
            ));
            out.push_str(&format!(
                "Distance: {:+.1}% from support, {:+.1}% from resistance\n",
                percent_distance(current, support),
                percent_distance(current, resistance)
            ));
        }

        Ok(ToolResult::success("technical", out.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MockMarketClient;
    use std::collections::HashMap;

    fn call(input: &str) -> ToolCall {
        let mut arguments = HashMap::new();
        arguments.insert("input".into(), serde_json::json!(input));
        ToolCall {
            name: "technical".into(),
            arguments,
            id: None,
        }
    }

    #[tokio::test]
    async fn test_technical_readout_sections() {
        let tool = TechnicalIndicatorTool::new(Arc::new(MockMarketClient::new()));
        let result = tool.execute(&call("BTC 1h")).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("BTCUSDT 1h technicals"));
        assert!(result.output.contains("RSI (14):"));
        assert!(result.output.contains("MACD (12,26,9):"));
        assert!(result.output.contains("Bollinger (20,2):"));
        assert!(result.output.contains("EMA7="));
        assert!(result.output.contains("support="));
    }

    #[tokio::test]
    async fn test_technical_defaults_to_btc_hourly() {
        let tool = TechnicalIndicatorTool::new(Arc::new(MockMarketClient::new()));
        let result = tool
            .execute(&ToolCall {
                name: "technical".into(),
                arguments: HashMap::new(),
                id: None,
            })
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.contains("BTCUSDT 1h"));
    }

    #[tokio::test]
    async fn test_technical_unknown_pair_fails_cleanly() {
        let tool = TechnicalIndicatorTool::new(Arc::new(MockMarketClient::new()));
        let result = tool.execute(&call("NOTREAL 1h")).await.unwrap();

        assert!(!result.success);
        assert!(result.output.contains("NOTREALUSDT"));
    }
}
