//! Futures Data Tool
//!
//! Funding rates, open interest, and the long/short account ratio - the
//! leverage side of the market. Each section degrades independently when its
//! upstream endpoint fails.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};
use agent_core::Result as CoreResult;

use crate::market::MarketDataClient;
use crate::symbols::{pair_base, parse_symbol_query, resolve_pair};

const HISTORY_POINTS: u16 = 5;

/// Tool for perpetual-futures positioning data
pub struct FuturesDataTool {
    market: Arc<dyn MarketDataClient>,
}

impl FuturesDataTool {
    pub fn new(market: Arc<dyn MarketDataClient>) -> Self {
        Self { market }
    }

    async fn funding_section(&self, pair: &str) -> String {
        match self.market.funding_rates(pair, HISTORY_POINTS).await {
            Ok(rates) if !rates.is_empty() => {
                let mut out = format!("Funding rate (last {} settlements):\n", rates.len());
                for rate in &rates {
                    out.push_str(&format!(
                        "  {}: {:+.4}%\n",
                        rate.time.format("%m-%d %H:%M"),
                        rate.percent()
                    ));
                }

                let latest = &rates[rates.len() - 1];
                let read = if latest.rate > dec!(0.0005) {
                    "Latest funding is elevated - longs pay shorts, so the long side looks crowded."
                } else if latest.rate < dec!(-0.0005) {
                    "Latest funding is negative - shorts pay longs; a squeeze bounce is possible."
                } else {
                    "Funding sits in the normal band; leverage positioning looks balanced."
                };
                out.push_str(read);
                out
            }
            Ok(_) => "Funding rate: no data returned".into(),
            Err(e) => format!("Funding rate unavailable: {}", e),
        }
    }

    async fn open_interest_section(&self, pair: &str) -> String {
        match self.market.open_interest(pair).await {
            Ok(oi) => {
                let mut out = format!(
                    "Open interest: {:.2} {}",
                    oi.contracts,
                    pair_base(pair)
                );
                if let Some(value) = oi.value_usd {
                    out.push_str(&format!(" (~${:.0})", value));
                }
                out
            }
            Err(e) => format!("Open interest unavailable: {}", e),
        }
    }

    async fn long_short_section(&self, pair: &str) -> String {
        match self.market.long_short_ratio(pair, HISTORY_POINTS).await {
            Ok(entries) if !entries.is_empty() => {
                let mut out = format!("Long/short accounts (last {} hours):\n", entries.len());
                for entry in &entries {
                    out.push_str(&format!(
                        "  {}: long {:.1}% | short {:.1}% | ratio {:.2}\n",
                        entry.time.format("%m-%d %H:%M"),
                        entry.long_percent,
                        entry.short_percent,
                        entry.ratio
                    ));
                }

                let latest = &entries[entries.len() - 1];
                let read = if latest.ratio > dec!(2.0) {
                    "Long accounts are crowded - watch for cascading long liquidations."
                } else if latest.ratio < dec!(0.8) {
                    "Short accounts dominate - short covering can fuel bounces."
                } else {
                    "Long/short ratio sits in the normal band."
                };
                out.push_str(read);
                out
            }
            Ok(_) => "Long/short ratio: no data returned".into(),
            Err(e) => format!("Long/short ratio unavailable: {}", e),
        }
    }
}

#[async_trait]
impl Tool for FuturesDataTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "futures_data".into(),
            description: "Get perpetual futures positioning for a symbol: funding rate history, open interest, and the long/short account ratio. High funding means crowded longs; negative funding means crowded shorts.".into(),
            parameters: vec![ParameterSchema::optional_string(
                "symbol",
                "Symbol or name (e.g. 'BTC', 'ETH')",
                "BTC",
            )],
            category: Some("market_data".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let input = call.str_arg("symbol").unwrap_or("BTC");
        let (symbol, _) = parse_symbol_query(input);
        let pair = resolve_pair(&symbol);

        let (funding, open_interest, long_short) = tokio::join!(
            self.funding_section(&pair),
            self.open_interest_section(&pair),
            self.long_short_section(&pair),
        );

        let output = format!(
            "{} perpetual futures data:\n\n{}\n\n{}\n\n{}",
            pair, funding, open_interest, long_short
        );

        Ok(ToolResult::success("futures_data", output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MockMarketClient;
    use std::collections::HashMap;

    fn call(symbol: &str) -> ToolCall {
        let mut arguments = HashMap::new();
        arguments.insert("symbol".into(), serde_json::json!(symbol));
        ToolCall {
            name: "futures_data".into(),
            arguments,
            id: None,
        }
    }

    #[tokio::test]
    async fn test_futures_data_sections() {
        let tool = FuturesDataTool::new(Arc::new(MockMarketClient::new()));
        let result = tool.execute(&call("BTC")).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("BTCUSDT perpetual futures data"));
        assert!(result.output.contains("Funding rate"));
        assert!(result.output.contains("Open interest"));
        assert!(result.output.contains("Long/short accounts"));
        assert!(result.output.contains("normal band"));
    }

    #[tokio::test]
    async fn test_crowded_longs_interpretation() {
        let client = MockMarketClient::new()
            .with_funding_rate(dec!(0.001))
            .with_long_short(dec!(2.5));
        let tool = FuturesDataTool::new(Arc::new(client));
        let result = tool.execute(&call("BTC")).await.unwrap();

        assert!(result.output.contains("long side looks crowded"));
        assert!(result.output.contains("cascading long liquidations"));
    }

    #[tokio::test]
    async fn test_unknown_pair_degrades_per_section() {
        let tool = FuturesDataTool::new(Arc::new(MockMarketClient::new()));
        let result = tool.execute(&call("NOTREAL")).await.unwrap();

        // Tool still succeeds; each section reports its own failure
        assert!(result.success);
        assert!(result.output.contains("Funding rate unavailable"));
        assert!(result.output.contains("Open interest unavailable"));
    }
}
