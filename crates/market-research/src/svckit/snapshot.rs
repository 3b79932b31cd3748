//! Market Snapshot Tool
//!
//! The preferred first call for single-symbol questions: price, technicals,
//! sentiment, and futures positioning fetched concurrently and stitched into
//! one observation. Saves the gather loop three or four round trips.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};
use agent_core::Result as CoreResult;

use super::{FearGreedTool, FuturesDataTool, PriceLookupTool, TechnicalIndicatorTool};
use crate::market::MarketDataClient;
use crate::symbols::parse_symbol_query;

/// One-shot combined market snapshot
pub struct MarketSnapshotTool {
    price: PriceLookupTool,
    technical: TechnicalIndicatorTool,
    sentiment: FearGreedTool,
    futures: FuturesDataTool,
}

impl MarketSnapshotTool {
    pub fn new(market: Arc<dyn MarketDataClient>) -> Self {
        Self {
            price: PriceLookupTool::new(market.clone()),
            technical: TechnicalIndicatorTool::new(market.clone()),
            sentiment: FearGreedTool::new(market.clone()),
            futures: FuturesDataTool::new(market),
        }
    }
}

fn sub_call(name: &str, key: &str, value: String) -> ToolCall {
    let mut arguments = HashMap::new();
    arguments.insert(key.to_string(), serde_json::Value::String(value));
    ToolCall {
        name: name.into(),
        arguments,
        id: None,
    }
}

fn section(label: &str, result: CoreResult<ToolResult>) -> String {
    match result {
        Ok(r) if r.success => r.output,
        Ok(r) => format!("{} unavailable: {}", label, r.output),
        Err(e) => format!("{} unavailable: {}", label, e),
    }
}

#[async_trait]
impl Tool for MarketSnapshotTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "market_snapshot".into(),
            description: "PREFERRED first call for a single symbol: fetches price, technical indicators, fear/greed sentiment, and futures positioning concurrently in one shot. Input like 'BTC 1h' or 'ETH 4h'; interval defaults to 1h.".into(),
            parameters: vec![ParameterSchema::optional_string(
                "input",
                "Symbol plus optional interval (e.g. 'BTC 1h', 'SOL')",
                "BTC 1h",
            )],
            category: Some("market_data".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let input = call.str_arg("input").unwrap_or("BTC 1h");
        let (symbol, interval) = parse_symbol_query(input);

        let price_call = sub_call("crypto_price", "symbols", symbol.clone());
        let technical_call = sub_call("technical", "input", format!("{} {}", symbol, interval));
        let sentiment_call = sub_call("fear_greed", "days", "7".into());
        let futures_call = sub_call("futures_data", "symbol", symbol.clone());

        let (price, technical, sentiment, futures) = tokio::join!(
            self.price.execute(&price_call),
            self.technical.execute(&technical_call),
            self.sentiment.execute(&sentiment_call),
            self.futures.execute(&futures_call),
        );

        let sections = [
            section("Price data", price),
            section("Technical indicators", technical),
            section("Sentiment index", sentiment),
            section("Futures data", futures),
        ];

        Ok(ToolResult::success(
            "market_snapshot",
            sections.join("\n\n---\n\n"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MockMarketClient;

    fn call(input: &str) -> ToolCall {
        sub_call("market_snapshot", "input", input.to_string())
    }

    #[tokio::test]
    async fn test_snapshot_combines_all_sections() {
        let tool = MarketSnapshotTool::new(Arc::new(MockMarketClient::new()));
        let result = tool.execute(&call("BTC 1h")).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("Current prices"));
        assert!(result.output.contains("technicals"));
        assert!(result.output.contains("Fear & Greed"));
        assert!(result.output.contains("perpetual futures data"));
        assert_eq!(result.output.matches("\n\n---\n\n").count(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_degrades_failed_sections() {
        let tool = MarketSnapshotTool::new(Arc::new(MockMarketClient::new()));
        let result = tool.execute(&call("NOTACOIN")).await.unwrap();

        // Unknown symbol: price and technicals degrade, sentiment still works
        assert!(result.success);
        assert!(result.output.contains("unavailable"));
        assert!(result.output.contains("Fear & Greed"));
    }
}
