//! Price Lookup Tool
//!
//! Fetches current spot quotes: price, 24h change, volume, and market cap.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};
use agent_core::Result as CoreResult;

use crate::market::MarketDataClient;
use crate::symbols::resolve_coin_id;

/// Tool for looking up cryptocurrency spot prices
pub struct PriceLookupTool {
    market: Arc<dyn MarketDataClient>,
}

impl PriceLookupTool {
    pub fn new(market: Arc<dyn MarketDataClient>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for PriceLookupTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "crypto_price".into(),
            description: "Get current cryptocurrency spot prices: price, 24h change, 24h volume, and market cap. Accepts names or tickers (BTC, ethereum, SOL).".into(),
            parameters: vec![ParameterSchema::required_string(
                "symbols",
                "Comma-separated list of symbols or names (e.g., 'BTC,ETH,SOL')",
            )],
            category: Some("market_data".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let symbols_str = call.str_arg("symbols").unwrap_or("BTC");

        // Resolve and dedupe, preserving order
        let mut coin_ids: Vec<String> = Vec::new();
        for raw in symbols_str.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let id = resolve_coin_id(raw);
            if !coin_ids.contains(&id) {
                coin_ids.push(id);
            }
        }

        if coin_ids.is_empty() {
            return Ok(ToolResult::failure(
                "crypto_price",
                "No symbols given. Try 'BTC' or 'BTC,ETH'.",
            ));
        }

        let quotes = match self.market.quotes(&coin_ids).await {
            Ok(quotes) => quotes,
            Err(e) => {
                return Ok(ToolResult::failure(
                    "crypto_price",
                    format!("Market data unavailable: {}", e),
                ));
            }
        };

        if quotes.is_empty() {
            return Ok(ToolResult::failure(
                "crypto_price",
                format!("No quotes found for '{}'. Check the names.", symbols_str),
            ));
        }

        let found: Vec<&str> = quotes.iter().map(|q| q.coin_id.as_str()).collect();

        let mut output = String::from("Current prices (source: CoinGecko):\n");
        for quote in &quotes {
            let volume = quote
                .volume_24h
                .map_or_else(|| "n/a".into(), |v| format!("${:.0}", v));
            let cap = quote
                .market_cap
                .map_or_else(|| "n/a".into(), |v| format!("${:.0}", v));

            output.push_str(&format!(
                "  {}: ${:.2} ({:+.2}% 24h) | 24h volume {} | market cap {}\n",
                quote.symbol, quote.price_usd, quote.change_24h_percent, volume, cap
            ));
        }

        let missing: Vec<&str> = coin_ids
            .iter()
            .map(String::as_str)
            .filter(|id| !found.contains(id))
            .collect();

        if !missing.is_empty() {
            output.push_str("\nUnavailable:\n");
            for id in missing {
                output.push_str(&format!("  {}: not found\n", id));
            }
        }

        Ok(ToolResult::success("crypto_price", output.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MockMarketClient;
    use std::collections::HashMap;

    fn call(symbols: &str) -> ToolCall {
        let mut arguments = HashMap::new();
        arguments.insert("symbols".into(), serde_json::json!(symbols));
        ToolCall {
            name: "crypto_price".into(),
            arguments,
            id: None,
        }
    }

    #[tokio::test]
    async fn test_price_lookup_formats_quotes() {
        let tool = PriceLookupTool::new(Arc::new(MockMarketClient::new()));
        let result = tool.execute(&call("BTC, eth")).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("BITCOIN"));
        assert!(result.output.contains("ETHEREUM"));
        assert!(result.output.contains("24h volume"));
    }

    #[tokio::test]
    async fn test_price_lookup_lists_unknown_symbols() {
        let tool = PriceLookupTool::new(Arc::new(MockMarketClient::new()));
        let result = tool.execute(&call("BTC,notacoin")).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("Unavailable"));
        assert!(result.output.contains("notacoin"));
    }

    #[tokio::test]
    async fn test_price_lookup_all_unknown_is_failure() {
        let tool = PriceLookupTool::new(Arc::new(MockMarketClient::new()));
        let result = tool.execute(&call("notacoin")).await.unwrap();

        assert!(!result.success);
    }
}
