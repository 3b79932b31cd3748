//! Fear & Greed Index Tool

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};
use agent_core::Result as CoreResult;

use crate::market::MarketDataClient;

const DEFAULT_DAYS: u8 = 7;
const MAX_DAYS: u8 = 30;

/// Tool for the crypto fear/greed sentiment index
pub struct FearGreedTool {
    market: Arc<dyn MarketDataClient>,
}

impl FearGreedTool {
    pub fn new(market: Arc<dyn MarketDataClient>) -> Self {
        Self { market }
    }

    /// Parse the day count from a string or number argument, clamped to 1..=30
    fn parse_days(call: &ToolCall) -> u8 {
        let raw = call.arguments.get("days");

        let days = match raw {
            Some(v) => v
                .as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
                .unwrap_or(i64::from(DEFAULT_DAYS)),
            None => i64::from(DEFAULT_DAYS),
        };

        days.clamp(1, i64::from(MAX_DAYS)) as u8
    }
}

#[async_trait]
impl Tool for FearGreedTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "fear_greed".into(),
            description: "Get the crypto Fear & Greed index (0-100: 0-24 extreme fear, 25-49 fear, 50 neutral, 51-74 greed, 75-100 extreme greed) with up to 30 days of history.".into(),
            parameters: vec![ParameterSchema::optional_string(
                "days",
                "Days of history to fetch (1-30)",
                "7",
            )],
            category: Some("sentiment".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let days = Self::parse_days(call);

        let points = match self.market.fear_greed(days).await {
            Ok(points) => points,
            Err(e) => {
                return Ok(ToolResult::failure(
                    "fear_greed",
                    format!("Fear & Greed index unavailable: {}", e),
                ));
            }
        };

        let Some(latest) = points.first() else {
            return Ok(ToolResult::failure(
                "fear_greed",
                "Fear & Greed index returned no data",
            ));
        };

        let mut out = String::from("Crypto Fear & Greed Index (source: Alternative.me)\n");
        out.push_str(&format!(
            "Current: {} - {}\n",
            latest.value, latest.classification
        ));
        out.push_str(latest.band().interpretation());
        out.push('\n');

        if points.len() > 1 {
            out.push_str(&format!("\nTrend (last {} days):\n", points.len()));
            for point in &points {
                out.push_str(&format!(
                    "  {}: {} ({})\n",
                    point.time.format("%m-%d"),
                    point.value,
                    point.classification
                ));
            }
        }

        Ok(ToolResult::success("fear_greed", out.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MockMarketClient;
    use std::collections::HashMap;

    fn call_with_days(days: serde_json::Value) -> ToolCall {
        let mut arguments = HashMap::new();
        arguments.insert("days".into(), days);
        ToolCall {
            name: "fear_greed".into(),
            arguments,
            id: None,
        }
    }

    #[test]
    fn test_parse_days_clamps() {
        assert_eq!(FearGreedTool::parse_days(&call_with_days(serde_json::json!("90"))), 30);
        assert_eq!(FearGreedTool::parse_days(&call_with_days(serde_json::json!(0))), 1);
        assert_eq!(FearGreedTool::parse_days(&call_with_days(serde_json::json!("14"))), 14);
        assert_eq!(
            FearGreedTool::parse_days(&call_with_days(serde_json::json!("soon"))),
            7
        );
    }

    #[tokio::test]
    async fn test_fear_greed_output() {
        let tool = FearGreedTool::new(Arc::new(MockMarketClient::new().with_fear_greed(20)));
        let result = tool.execute(&call_with_days(serde_json::json!("7"))).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("Current: 20 - Extreme Fear"));
        assert!(result.output.contains("Trend (last 7 days)"));
        assert!(result.output.contains("contrarian"));
    }
}
