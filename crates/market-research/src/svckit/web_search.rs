//! Web Search Tool
//!
//! News and outside context via the DuckDuckGo Instant Answer API - free and
//! keyless, which keeps the demo runnable without configuration.

use async_trait::async_trait;
use serde::Deserialize;

use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};
use agent_core::Result as CoreResult;

const DEFAULT_SEARCH_BASE: &str = "https://api.duckduckgo.com";
const MAX_TOPICS: usize = 5;

/// Web search tool for news and background context
pub struct WebSearchTool {
    http: reqwest::Client,
    base_url: String,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSearchTool {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: DEFAULT_SEARCH_BASE.into(),
        }
    }

    /// Override the endpoint (for tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,

    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,

    #[serde(rename = "AbstractSource", default)]
    abstract_source: String,

    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: Option<String>,

    #[serde(rename = "FirstURL", default)]
    first_url: Option<String>,
}

struct SearchHit {
    title: String,
    url: String,
    snippet: String,
}

/// Topic text usually reads "Title - Description"
fn title_from_text(text: &str) -> String {
    text.split(" - ").next().unwrap_or("Result").to_string()
}

fn format_hits(hits: &[SearchHit], query: &str) -> String {
    let mut out = format!("Search results for \"{}\":\n\n", query);

    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("[{}] {}\n", i + 1, hit.title));
        if !hit.url.is_empty() {
            out.push_str(&format!("URL: {}\n", hit.url));
        }
        out.push_str(&format!("{}\n\n", hit.snippet));
    }

    out.push_str(&format!("Found {} results.", hits.len()));
    out
}

#[async_trait]
impl Tool for WebSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search".into(),
            description: "Search the web for news or background context. Use only when market data tools cannot answer (e.g. regulatory news, project updates).".into(),
            parameters: vec![ParameterSchema::required_string(
                "query",
                "The search query",
            )],
            category: Some("research".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let query = call.str_arg("query").unwrap_or("").trim().to_string();
        if query.is_empty() {
            return Ok(ToolResult::failure("search", "Query cannot be empty"));
        }

        let response = match self
            .http
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                return Ok(ToolResult::failure(
                    "search",
                    format!("Search request failed: {}", e),
                ));
            }
        };

        if !response.status().is_success() {
            return Ok(ToolResult::failure(
                "search",
                format!("Search API error: {}", response.status()),
            ));
        }

        let answer: InstantAnswer = match response.json().await {
            Ok(answer) => answer,
            Err(e) => {
                return Ok(ToolResult::failure(
                    "search",
                    format!("Could not parse search response: {}", e),
                ));
            }
        };

        let mut hits = Vec::new();

        if !answer.abstract_text.is_empty() {
            hits.push(SearchHit {
                title: if answer.abstract_source.is_empty() {
                    "Summary".into()
                } else {
                    answer.abstract_source
                },
                url: answer.abstract_url,
                snippet: answer.abstract_text,
            });
        }

        for topic in answer.related_topics.iter().take(MAX_TOPICS) {
            if let (Some(text), Some(url)) = (&topic.text, &topic.first_url) {
                if !text.is_empty() {
                    hits.push(SearchHit {
                        title: title_from_text(text),
                        url: url.clone(),
                        snippet: text.clone(),
                    });
                }
            }
        }

        if hits.is_empty() {
            return Ok(ToolResult::success(
                "search",
                format!("No results found for \"{}\". Try a different query.", query),
            ));
        }

        Ok(ToolResult::success("search", format_hits(&hits, &query)))
    }
}
