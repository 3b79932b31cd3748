//! Research Loop
//!
//! Two-phase research pattern. The GATHER phase runs a tool-calling loop
//! that collects observations; the COMPOSE phase hands those observations to
//! a `ReportComposer` which writes the final answer. The gather model never
//! writes the report itself, so the answer is not squeezed through a tool
//! call and can be arbitrarily long.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Reserved tool name that ends the gather phase
pub const FINISH_TOOL: &str = "finish";

/// One executed tool call and what came back
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Observation {
    /// Tool that was called
    pub tool: String,

    /// Rendered arguments
    pub input: String,

    /// Tool output (or error text)
    pub output: String,

    /// Whether the call succeeded
    pub success: bool,
}

impl Observation {
    /// Render for injection into the compose prompt
    pub fn render(&self) -> String {
        let marker = if self.success { "returned" } else { "failed" };
        format!(
            "Tool {}({}) {}:\n{}",
            self.tool, self.input, marker, self.output
        )
    }
}

/// Result of the gather phase
#[derive(Debug)]
pub struct GatherOutcome {
    /// Observations collected from tool calls
    pub observations: Vec<Observation>,

    /// Text the model closed with (finish summary, or a direct answer when
    /// it never called a tool)
    pub closing: Option<String>,

    /// Steps consumed
    pub steps: usize,
}

/// Composes the final answer from gathered observations.
///
/// Receives the conversation as it stood *before* the current question, so
/// implementations can mine it for earlier predictions.
#[async_trait]
pub trait ReportComposer: Send + Sync {
    async fn compose(
        &self,
        question: &str,
        observations: &[Observation],
        conversation: &Conversation,
    ) -> Result<String>;
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Gather-phase system prompt template. `{current_date}` and
    /// `{recent_dialogue}` are substituted at run time.
    pub system_prompt: String,

    /// Maximum gather steps before the loop is cut off
    pub max_steps: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Whether to append tool descriptions to the system prompt
    pub inject_tool_descriptions: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_GATHER_PROMPT.into(),
            max_steps: 5,
            generation: GenerationOptions::default(),
            inject_tool_descriptions: true,
        }
    }
}

const DEFAULT_GATHER_PROMPT: &str = r#"You are the information-gathering stage of a research assistant.

Collect the data the user's question needs by calling tools. Two or three
calls are usually enough. When you have enough, end the phase with:

```tool
{"tool": "finish", "arguments": {"summary": "done"}}
```

Do not write the final analysis yourself; a separate stage composes it from
your observations. If no tool is relevant, answer directly in plain text.

Current date: {current_date}

## Recent conversation
{recent_dialogue}"#;

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    composer: Option<Arc<dyn ReportComposer>>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            composer: None,
            config,
        }
    }

    /// Attach a report composer (enables the compose phase)
    pub fn with_composer(mut self, composer: Arc<dyn ReportComposer>) -> Self {
        self.composer = Some(composer);
        self
    }

    /// Build the full gather system prompt for this run
    fn build_system_prompt(&self, recent_dialogue: &str) -> String {
        let date = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
        let mut prompt = self
            .config
            .system_prompt
            .replace("{current_date}", &date)
            .replace("{recent_dialogue}", recent_dialogue);

        if self.config.inject_tool_descriptions && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
        }

        prompt
    }

    /// Run the gather phase: a tool-calling loop on a scratch conversation.
    ///
    /// The persistent conversation is not touched; only the question and the
    /// composed answer go into history.
    pub async fn gather(&self, question: &str, recent_dialogue: &str) -> Result<GatherOutcome> {
        let mut scratch = Conversation::with_system_prompt(self.build_system_prompt(recent_dialogue));
        scratch.push(Message::user(question));

        let mut observations = Vec::new();

        for step in 1..=self.config.max_steps {
            if step == self.config.max_steps {
                scratch.push(Message::system(
                    "This is your final step. Emit the finish block now, even if the data is incomplete.",
                ));
            }

            let completion = self
                .provider
                .complete(scratch.messages(), &self.config.generation)
                .await?;

            let content = completion.content;
            scratch.push(Message::assistant(&content));

            let Some(call) = parse_tool_call(&content) else {
                // No tool call: the model answered directly
                return Ok(GatherOutcome {
                    observations,
                    closing: non_empty(content),
                    steps: step,
                });
            };

            if call.name == FINISH_TOOL {
                let closing = call.str_arg("summary").map(str::to_string).and_then(non_empty);
                return Ok(GatherOutcome {
                    observations,
                    closing,
                    steps: step,
                });
            }

            tracing::debug!(tool = %call.name, step, "Executing tool");
            let result = self.execute_tool(&call).await;

            observations.push(Observation {
                tool: result.name.clone(),
                input: render_arguments(&call),
                output: result.output.clone(),
                success: result.success,
            });

            scratch.push(Message::tool(format_tool_result(&result), call.id.clone()));
            scratch.truncate_to_fit();
        }

        if observations.is_empty() {
            Err(AgentError::MaxSteps(self.config.max_steps))
        } else {
            // Out of steps but we have data: compose from what we got
            Ok(GatherOutcome {
                observations,
                closing: None,
                steps: self.config.max_steps,
            })
        }
    }

    /// Answer a question: gather, compose, and record the exchange.
    pub async fn research(&self, conversation: &mut Conversation, question: &str) -> Result<String> {
        let recent_dialogue = conversation.recent_dialogue(3, 800);
        let outcome = self.gather(question, &recent_dialogue).await?;

        let answer = match (&self.composer, outcome.closing) {
            (Some(composer), _) => {
                tracing::debug!(
                    observations = outcome.observations.len(),
                    steps = outcome.steps,
                    "Composing report"
                );
                composer
                    .compose(question, &outcome.observations, conversation)
                    .await?
            }
            (None, Some(closing)) => closing,
            (None, None) => return Err(AgentError::MaxSteps(self.config.max_steps)),
        };

        conversation.push(Message::user(question));
        conversation.push(Message::assistant(&answer));
        conversation.truncate_to_fit();

        Ok(answer)
    }

    /// One-shot convenience: research against a throwaway conversation
    pub async fn ask(&self, question: &str) -> Result<String> {
        let mut conversation = Conversation::new();
        self.research(&mut conversation, question).await
    }

    /// Execute a tool call, converting errors into failed results
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        match self.tools.execute(call).await {
            Ok(mut result) => {
                result.id = call.id.clone();
                result
            }
            Err(e) => ToolResult {
                name: call.name.clone(),
                id: call.id.clone(),
                success: false,
                output: format!("Error: {}", e),
                data: None,
            },
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Render tool arguments as `key=value` pairs, sorted for determinism
fn render_arguments(call: &ToolCall) -> String {
    let mut pairs: Vec<String> = call
        .arguments
        .iter()
        .map(|(k, v)| match v.as_str() {
            Some(s) => format!("{}={}", k, s),
            None => format!("{}={}", k, v),
        })
        .collect();
    pairs.sort();
    pairs.join(", ")
}

/// Format tool result for the scratch conversation
fn format_tool_result(result: &ToolResult) -> String {
    if result.success {
        format!("[Tool '{}' returned]\n{}", result.name, result.output)
    } else {
        format!("[Tool '{}' failed]\n{}", result.name, result.output)
    }
}

/// Parse a tool call from an LLM response
fn parse_tool_call(content: &str) -> Option<ToolCall> {
    // Look for ```tool ... ``` blocks
    let tool_start = "```tool";
    let tool_end = "```";

    if let Some(start_idx) = content.find(tool_start) {
        let after_marker = &content[start_idx + tool_start.len()..];
        if let Some(end_idx) = after_marker.find(tool_end) {
            let json_str = after_marker[..end_idx].trim();

            if let Ok(mut call) = serde_json::from_str::<WireToolCall>(json_str) {
                if call.id.is_none() {
                    call.id = Some(uuid::Uuid::new_v4().to_string());
                }
                return Some(call.into());
            }
        }
    }

    // Fallback: a bare JSON object with a "tool" key
    parse_inline_tool_call(content)
}

fn parse_inline_tool_call(content: &str) -> Option<ToolCall> {
    if !content.contains(r#""tool""#) {
        return None;
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;

    if end <= start {
        return None;
    }

    let json_str = &content[start..=end];
    serde_json::from_str::<WireToolCall>(json_str)
        .ok()
        .map(Into::into)
}

/// Wire shape of a model-emitted call: `{"tool": ..., "arguments": {...}}`
#[derive(Deserialize)]
struct WireToolCall {
    tool: String,
    #[serde(default)]
    arguments: std::collections::HashMap<String, serde_json::Value>,
    #[serde(default)]
    id: Option<String>,
}

impl From<WireToolCall> for ToolCall {
    fn from(w: WireToolCall) -> Self {
        ToolCall {
            name: w.tool,
            arguments: w.arguments,
            id: w.id,
        }
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    composer: Option<Arc<dyn ReportComposer>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            composer: None,
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn composer(mut self, composer: Arc<dyn ReportComposer>) -> Self {
        self.composer = Some(composer);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn max_steps(mut self, max: usize) -> Self {
        self.config.max_steps = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        let mut agent = Agent::new(provider, Arc::new(self.tools), self.config);
        agent.composer = self.composer;
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Completion, CompletionStream, ModelInfo, ProviderInfo};
    use crate::tool::CalculatorTool;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedProvider {
        responses: Mutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn info(&self) -> Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "Scripted".into(),
                version: None,
                models: vec![],
                supports_streaming: false,
                supports_tools: false,
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            options: &GenerationOptions,
        ) -> Result<Completion> {
            let content = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))?;
            Ok(Completion {
                content,
                model: options.model.clone(),
                usage: None,
                truncated: false,
                finish_reason: None,
            })
        }

        async fn complete_stream(
            &self,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> Result<CompletionStream> {
            Err(AgentError::Provider("streaming not scripted".into()))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(vec![])
        }
    }

    struct CountingComposer;

    #[async_trait]
    impl ReportComposer for CountingComposer {
        async fn compose(
            &self,
            question: &str,
            observations: &[Observation],
            _conversation: &Conversation,
        ) -> Result<String> {
            Ok(format!(
                "Report for '{}' from {} observations",
                question,
                observations.len()
            ))
        }
    }

    const CALC_CALL: &str = "Let me work that out.\n```tool\n{\"tool\": \"calculate\", \"arguments\": {\"expression\": \"2 + 2\"}}\n```";
    const FINISH_CALL: &str = "```tool\n{\"tool\": \"finish\", \"arguments\": {\"summary\": \"done\"}}\n```";

    fn scripted_agent(responses: &[&str]) -> Agent {
        AgentBuilder::new()
            .provider(Arc::new(ScriptedProvider::new(responses)))
            .tool(CalculatorTool)
            .max_steps(3)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_gather_collects_observations_until_finish() {
        let agent = scripted_agent(&[CALC_CALL, FINISH_CALL]);

        let outcome = agent.gather("what is 2+2", "(no prior conversation)").await.unwrap();

        assert_eq!(outcome.observations.len(), 1);
        assert_eq!(outcome.observations[0].tool, "calculate");
        assert!(outcome.observations[0].output.contains('4'));
        assert_eq!(outcome.closing.as_deref(), Some("done"));
        assert_eq!(outcome.steps, 2);
    }

    #[tokio::test]
    async fn test_gather_direct_answer_without_tools() {
        let agent = scripted_agent(&["The answer is straightforward."]);

        let outcome = agent.gather("hello", "(no prior conversation)").await.unwrap();

        assert!(outcome.observations.is_empty());
        assert_eq!(outcome.closing.as_deref(), Some("The answer is straightforward."));
    }

    #[tokio::test]
    async fn test_research_hands_off_to_composer() {
        let agent = scripted_agent(&[CALC_CALL, FINISH_CALL])
            .with_composer(Arc::new(CountingComposer));

        let mut conversation = Conversation::new();
        let answer = agent.research(&mut conversation, "what is 2+2").await.unwrap();

        assert_eq!(answer, "Report for 'what is 2+2' from 1 observations");
        // Question and answer recorded, gather scratch excluded
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_step_budget_exhaustion_still_composes() {
        // Model keeps calling tools and never finishes
        let agent = scripted_agent(&[CALC_CALL, CALC_CALL, CALC_CALL])
            .with_composer(Arc::new(CountingComposer));

        let mut conversation = Conversation::new();
        let answer = agent.research(&mut conversation, "loop forever").await.unwrap();

        assert_eq!(answer, "Report for 'loop forever' from 3 observations");
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_failed_observation() {
        let bad_call = "```tool\n{\"tool\": \"nonexistent\", \"arguments\": {}}\n```";
        let agent = scripted_agent(&[bad_call, FINISH_CALL]);

        let outcome = agent.gather("q", "(no prior conversation)").await.unwrap();
        assert_eq!(outcome.observations.len(), 1);
        assert!(!outcome.observations[0].success);
    }

    #[test]
    fn test_parse_inline_tool_call() {
        let content = r#"I'll call {"tool": "calculate", "arguments": {"expression": "1+1"}} now"#;
        let call = parse_tool_call(content).unwrap();
        assert_eq!(call.name, "calculate");
        assert_eq!(call.str_arg("expression"), Some("1+1"));
    }

    #[test]
    fn test_parse_ignores_plain_text() {
        assert!(parse_tool_call("No tools needed here.").is_none());
    }
}
