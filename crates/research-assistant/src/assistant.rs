//! Research Assistant Assembly
//!
//! Wires the provider, tool registry, report composer, memory, profiles,
//! cache, and intent gate into one front door: `respond` for request/reply
//! and `respond_stream` for streaming the report phase.

use std::sync::Arc;

use futures::StreamExt;

use agent_core::provider::{CompletionStream, GenerationOptions, StreamChunk};
use agent_core::reasoning::ReportComposer;
use agent_core::session::anonymous_user_id;
use agent_core::tool::CalculatorTool;
use agent_core::{Agent, AgentBuilder, Conversation, LlmProvider, Message, Result, ToolRegistry};
use market_research::tools::{
    FearGreedTool, FuturesDataTool, MarketSnapshotTool, PriceLookupTool, TechnicalIndicatorTool,
    WebSearchTool,
};
use market_research::MarketDataClient;

use crate::cache::ResponseCache;
use crate::config::AssistantConfig;
use crate::intent;
use crate::knowledge::KnowledgeBase;
use crate::memory::{MemoryTool, NoteStore};
use crate::profile::UserProfileStore;
use crate::report::AnalystReportComposer;

/// Gather-phase system prompt for the crypto research domain
const GATHER_PROMPT: &str = r#"You are the information-gathering stage of a crypto research assistant.
Collect the market data the user's question needs, then finish; a separate
stage writes the report from your observations.

Strategy:
1. For a single symbol, call `market_snapshot` first - it returns price,
   technicals, sentiment, and futures positioning in one shot and usually
   makes other calls unnecessary.
2. For several symbols or a narrow question, use `crypto_price`,
   `technical`, `fear_greed`, or `futures_data` directly.
3. Use `search` only when news or outside context matters (at most once).
4. Use `memory` when the user shares preferences or asks to be remembered,
   or to recall earlier context.
Two or three tool calls are usually enough. Follow-ups like "and on the
hourly?" refer to the recent conversation below.

When you have enough data, emit:

```tool
{"tool": "finish", "arguments": {"summary": "done"}}
```

Never write the analysis yourself.

Current date: {current_date}

## Recent conversation
{recent_dialogue}"#;

/// The assembled crypto research assistant
pub struct ResearchAssistant {
    agent: Agent,
    composer: Arc<AnalystReportComposer>,
    cache: ResponseCache,
    user_id: String,
    config: AssistantConfig,
}

impl ResearchAssistant {
    /// Build the assistant: anonymous identity, stores, tools, composer
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        market: Arc<dyn MarketDataClient>,
        config: AssistantConfig,
    ) -> Result<Self> {
        let user_id = anonymous_user_id(config.persist_session, &config.data_dir);
        tracing::info!(user_id = %user_id, "Assistant identity resolved");

        let notes = Arc::new(NoteStore::new(config.data_dir.join("notes"))?);
        let profiles = Arc::new(UserProfileStore::new(config.data_dir.join("profiles"))?);
        let knowledge = KnowledgeBase::new(&config.knowledge_dir);

        let generation = GenerationOptions {
            model: config.model.clone(),
            ..Default::default()
        };

        let composer = Arc::new(
            AnalystReportComposer::new(
                provider.clone(),
                user_id.clone(),
                knowledge,
                notes.clone(),
                profiles.clone(),
            )
            .with_layout(config.report_layout)
            .with_generation(generation),
        );

        let mut tools = ToolRegistry::new();
        tools.register(MarketSnapshotTool::new(market.clone()));
        tools.register(PriceLookupTool::new(market.clone()));
        tools.register(TechnicalIndicatorTool::new(market.clone()));
        tools.register(FearGreedTool::new(market.clone()));
        tools.register(FuturesDataTool::new(market));
        tools.register(WebSearchTool::new());
        tools.register(CalculatorTool);
        tools.register(MemoryTool::new(notes, profiles, user_id.clone()));

        let agent = AgentBuilder::new()
            .provider(provider)
            .tools(tools)
            .composer(composer.clone() as Arc<dyn ReportComposer>)
            .system_prompt(GATHER_PROMPT)
            .model(config.model.clone())
            .max_steps(config.max_steps)
            .build()?;

        Ok(Self {
            agent,
            composer,
            cache: ResponseCache::new(config.cache_ttl),
            user_id,
            config,
        })
    }

    /// The anonymous identity this assistant answers for
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Clickable example prompts
    pub fn examples(&self) -> &[String] {
        &self.config.examples
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Answer a question, recording the exchange in `conversation`.
    ///
    /// Order matters: the intent gate runs first (no tokens spent on
    /// off-topic questions), then the cache, then the gather/compose loop.
    pub async fn respond(&self, conversation: &mut Conversation, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Ok("Please enter a question.".into());
        }

        let recent_dialogue = conversation.recent_dialogue(3, 800);

        if let Some(rejection) = intent::screen(question, &recent_dialogue) {
            tracing::debug!("Question rejected by intent gate");
            conversation.push(Message::user(question));
            conversation.push(Message::assistant(&rejection));
            return Ok(rejection);
        }

        if let Some(cached) = self.cache.get(&self.user_id, question) {
            tracing::debug!("Answering from response cache");
            conversation.push(Message::user(question));
            conversation.push(Message::assistant(&cached));
            return Ok(cached);
        }

        let answer = self.agent.research(conversation, question).await?;
        self.cache.put(&self.user_id, question, &answer);

        Ok(answer)
    }

    /// Streaming variant: gather synchronously, then stream the report.
    /// The exchange is not recorded or cached; callers that need history
    /// should collect the stream and append it themselves.
    pub async fn respond_stream(
        &self,
        conversation: &Conversation,
        question: &str,
    ) -> Result<CompletionStream> {
        let question = question.trim().to_string();
        let recent_dialogue = conversation.recent_dialogue(3, 800);

        if question.is_empty() {
            return Ok(single_chunk("Please enter a question."));
        }

        if let Some(rejection) = intent::screen(&question, &recent_dialogue) {
            return Ok(single_chunk(&rejection));
        }

        let outcome = self.agent.gather(&question, &recent_dialogue).await?;
        self.composer
            .compose_stream(&question, &outcome.observations, conversation)
            .await
    }
}

/// A one-chunk stream carrying prewritten text
fn single_chunk(text: &str) -> CompletionStream {
    let chunk = StreamChunk {
        delta: text.to_string(),
        done: true,
        usage: None,
    };
    futures::stream::iter(vec![Ok(chunk)]).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::provider::{Completion, ModelInfo, ProviderInfo};
    use agent_core::AgentError;
    use async_trait::async_trait;
    use market_research::MockMarketClient;
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

    const SNAPSHOT_CALL: &str =
        "```tool\n{\"tool\": \"market_snapshot\", \"arguments\": {\"input\": \"BTC 1h\"}}\n```";
    const FINISH_CALL: &str =
        "```tool\n{\"tool\": \"finish\", \"arguments\": {\"summary\": \"done\"}}\n```";
    const REPORT: &str = "Leaning toward a bounce, confidence 60%.";

    fn assistant_with(dir: &std::path::Path, responses: &[&str]) -> ResearchAssistant {
        let config = AssistantConfig {
            data_dir: dir.join("data"),
            knowledge_dir: dir.join("no-knowledge"),
            persist_session: true,
            ..Default::default()
        };

        ResearchAssistant::new(
            Arc::new(ScriptedProvider::new(responses)),
            Arc::new(MockMarketClient::new()),
            config,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_full_flow_gather_then_report() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = assistant_with(dir.path(), &[SNAPSHOT_CALL, FINISH_CALL, REPORT]);

        let mut conversation = Conversation::new();
        let answer = assistant
            .respond(&mut conversation, "Analyze BTC short-term")
            .await
            .unwrap();

        assert_eq!(answer, REPORT);
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_repeat_question_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        // Only one full script; the second ask must not touch the provider
        let assistant = assistant_with(dir.path(), &[SNAPSHOT_CALL, FINISH_CALL, REPORT]);

        let mut conversation = Conversation::new();
        assistant
            .respond(&mut conversation, "Analyze BTC short-term")
            .await
            .unwrap();

        let cached = assistant
            .respond(&mut conversation, "analyze btc  short-term")
            .await
            .unwrap();

        assert_eq!(cached, REPORT);
        assert_eq!(conversation.len(), 4);
    }

    #[tokio::test]
    async fn test_off_topic_rejected_without_provider_calls() {
        let dir = tempfile::tempdir().unwrap();
        // Empty script: any provider call would error
        let assistant = assistant_with(dir.path(), &[]);

        let mut conversation = Conversation::new();
        let answer = assistant
            .respond(&mut conversation, "Recommend a good novel")
            .await
            .unwrap();

        assert!(answer.contains("crypto research assistant"));
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_question() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = assistant_with(dir.path(), &[]);

        let mut conversation = Conversation::new();
        let answer = assistant.respond(&mut conversation, "   ").await.unwrap();

        assert_eq!(answer, "Please enter a question.");
        assert!(conversation.is_empty());
    }

    #[tokio::test]
    async fn test_stream_rejection_is_single_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = assistant_with(dir.path(), &[]);

        let conversation = Conversation::new();
        let mut stream = assistant
            .respond_stream(&conversation, "Recommend a good novel")
            .await
            .unwrap();

        let chunk = stream.next().await.unwrap().unwrap();
        assert!(chunk.done);
        assert!(chunk.delta.contains("crypto research assistant"));
        assert!(stream.next().await.is_none());
    }
}
