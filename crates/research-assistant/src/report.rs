//! Report Composer
//!
//! Turns gathered observations into the final analyst report with a single
//! dedicated LLM call. The prompt carries the analysis rules, the knowledge
//! corpus, the user's profile and recalled memory, and a recap of the
//! previous prediction so repeat visitors can check the track record.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::message::truncate_chars;
use agent_core::provider::{CompletionStream, GenerationOptions};
use agent_core::reasoning::{Observation, ReportComposer};
use agent_core::{Conversation, LlmProvider, Message, Result, Role};

use crate::knowledge::KnowledgeBase;
use crate::memory::NoteStore;
use crate::profile::UserProfileStore;

const PREVIOUS_PREDICTION_MAX_CHARS: usize = 600;
const RECALL_LIMIT: usize = 5;

/// Markers that identify an assistant message as an earlier analysis
const PREDICTION_MARKERS: &[&str] = &[
    "confidence",
    "conclusion",
    "bias",
    "support",
    "resistance",
    "short-term",
    "swing",
    "accumulate",
    "reduce",
    "target",
];

const ANALYSIS_RULES: &str = "## Analysis rules (mandatory)
1. Cross-validate: do not just list data - relate indicators to each other \
(e.g. RSI oversold + extreme fear + price at the lower Bollinger band = a \
strong washout signal).
2. Present both sides: list bull and bear arguments, never a one-sided case.
3. State confidence: give the conclusion a confidence percentage (e.g. \
\"leaning toward a bounce, confidence 65%\").
4. Cite concrete numbers: write RSI=28.5, not \"RSI is low\", so every claim \
is checkable.
5. Attribute sources: tag key data points as markdown links [source](url) \
where a URL is available.
6. Use history: if historical cases are provided, reference the one or two \
closest analogues briefly; if a previous prediction recap is provided, \
remind the user to check it against what actually happened.";

const FIXED_STRUCTURE: &str = "## Report structure
1. **Conclusion**: one or two sentences with the directional call and a \
confidence percentage.
2. **1. Price position**: current quote and 24h move, citing the price data.
3. **2. Technical picture**: RSI / MACD / Bollinger / EMA / support and \
resistance with the exact numbers and what they imply.
4. **3. Sentiment & capital flow**: the fear/greed reading plus funding, \
open interest, and long/short positioning.
5. **4. Bull vs bear**: a table | Side | Argument | Weight | with two or \
three arguments each way.
6. **5. Action plan**: a table | Strategy | Key level | Notes | covering \
short-term and longer-horizon approaches.
7. Close with one engaging question back to the user.";

const ADAPTIVE_STRUCTURE: &str = "## Answer shape
1. Lead with the conclusion or summary (one or two sentences plus a \
confidence percentage).
2. Organize the body under 2-4 short headings chosen to fit the question.
3. Include one bull-versus-bear contrast, as its own section or woven in.
4. Cite the exact numbers you were given.
5. Close with one engaging question back to the user.";

/// Report layout variants
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReportLayout {
    /// Fixed five-section research report
    Fixed,
    /// Question-led layout
    #[default]
    Adaptive,
}

impl ReportLayout {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "fixed" => Self::Fixed,
            _ => Self::Adaptive,
        }
    }
}

/// Composer producing the analyst report from observations
pub struct AnalystReportComposer {
    provider: Arc<dyn LlmProvider>,
    generation: GenerationOptions,
    layout: ReportLayout,
    knowledge: KnowledgeBase,
    notes: Arc<NoteStore>,
    profiles: Arc<UserProfileStore>,
    user_id: String,
}

impl AnalystReportComposer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        user_id: impl Into<String>,
        knowledge: KnowledgeBase,
        notes: Arc<NoteStore>,
        profiles: Arc<UserProfileStore>,
    ) -> Self {
        Self {
            provider,
            generation: GenerationOptions::default(),
            layout: ReportLayout::default(),
            knowledge,
            notes,
            profiles,
            user_id: user_id.into(),
        }
    }

    pub fn with_layout(mut self, layout: ReportLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_generation(mut self, generation: GenerationOptions) -> Self {
        self.generation = generation;
        self
    }

    /// Latest assistant message that reads like an earlier analysis
    fn previous_prediction(conversation: &Conversation) -> Option<String> {
        conversation
            .messages()
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant && !m.content.trim().is_empty())
            .find(|m| {
                let lower = m.content.to_lowercase();
                PREDICTION_MARKERS.iter().any(|marker| lower.contains(marker))
            })
            .map(|m| truncate_chars(m.content.trim(), PREVIOUS_PREDICTION_MAX_CHARS))
    }

    fn build_prompt(
        &self,
        question: &str,
        observations: &[Observation],
        conversation: &Conversation,
    ) -> String {
        let structure = match self.layout {
            ReportLayout::Fixed => FIXED_STRUCTURE,
            ReportLayout::Adaptive => ADAPTIVE_STRUCTURE,
        };

        let mut prompt = String::from(
            "You are a professional cryptocurrency analyst. Write the final \
answer from the collected data below.\n\n",
        );
        prompt.push_str(ANALYSIS_RULES);
        prompt.push_str("\n\n");
        prompt.push_str(structure);
        prompt.push_str("\n\n");

        if let Some(methodology) = self.knowledge.methodology() {
            prompt.push_str("## Indicator methodology (interpret readings against this framework)\n");
            prompt.push_str(&methodology);
            prompt.push_str("\n\n");
        }

        if let Some(cases) = self.knowledge.history_cases() {
            prompt.push_str(
                "## Historical analogues (pick the one or two closest to current conditions)\n",
            );
            prompt.push_str(&cases);
            prompt.push_str("\n\n");
        }

        if let Some(prediction) = Self::previous_prediction(conversation) {
            prompt.push_str("## Previous prediction recap\n");
            prompt.push_str(
                "Our last analysis concluded as below. Mention it briefly and invite the user \
to compare it with what the market actually did.\n---\n",
            );
            prompt.push_str(&prediction);
            prompt.push_str("\n---\n\n");
        }

        match self.notes.recall(&self.user_id, question, RECALL_LIMIT) {
            Ok(notes) if !notes.is_empty() => {
                prompt.push_str("## User context (from memory)\n");
                for note in &notes {
                    prompt.push_str(&format!("- {}\n", note.text));
                }
                prompt.push('\n');
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "Memory recall failed"),
        }

        match self.profiles.get(&self.user_id) {
            Ok(Some(profile)) => {
                let summary = profile.summary();
                if !summary.is_empty() {
                    prompt.push_str("## User profile (research preferences)\n");
                    prompt.push_str(&summary);
                    prompt.push_str("\n\n");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "Profile load failed"),
        }

        prompt.push_str("## Recent conversation\n");
        prompt.push_str(&conversation.recent_dialogue(3, 800));
        prompt.push_str("\n\n");

        let date = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC");
        prompt.push_str(&format!(
            "## Task\nCurrent date: {}\nUser question: {}\n\n",
            date, question
        ));

        prompt.push_str("## Collected data\n");
        if observations.is_empty() {
            prompt.push_str("(no tool observations were collected)\n");
        } else {
            for observation in observations {
                prompt.push_str(&observation.render());
                prompt.push_str("\n\n");
            }
        }

        prompt.push_str(
            "\nWrite the complete answer now (only the answer - no tool calls, no meta commentary):",
        );

        prompt
    }

    /// Streaming variant of `compose` over the same prompt
    pub async fn compose_stream(
        &self,
        question: &str,
        observations: &[Observation],
        conversation: &Conversation,
    ) -> Result<CompletionStream> {
        let prompt = self.build_prompt(question, observations, conversation);
        self.provider
            .complete_stream(&[Message::user(prompt)], &self.generation)
            .await
    }
}

#[async_trait]
impl ReportComposer for AnalystReportComposer {
    async fn compose(
        &self,
        question: &str,
        observations: &[Observation],
        conversation: &Conversation,
    ) -> Result<String> {
        let prompt = self.build_prompt(question, observations, conversation);

        let completion = self
            .provider
            .complete(&[Message::user(prompt)], &self.generation)
            .await?;

        let report = completion.content.trim().to_string();
        if report.is_empty() {
            return Ok("Sorry, the report could not be generated. Please try again.".into());
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::provider::{Completion, ModelInfo, ProviderInfo};
    use agent_core::AgentError;
    use std::sync::Mutex;

    /// Provider that records the prompt it was given and echoes a canned reply
    struct CapturingProvider {
        last_prompt: Mutex<String>,
        reply: String,
    }

    impl CapturingProvider {
        fn new(reply: &str) -> Self {
            Self {
                last_prompt: Mutex::new(String::new()),
                reply: reply.into(),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for CapturingProvider {
        async fn info(&self) -> Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "Capturing".into(),
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
            messages: &[Message],
            _options: &GenerationOptions,
        ) -> Result<Completion> {
            *self.last_prompt.lock().unwrap() = messages[0].content.clone();
            Ok(Completion {
                content: self.reply.clone(),
                model: "test".into(),
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
            Err(AgentError::Provider("no streaming in tests".into()))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(vec![])
        }
    }

    fn composer_with(
        dir: &std::path::Path,
        provider: Arc<CapturingProvider>,
        layout: ReportLayout,
    ) -> AnalystReportComposer {
        AnalystReportComposer::new(
            provider,
            "anon_report_test",
            KnowledgeBase::new(dir.join("missing-knowledge")),
            Arc::new(NoteStore::new(dir.join("notes")).unwrap()),
            Arc::new(UserProfileStore::new(dir.join("profiles")).unwrap()),
        )
        .with_layout(layout)
    }

    fn observation(output: &str) -> Observation {
        Observation {
            tool: "market_snapshot".into(),
            input: "input=BTC 1h".into(),
            output: output.into(),
            success: true,
        }
    }

    #[tokio::test]
    async fn test_prompt_carries_rules_question_and_observations() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(CapturingProvider::new("The report."));
        let composer = composer_with(dir.path(), provider.clone(), ReportLayout::Fixed);

        let conversation = Conversation::new();
        let obs = [observation("RSI (14): 28.5 - oversold")];
        let report = composer
            .compose("Analyze BTC short-term", &obs, &conversation)
            .await
            .unwrap();

        assert_eq!(report, "The report.");

        let prompt = provider.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("Analysis rules"));
        assert!(prompt.contains("Report structure"));
        assert!(prompt.contains("Analyze BTC short-term"));
        assert!(prompt.contains("RSI (14): 28.5"));
    }

    #[tokio::test]
    async fn test_adaptive_layout_swaps_structure_section() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(CapturingProvider::new("ok"));
        let composer = composer_with(dir.path(), provider.clone(), ReportLayout::Adaptive);

        composer
            .compose("q", &[], &Conversation::new())
            .await
            .unwrap();

        let prompt = provider.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("Answer shape"));
        assert!(!prompt.contains("Report structure"));
        assert!(prompt.contains("(no tool observations were collected)"));
    }

    #[tokio::test]
    async fn test_previous_prediction_recap_included() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(CapturingProvider::new("ok"));
        let composer = composer_with(dir.path(), provider.clone(), ReportLayout::Fixed);

        let mut conversation = Conversation::new();
        conversation.push(Message::user("Analyze BTC"));
        conversation.push(Message::assistant(
            "Conclusion: leaning bullish above support, confidence 60%",
        ));

        composer
            .compose("And now?", &[], &conversation)
            .await
            .unwrap();

        let prompt = provider.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("Previous prediction recap"));
        assert!(prompt.contains("confidence 60%"));
    }

    #[tokio::test]
    async fn test_small_talk_history_is_not_a_prediction() {
        let mut conversation = Conversation::new();
        conversation.push(Message::assistant("Hello! How can I help?"));
        assert!(AnalystReportComposer::previous_prediction(&conversation).is_none());
    }

    #[tokio::test]
    async fn test_empty_completion_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(CapturingProvider::new("   "));
        let composer = composer_with(dir.path(), provider, ReportLayout::Fixed);

        let report = composer
            .compose("q", &[], &Conversation::new())
            .await
            .unwrap();
        assert!(report.contains("could not be generated"));
    }

    #[test]
    fn test_layout_parse() {
        assert_eq!(ReportLayout::parse("fixed"), ReportLayout::Fixed);
        assert_eq!(ReportLayout::parse("adaptive"), ReportLayout::Adaptive);
        assert_eq!(ReportLayout::parse("whatever"), ReportLayout::Adaptive);
    }
}
