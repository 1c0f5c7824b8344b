use crate::completion::{AgentRole, CompletionClient};
use crate::context_engine::context_builder::ContextBuilder;
use crate::context_engine::verification::{VerificationOutcome, SENTINEL};
use crate::conversation::ConversationTurn;
use crate::errors::{AssistantError, Result, TimeoutStage};
use crate::knowledge::KnowledgeStore;
use crate::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Substring (lowercased) that routes a question to the deterministic company-name reply.
const COMPANY_NAME_QUERY: &str = "company name";

/// Generate-then-verify pipeline over the knowledge store.
///
/// Created once at startup and shared by every request. Each call to
/// [`answer`](Self::answer) owns its own deadline and conversation turns;
/// nothing mutable is shared between requests.
pub struct AssistantOrchestrator {
    knowledge: Arc<KnowledgeStore>,
    client: Arc<dyn CompletionClient>,
    context_builder: ContextBuilder,
    config: OrchestratorConfig,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Deadline budget shared by the answering and verifying stages.
    pub default_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
        }
    }
}

/// Pipeline states. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    BuildingContext,
    Answering,
    Verifying,
    Parsing,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::BuildingContext => "building_context",
            PipelineStage::Answering => "answering",
            PipelineStage::Verifying => "verifying",
            PipelineStage::Parsing => "parsing",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

/// Per-call transient state.
struct PipelineRun {
    stage: PipelineStage,
    started: Instant,
    deadline: Instant,
}

impl PipelineRun {
    fn start(timeout: Duration) -> Self {
        let started = Instant::now();
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + Duration::from_secs(86_400));
        Self {
            stage: PipelineStage::Idle,
            started,
            deadline,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug!("Pipeline {:?} -> {:?} after {:?}", self.stage, next, self.started.elapsed());
        self.stage = next;
    }

    /// Budget left before the shared deadline, `None` once it has passed.
    fn remaining(&self) -> Option<Duration> {
        self.deadline
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    fn check_deadline(&self, stage: TimeoutStage) -> Result<()> {
        if Instant::now() >= self.deadline {
            warn!(
                "Deadline exceeded during {} stage ({:?} elapsed)",
                stage,
                self.started.elapsed()
            );
            return Err(AssistantError::stage_timeout(stage));
        }
        Ok(())
    }
}

impl AssistantOrchestrator {
    pub fn new(
        knowledge: Arc<KnowledgeStore>,
        client: Arc<dyn CompletionClient>,
        config: OrchestratorConfig,
    ) -> Self {
        info!(
            "Assistant orchestrator initialized (backend: {}, budget: {:?})",
            client.backend_name(),
            config.default_timeout
        );
        Self {
            knowledge,
            client,
            context_builder: ContextBuilder::new(),
            config,
        }
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeStore> {
        &self.knowledge
    }

    pub fn get_config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Answer `question` within the configured default budget.
    pub async fn answer(&self, question: &str) -> Result<String> {
        self.answer_with_timeout(question, self.config.default_timeout).await
    }

    /// Answer `question`, failing once `timeout` has elapsed across both stages.
    pub async fn answer_with_timeout(&self, question: &str, timeout: Duration) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AssistantError::invalid_input("question must not be empty"));
        }

        if question.to_lowercase().contains(COMPANY_NAME_QUERY) {
            info!("Answering company-name question from the knowledge store");
            metrics::inc_outcome("shortcut");
            return Ok(format!("The company name is: {}", self.knowledge.company().name));
        }

        let mut run = PipelineRun::start(timeout);
        let result = self.run_pipeline(&mut run, question).await;
        match &result {
            Ok(_) => run.advance(PipelineStage::Done),
            Err(e) => {
                debug!("Pipeline failed in {:?}: {}", run.stage, e);
                run.advance(PipelineStage::Failed);
            }
        }
        result
    }

    async fn run_pipeline(&self, run: &mut PipelineRun, question: &str) -> Result<String> {
        run.advance(PipelineStage::BuildingContext);
        let context = self.context_builder.render(&self.knowledge);

        run.advance(PipelineStage::Answering);
        run.check_deadline(TimeoutStage::Initial)?;
        let answer_prompt = Self::answerer_prompt(&context, question);
        debug!("Prompt sent to answerer:\n{}", answer_prompt);
        let draft = self
            .call_agent(run, AgentRole::Answerer, answer_prompt, TimeoutStage::Initial)
            .await?;
        debug!("Answerer draft ({} chars): {}", draft.len(), draft);

        run.advance(PipelineStage::Verifying);
        let verify_prompt = Self::verifier_prompt(&context, question, &draft);
        let verdict = self
            .call_agent(run, AgentRole::Verifier, verify_prompt, TimeoutStage::Verification)
            .await?;

        run.advance(PipelineStage::Parsing);
        let outcome = VerificationOutcome::parse(&verdict);
        metrics::inc_outcome(outcome.label());
        match &outcome {
            VerificationOutcome::Verified(_) => info!("Verifier confirmed the answer"),
            VerificationOutcome::Corrected(_) => info!("Verifier corrected the answer"),
            VerificationOutcome::Unparsed(raw) => warn!(
                "Verifier reply carried no VERIFIED:/CORRECTED: tag, returning it as-is ({} chars)",
                raw.len()
            ),
        }
        Ok(outcome.into_text())
    }

    /// One completion bounded by the shared deadline. If the deadline fires
    /// first the in-flight future is dropped and its result discarded.
    async fn call_agent(
        &self,
        run: &PipelineRun,
        role: AgentRole,
        prompt: String,
        stage: TimeoutStage,
    ) -> Result<String> {
        let budget = run
            .remaining()
            .ok_or_else(|| AssistantError::stage_timeout(stage))?;
        let turns = [ConversationTurn::user(prompt)];
        let started = Instant::now();

        let call = self.client.complete(role, role.preamble(), &turns, budget);
        let reply = match tokio::time::timeout_at(run.deadline, call).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                let err = AssistantError::from_completion(stage, e);
                match &err {
                    AssistantError::StageTimeout { .. } => {
                        warn!("{} completion timed out after {:?}", role, started.elapsed())
                    }
                    _ => error!("{} completion failed: {}", role, err),
                }
                return Err(err);
            }
            Err(_) => {
                warn!(
                    "Deadline reached with {} completion in flight after {:?}, cancelling it",
                    role,
                    started.elapsed()
                );
                return Err(AssistantError::stage_timeout(stage));
            }
        };
        metrics::observe_stage(run.stage.as_str(), started.elapsed());

        run.check_deadline(stage)?;
        Ok(reply)
    }

    fn answerer_prompt(context: &str, question: &str) -> String {
        format!(
            "{context}\n\n\
             ### Instruction:\n\
             Only use the information above to answer the following question. \
             Do not use any external knowledge.\n\n\
             ### Question:\n\
             {question}\n"
        )
    }

    fn verifier_prompt(context: &str, question: &str, draft: &str) -> String {
        format!(
            "### Question:\n\
             {question}\n\n\
             ### Context:\n\
             {context}\n\
             ### Answer To Verify:\n\
             {draft}\n\n\
             ### Instruction:\n\
             Check the answer against the context only. If it is correct respond with \
             \"VERIFIED: <answer>\". If it is wrong or contains anything not in the context \
             respond with \"CORRECTED: <corrected answer>\". Respond only with that tagged form, \
             no commentary, and end with {SENTINEL}.\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::scripted::{ScriptedClient, Step};
    use crate::completion::{ANSWERER_PREAMBLE, VERIFIER_PREAMBLE};
    use crate::context_engine::context_builder::render_context;
    use crate::knowledge::store::tests::sample_store;

    fn orchestrator(client: Arc<ScriptedClient>) -> AssistantOrchestrator {
        AssistantOrchestrator::new(
            Arc::new(sample_store()),
            client,
            OrchestratorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_whitespace_question_is_rejected() {
        let client = Arc::new(ScriptedClient::replying("a", "VERIFIED: a"));
        let orch = orchestrator(client.clone());

        for question in ["", "   ", "\n\t "] {
            let err = orch.answer(question).await.unwrap_err();
            assert!(matches!(err, AssistantError::InvalidInput(_)));
        }
        assert_eq!(client.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_company_name_shortcut_skips_completion() {
        let client = Arc::new(ScriptedClient::replying("a", "VERIFIED: a"));
        let orch = orchestrator(client.clone());

        for question in ["What is the company name?", "tell me the COMPANY NAME please"] {
            let reply = orch.answer(question).await.unwrap();
            assert_eq!(reply, "The company name is: Acme Corp");
        }
        assert_eq!(client.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_verified_reply_is_returned_without_tag() {
        let client = Arc::new(ScriptedClient::replying(
            "Alice is an Engineer.",
            "VERIFIED: Alice is an Engineer. TERMINATE",
        ));
        let orch = orchestrator(client.clone());

        let reply = orch.answer("What role does Alice have?").await.unwrap();
        assert_eq!(reply, "Alice is an Engineer.");
        assert_eq!(client.answerer_calls(), 1);
        assert_eq!(client.verifier_calls(), 1);
    }

    #[tokio::test]
    async fn test_stage_latency_is_labelled_by_pipeline_stage() {
        metrics::init_metrics().unwrap();
        let client = Arc::new(ScriptedClient::replying("Bob is a Manager.", "VERIFIED: Bob is a Manager."));
        let orch = orchestrator(client);

        orch.answer("Who is Bob?").await.unwrap();

        let text = metrics::render().unwrap();
        assert!(text.contains(r#"assistant_stage_seconds_count{stage="answering"}"#));
        assert!(text.contains(r#"assistant_stage_seconds_count{stage="verifying"}"#));
        assert!(!text.contains(r#"stage="answerer""#));
    }

    #[tokio::test]
    async fn test_corrected_reply_is_returned() {
        let client = Arc::new(ScriptedClient::replying(
            "Alice is an Engineer.",
            "CORRECTED: Alice is a Senior Engineer. TERMINATE",
        ));
        let orch = orchestrator(client);

        let reply = orch.answer("What is Alice's designation?").await.unwrap();
        assert_eq!(reply, "Alice is a Senior Engineer.");
    }

    #[tokio::test]
    async fn test_untagged_verifier_reply_is_degraded_not_error() {
        let client = Arc::new(ScriptedClient::replying(
            "Bob is a Manager.",
            "  Bob manages the engineering team.\n",
        ));
        let orch = orchestrator(client);

        let reply = orch.answer("Who is Bob?").await.unwrap();
        assert_eq!(reply, "Bob manages the engineering team.");
    }

    #[tokio::test]
    async fn test_prompts_carry_context_question_and_draft() {
        let client = Arc::new(ScriptedClient::replying(
            "DRAFT-ANSWER",
            "VERIFIED: DRAFT-ANSWER TERMINATE",
        ));
        let orch = orchestrator(client.clone());
        let context = render_context(orch.knowledge());

        orch.answer("  Who approves requests?  ").await.unwrap();

        let calls = client.recorded();
        assert_eq!(calls.len(), 2);

        let answerer = &calls[0];
        assert_eq!(answerer.role, AgentRole::Answerer);
        assert_eq!(answerer.preamble, ANSWERER_PREAMBLE);
        assert_eq!(answerer.messages.len(), 1);
        assert_eq!(answerer.messages[0].role, "user");
        let prompt = &answerer.messages[0].content;
        assert!(prompt.starts_with(&context));
        assert!(prompt.contains("Only use the information above"));
        assert!(prompt.ends_with("### Question:\nWho approves requests?\n"));

        let verifier = &calls[1];
        assert_eq!(verifier.role, AgentRole::Verifier);
        assert_eq!(verifier.preamble, VERIFIER_PREAMBLE);
        let prompt = &verifier.messages[0].content;
        assert!(prompt.contains("Who approves requests?"));
        assert!(prompt.contains(&context));
        assert!(prompt.contains("DRAFT-ANSWER"));
        assert!(prompt.contains("VERIFIED:"));
        assert!(prompt.contains("CORRECTED:"));
    }

    #[tokio::test]
    async fn test_slow_answerer_times_out_before_verification() {
        let client = Arc::new(ScriptedClient::new(
            Step::Slow(Duration::from_secs(5), "late".to_string()),
            Step::Reply("VERIFIED: late TERMINATE".to_string()),
        ));
        let orch = orchestrator(client.clone());

        let started = std::time::Instant::now();
        let err = orch
            .answer_with_timeout("Who is Alice?", Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::StageTimeout { stage: TimeoutStage::Initial }));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(client.answerer_calls(), 1);
        assert_eq!(client.verifier_calls(), 0);
    }

    #[tokio::test]
    async fn test_deadline_is_shared_across_stages() {
        let client = Arc::new(ScriptedClient::new(
            Step::Slow(Duration::from_millis(150), "Alice is an Engineer.".to_string()),
            Step::Slow(Duration::from_millis(150), "VERIFIED: Alice is an Engineer. TERMINATE".to_string()),
        ));
        let orch = orchestrator(client.clone());

        let err = orch
            .answer_with_timeout("Who is Alice?", Duration::from_millis(250))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AssistantError::StageTimeout { stage: TimeoutStage::Verification }
        ));
        assert_eq!(client.answerer_calls(), 1);
        assert_eq!(client.verifier_calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_budget_never_calls_client() {
        let client = Arc::new(ScriptedClient::replying("a", "VERIFIED: a"));
        let orch = orchestrator(client.clone());

        let err = orch
            .answer_with_timeout("Who is Alice?", Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::StageTimeout { stage: TimeoutStage::Initial }));
        assert_eq!(client.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_client_timeout_maps_to_stage_timeout() {
        let client = Arc::new(ScriptedClient::new(
            Step::Reply("Alice is an Engineer.".to_string()),
            Step::Timeout,
        ));
        let orch = orchestrator(client);

        let err = orch.answer("Who is Alice?").await.unwrap_err();
        assert!(matches!(
            err,
            AssistantError::StageTimeout { stage: TimeoutStage::Verification }
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_stops_pipeline() {
        let client = Arc::new(ScriptedClient::new(
            Step::Transport("connection refused".to_string()),
            Step::Reply("VERIFIED: x TERMINATE".to_string()),
        ));
        let orch = orchestrator(client.clone());

        let err = tokio_test::assert_err!(orch.answer("Who is Alice?").await);
        assert!(matches!(err, AssistantError::CompletionTransport(_)));
        assert_eq!(err.http_status(), 500);
        assert_eq!(client.verifier_calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_independent() {
        let client = Arc::new(ScriptedClient::replying(
            "Alice is an Engineer.",
            "VERIFIED: Alice is an Engineer. TERMINATE",
        ));
        let orch = Arc::new(orchestrator(client.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let orch = orch.clone();
                tokio::spawn(async move { orch.answer("Who is Alice?").await })
            })
            .collect();
        for handle in handles {
            let reply = tokio_test::assert_ok!(handle.await.unwrap());
            assert_eq!(reply, "Alice is an Engineer.");
        }
        assert_eq!(client.answerer_calls(), 8);
        assert_eq!(client.verifier_calls(), 8);
    }
}
