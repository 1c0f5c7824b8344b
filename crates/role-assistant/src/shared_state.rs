//! Shared state handed to every HTTP handler
//!
//! The orchestrator, knowledge store and completion client are built once at
//! startup and reached through `Arc`s. Nothing here is mutated per request
//! except the lock-free counters.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tracing::info;

use crate::{
    completion::{CompletionClient, LLMWorker},
    config::Config,
    context_engine::{AssistantOrchestrator, OrchestratorConfig},
    knowledge::KnowledgeStore,
};

/// Request sequence numbers for log spans. Failures are counted in
/// `assistant_requests_total{status}`.
pub struct AtomicCounters {
    pub total_requests: AtomicUsize,
}

impl AtomicCounters {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicUsize::new(0),
        }
    }

    pub fn inc_total_requests(&self) -> usize {
        self.total_requests.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for AtomicCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state used by the Axum router.
#[derive(Clone)]
pub struct UnifiedAppState {
    pub app_name: Arc<str>,
    pub orchestrator: Arc<AssistantOrchestrator>,
    pub counters: Arc<AtomicCounters>,
}

impl UnifiedAppState {
    pub fn new(app_name: impl Into<Arc<str>>, orchestrator: Arc<AssistantOrchestrator>) -> Self {
        Self {
            app_name: app_name.into(),
            orchestrator,
            counters: Arc::new(AtomicCounters::new()),
        }
    }

    /// Load the knowledge store and wire the HTTP completion client from config.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let knowledge = Arc::new(KnowledgeStore::load(&cfg.roles_path, &cfg.users_path)?);
        let client: Arc<dyn CompletionClient> = Arc::new(LLMWorker::new(cfg));
        Ok(Self::with_client(cfg, knowledge, client))
    }

    pub fn with_client(
        cfg: &Config,
        knowledge: Arc<KnowledgeStore>,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        info!("Initializing shared application state");
        let orchestrator = AssistantOrchestrator::new(
            knowledge,
            client,
            OrchestratorConfig {
                default_timeout: cfg.answer_timeout(),
            },
        );
        Self::new(cfg.app_name.as_str(), Arc::new(orchestrator))
    }
}
