// role-assistant/crates/role-assistant/src/lib.rs

pub mod completion;
pub mod config;
pub mod context_engine;
pub mod conversation;
pub mod errors;
pub mod knowledge;
pub mod metrics;
pub mod shared_state;
pub mod telemetry;
#[cfg(feature = "cli")]
pub mod api;
#[cfg(feature = "cli")]
pub mod server;

// Public API exports
pub use completion::{AgentRole, CompletionClient, LLMWorker};
pub use config::Config;
pub use context_engine::{AssistantOrchestrator, OrchestratorConfig, VerificationOutcome};
pub use conversation::ConversationTurn;
pub use errors::{AssistantError, CompletionError, TimeoutStage};
pub use knowledge::KnowledgeStore;
pub use shared_state::UnifiedAppState;
#[cfg(feature = "cli")]
pub use server::run_server;
