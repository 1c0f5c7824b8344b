//! Context engine module - Grounding context and the generate-then-verify pipeline

pub mod context_builder;
pub mod orchestrator;
pub mod verification;

pub use context_builder::{render_context, ContextBuilder};
pub use orchestrator::{AssistantOrchestrator, OrchestratorConfig, PipelineStage};
pub use verification::VerificationOutcome;

