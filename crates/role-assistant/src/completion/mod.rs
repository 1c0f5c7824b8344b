//! Completion module - Language-model capability shared by the answering and verifying agents
//!
//! - `client_trait`: the `CompletionClient` seam and the two agent preambles
//! - `llm_worker`: HTTP implementation against an OpenAI-compatible endpoint

pub mod client_trait;
pub mod llm_worker;

pub use client_trait::{AgentRole, CompletionClient, ANSWERER_PREAMBLE, VERIFIER_PREAMBLE};
pub use llm_worker::LLMWorker;

#[cfg(test)]
pub(crate) mod scripted;
