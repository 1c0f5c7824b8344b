use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::conversation::ConversationTurn;
use crate::errors::CompletionError;

/// Instruction preamble for the answering agent.
pub const ANSWERER_PREAMBLE: &str = "You are a company assistant that answers questions about roles, \
permissions and user information. Answer strictly from the context supplied in the user message. \
Do not use outside knowledge and do not guess. If the context does not contain the information \
needed to answer, reply exactly with \"I don't know\".";

/// Instruction preamble for the verifying agent.
pub const VERIFIER_PREAMBLE: &str = "You are a verification assistant. You receive a question, the \
company context and an answer written by another assistant. Check that every fact in the answer \
matches the context and that nothing in it is invented. If the answer is correct, reply with \
\"VERIFIED: <the answer>\". If it is wrong, incomplete or contains invented details, reply with \
\"CORRECTED: <the corrected answer>\" using only the context. Reply with exactly one of these two \
forms, add no commentary, and always end your reply with TERMINATE.";

/// The two logical agents bound to one completion capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Answerer,
    Verifier,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Answerer => "answerer",
            AgentRole::Verifier => "verifier",
        }
    }

    /// Fixed system message for this role.
    pub fn preamble(&self) -> &'static str {
        match self {
            AgentRole::Answerer => ANSWERER_PREAMBLE,
            AgentRole::Verifier => VERIFIER_PREAMBLE,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single blocking round trip to a language model.
///
/// Implementations must return [`CompletionError::Timeout`] when `budget`
/// runs out and [`CompletionError::Transport`] for every other failure.
/// Callers may drop the returned future at any point; anything still in
/// flight is then discarded.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        role: AgentRole,
        system_preamble: &str,
        messages: &[ConversationTurn],
        budget: Duration,
    ) -> Result<String, CompletionError>;

    /// Human-readable backend identifier for logs.
    fn backend_name(&self) -> String {
        "completion-client".to_string()
    }
}
