//! In-process completion client with canned replies, for tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::completion::client_trait::{AgentRole, CompletionClient};
use crate::conversation::ConversationTurn;
use crate::errors::CompletionError;

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Reply(String),
    Slow(Duration, String),
    Timeout,
    Transport(String),
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub role: AgentRole,
    pub preamble: String,
    pub messages: Vec<ConversationTurn>,
}

pub(crate) struct ScriptedClient {
    answerer: Step,
    verifier: Step,
    answerer_calls: AtomicUsize,
    verifier_calls: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new(answerer: Step, verifier: Step) -> Self {
        Self {
            answerer,
            verifier,
            answerer_calls: AtomicUsize::new(0),
            verifier_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(answer: &str, verdict: &str) -> Self {
        Self::new(Step::Reply(answer.to_string()), Step::Reply(verdict.to_string()))
    }

    pub fn answerer_calls(&self) -> usize {
        self.answerer_calls.load(Ordering::SeqCst)
    }

    pub fn verifier_calls(&self) -> usize {
        self.verifier_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.answerer_calls() + self.verifier_calls()
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        role: AgentRole,
        system_preamble: &str,
        messages: &[ConversationTurn],
        _budget: Duration,
    ) -> Result<String, CompletionError> {
        let step = match role {
            AgentRole::Answerer => {
                self.answerer_calls.fetch_add(1, Ordering::SeqCst);
                self.answerer.clone()
            }
            AgentRole::Verifier => {
                self.verifier_calls.fetch_add(1, Ordering::SeqCst);
                self.verifier.clone()
            }
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                role,
                preamble: system_preamble.to_string(),
                messages: messages.to_vec(),
            });
        }

        match step {
            Step::Reply(text) => Ok(text),
            Step::Slow(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Step::Timeout => Err(CompletionError::Timeout { elapsed: Duration::from_secs(1) }),
            Step::Transport(message) => Err(CompletionError::Transport(message)),
        }
    }

    fn backend_name(&self) -> String {
        "scripted".to_string()
    }
}
