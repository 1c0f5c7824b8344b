//! Completion client for OpenAI-compatible chat endpoints
//!
//! Sends one non-streaming `/v1/chat/completions` request per call. Works with
//! a local Ollama or llama-server as well as hosted OpenAI-style services.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::completion::client_trait::{AgentRole, CompletionClient};
use crate::config::Config;
use crate::conversation::ConversationTurn;
use crate::errors::CompletionError;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

pub struct LLMWorker {
    backend_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    http_client: reqwest::Client,
}

impl LLMWorker {
    pub fn new(config: &Config) -> Self {
        Self::new_with_backend(config.llm_base_url.clone(), config.llm_model.clone())
            .with_api_key(config.llm_api_key.clone())
            .with_sampling(config.llm_temperature, config.llm_max_tokens)
    }

    pub fn new_with_backend(backend_url: String, model: String) -> Self {
        let backend_url = backend_url.trim_end_matches('/').to_string();
        info!("LLM worker initialized with backend: {} (model: {})", backend_url, model);
        Self {
            backend_url,
            model,
            api_key: None,
            temperature: 0.0,
            max_tokens: 1024,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(600))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Empty keys are ignored.
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key).filter(|key| !key.is_empty());
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.backend_url)
    }

    /// The preamble goes first as the system message.
    fn to_chat_messages(system_preamble: &str, messages: &[ConversationTurn]) -> Vec<ChatMessage> {
        std::iter::once(ConversationTurn::system(system_preamble))
            .chain(messages.iter().cloned())
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content,
            })
            .collect()
    }

    fn classify(err: reqwest::Error, started: Instant, what: &str) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout { elapsed: started.elapsed() }
        } else {
            CompletionError::transport(format!("{}: {}", what, err))
        }
    }
}

#[async_trait]
impl CompletionClient for LLMWorker {
    async fn complete(
        &self,
        role: AgentRole,
        system_preamble: &str,
        messages: &[ConversationTurn],
        budget: Duration,
    ) -> Result<String, CompletionError> {
        debug!("LLM worker running {} completion (budget {:?})", role, budget);
        let started = Instant::now();

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: Self::to_chat_messages(system_preamble, messages),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        let mut builder = self.http_client
            .post(self.completions_url())
            .timeout(budget)
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify(e, started, "LLM backend request failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::transport(format!(
                "LLM backend returned {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Self::classify(e, started, "Failed to parse LLM response"))?;

        let content = completion.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .ok_or_else(|| CompletionError::transport("LLM response contained no message"))?;

        debug!(
            "{} completion returned {} chars in {:?}",
            role,
            content.len(),
            started.elapsed()
        );
        Ok(content)
    }

    fn backend_name(&self) -> String {
        format!("{} ({})", self.backend_url, self.model)
    }
}
