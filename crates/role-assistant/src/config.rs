// role-assistant/crates/role-assistant/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub api_host: String,
    pub api_port: u16,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub answer_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
    pub roles_path: String,
    pub users_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        let config = Self {
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "Ticket Assistant".into()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            api_port: parse_var("API_PORT", "8000")?,
            llm_base_url: env::var("LLM_BASE_URL").unwrap_or_else(|_| "http://localhost:11434".into()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "llama2:latest".into()),
            llm_api_key: env::var("LLM_API_KEY").unwrap_or_else(|_| "ollama-local".into()),
            llm_temperature: parse_var("LLM_TEMPERATURE", "0")?,
            llm_max_tokens: parse_var("LLM_MAX_TOKENS", "1024")?,
            answer_timeout_seconds: parse_var("ANSWER_TIMEOUT_SECONDS", "30")?,
            request_timeout_seconds: parse_var("REQUEST_TIMEOUT_SECONDS", "120")?,
            roles_path: env::var("ROLES_PATH")
                .unwrap_or_else(|_| "./data/project_roles_knowledge.json".into()),
            users_path: env::var("USERS_PATH")
                .unwrap_or_else(|_| "./data/user_mapping.json".into()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.answer_timeout_seconds == 0 {
            anyhow::bail!("ANSWER_TIMEOUT_SECONDS must be greater than zero");
        }
        if self.request_timeout_seconds < self.answer_timeout_seconds {
            warn!(
                "REQUEST_TIMEOUT_SECONDS ({}) is below ANSWER_TIMEOUT_SECONDS ({}); the HTTP layer may cut answers short",
                self.request_timeout_seconds, self.answer_timeout_seconds
            );
        }
        if !self.llm_base_url.starts_with("http://") && !self.llm_base_url.starts_with("https://") {
            anyhow::bail!("LLM_BASE_URL must start with http:// or https://, got {}", self.llm_base_url);
        }
        Ok(())
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- App Name: {}", self.app_name);
        info!("- API: {}:{}", self.api_host, self.api_port);
        info!("- LLM Backend: {}", self.llm_base_url);
        info!("- LLM Model: {}", self.llm_model);
        info!("- LLM API Key: {}", if self.llm_api_key.is_empty() { "not set" } else { "set" });
        info!("- Temperature: {}", self.llm_temperature);
        info!("- Max Tokens: {}", self.llm_max_tokens);
        info!("- Answer Timeout: {}s", self.answer_timeout_seconds);
        info!("- Request Timeout: {}s", self.request_timeout_seconds);
        info!("- Roles Document: {}", self.roles_path);
        info!("- Users Document: {}", self.users_path);
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("invalid API address {}:{}", self.api_host, self.api_port))
    }

    pub fn answer_timeout(&self) -> Duration {
        Duration::from_secs(self.answer_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(name).unwrap_or_else(|_| default.into());
    raw.parse()
        .with_context(|| format!("{} has invalid value '{}'", name, raw))
}
