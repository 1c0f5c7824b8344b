//! Error types for the assistant pipeline.
//!
//! Library modules return [`AssistantError`] via `thiserror`. Process
//! startup wraps these with `anyhow` for context-rich diagnostics.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline stage whose deadline check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutStage {
    /// The answerer call (first agent).
    Initial,
    /// The verifier call (second agent).
    Verification,
}

impl TimeoutStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutStage::Initial => "initial",
            TimeoutStage::Verification => "verification",
        }
    }
}

impl fmt::Display for TimeoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for knowledge loading and question answering.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// A knowledge document is missing, unreadable or malformed.
    #[error("data load error at {path:?}: {message}")]
    DataLoad { path: PathBuf, message: String },

    /// The caller supplied an unusable question.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The shared deadline ran out during a stage.
    #[error("{stage} stage timed out")]
    StageTimeout { stage: TimeoutStage },

    /// The completion service failed for a reason other than time.
    #[error("completion transport error: {0}")]
    CompletionTransport(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AssistantError>;

impl AssistantError {
    pub fn data_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DataLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn stage_timeout(stage: TimeoutStage) -> Self {
        Self::StageTimeout { stage }
    }

    /// HTTP status code the ask endpoint reports for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            AssistantError::InvalidInput(_) => 400,
            AssistantError::StageTimeout { .. } => 408,
            AssistantError::DataLoad { .. } | AssistantError::CompletionTransport(_) => 500,
        }
    }

    /// Re-raise a completion failure as the typed error for `stage`.
    pub fn from_completion(stage: TimeoutStage, err: CompletionError) -> Self {
        match err {
            CompletionError::Timeout { .. } => Self::StageTimeout { stage },
            CompletionError::Transport(message) => Self::CompletionTransport(message),
        }
    }
}

/// Failure of a single completion round trip.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion did not return within {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("{0}")]
    Transport(String),
}

impl CompletionError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}
