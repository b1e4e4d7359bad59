// src/error.rs
// Error types for upstream agent calls and configuration

use reqwest::StatusCode;

/// Errors raised while talking to the hosted agent service
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("API error {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("{0}")]
    RunFailed(String),

    #[error("Run {run_id} did not finish within {seconds}s")]
    RunTimeout { run_id: String, seconds: u64 },

    #[error("{step} failed: {source}")]
    Step {
        step: Step,
        #[source]
        source: Box<AgentError>,
    },
}

/// The stages of a thread/run round trip, used to report where it broke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreateThread,
    SendMessage,
    RunAgent,
    ListMessages,
    Completion,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::CreateThread => "create thread",
            Step::SendMessage => "send message",
            Step::RunAgent => "run agent",
            Step::ListMessages => "list messages",
            Step::Completion => "chat completion",
        };
        f.write_str(name)
    }
}

impl AgentError {
    pub fn at(step: Step) -> impl FnOnce(AgentError) -> AgentError {
        move |source| AgentError::Step {
            step,
            source: Box::new(source),
        }
    }

    /// The failing step, if this error was tagged with one
    pub fn step(&self) -> Option<Step> {
        match self {
            AgentError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Failed to read config file {path}: {message}")]
    File { path: String, message: String },
}
