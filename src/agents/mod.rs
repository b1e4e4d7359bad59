// src/agents/mod.rs
// Chat backends that turn one user message into one assistant reply

pub mod client;
pub mod completions;
pub mod credential;
pub mod messages;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::{BackendKind, Config};
use crate::error::{AgentError, Step};
use client::{AgentsClient, ListOrder};
use completions::CompletionsClient;
use credential::Credential;
use messages::extract_assistant_response;

pub use messages::ThreadMessage;

/// Something that can answer a single user message.
///
/// `Ok(None)` means the upstream call worked but produced no readable text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn reply(&self, user_message: &str) -> Result<Option<String>, AgentError>;

    fn name(&self) -> &'static str;
}

/// Thread/run round trip against a hosted agent
pub struct AgentsBackend {
    client: AgentsClient,
    agent_id: String,
}

impl AgentsBackend {
    pub fn new(client: AgentsClient, agent_id: impl Into<String>) -> Self {
        Self {
            client,
            agent_id: agent_id.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for AgentsBackend {
    async fn reply(&self, user_message: &str) -> Result<Option<String>, AgentError> {
        let thread = self
            .client
            .create_thread()
            .await
            .map_err(AgentError::at(Step::CreateThread))?;
        info!("✓ Created thread: {}", thread.id);

        self.client
            .create_message(&thread.id, "user", user_message)
            .await
            .map_err(AgentError::at(Step::SendMessage))?;
        info!("✓ Message sent to agent");

        let run = self
            .client
            .create_and_process_run(&thread.id, &self.agent_id)
            .await
            .map_err(AgentError::at(Step::RunAgent))?;
        info!("✓ Agent run completed with status: {}", run.status);

        if run.is_failed() {
            let detail = run.error_detail();
            error!("Agent run failed: {}", detail);
            return Err(AgentError::RunFailed(detail));
        }

        let messages = self
            .client
            .list_messages(&thread.id, ListOrder::Asc)
            .await
            .map_err(AgentError::at(Step::ListMessages))?;
        info!("✓ Messages retrieved");

        Ok(extract_assistant_response(&messages))
    }

    fn name(&self) -> &'static str {
        "agents"
    }
}

/// One chat-completions request per message
pub struct CompletionsBackend {
    client: CompletionsClient,
}

impl CompletionsBackend {
    pub fn new(client: CompletionsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatBackend for CompletionsBackend {
    async fn reply(&self, user_message: &str) -> Result<Option<String>, AgentError> {
        let messages = self
            .client
            .complete(user_message)
            .await
            .map_err(AgentError::at(Step::Completion))?;
        Ok(extract_assistant_response(&messages))
    }

    fn name(&self) -> &'static str {
        "completions"
    }
}

/// Build the backend selected in `config`
pub fn build_backend(config: &Config) -> anyhow::Result<Arc<dyn ChatBackend>> {
    let backend: Arc<dyn ChatBackend> = match config.backend {
        BackendKind::Agents => {
            let settings = config.agents_settings()?;
            let credential = Arc::new(Credential::new(settings.access_token.clone()));
            info!("Using {} for agent credentials", credential.describe());
            let client = AgentsClient::new(&settings, credential)?;
            Arc::new(AgentsBackend::new(client, settings.agent_id))
        }
        BackendKind::Completions => {
            let settings = config.completions_settings()?;
            let client = CompletionsClient::new(&settings)?;
            Arc::new(CompletionsBackend::new(client))
        }
    };
    Ok(backend)
}
