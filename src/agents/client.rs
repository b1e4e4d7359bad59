// src/agents/client.rs
// HTTP client for the project/agent/thread API

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::credential::{AGENTS_RESOURCE, Credential, MANAGEMENT_RESOURCE};
use super::messages::ThreadMessage;
use crate::config::AgentsSettings;
use crate::error::AgentError;

const MANAGEMENT_API_VERSION: &str = "2024-04-01";

#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{code}: {message}"),
            (None, Some(message)) => f.write_str(message),
            (Some(code), None) => f.write_str(code),
            (None, None) => f.write_str("Unknown error"),
        }
    }
}

impl Run {
    /// Queued or still running
    pub fn is_pending(&self) -> bool {
        matches!(self.status.as_str(), "queued" | "in_progress" | "cancelling")
    }

    pub fn is_failed(&self) -> bool {
        self.status == "failed"
    }

    pub fn error_detail(&self) -> String {
        self.last_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectList {
    value: Vec<Project>,
}

/// Listing order for thread messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    Asc,
    Desc,
}

impl ListOrder {
    fn as_str(self) -> &'static str {
        match self {
            ListOrder::Asc => "asc",
            ListOrder::Desc => "desc",
        }
    }
}

pub struct AgentsClient {
    http: reqwest::Client,
    credential: Arc<Credential>,
    endpoint: String,
    api_version: String,
    management_url: String,
    subscription_id: String,
    resource_group: String,
    poll_interval: Duration,
    run_timeout: Duration,
}

impl AgentsClient {
    pub fn new(settings: &AgentsSettings, credential: Arc<Credential>) -> Result<Self, AgentError> {
        // Fail early on an endpoint that can never work
        Url::parse(&settings.endpoint)?;
        Url::parse(&settings.management_url)?;

        Ok(Self {
            http: reqwest::Client::new(),
            credential,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_version: settings.api_version.clone(),
            management_url: settings.management_url.trim_end_matches('/').to_string(),
            subscription_id: settings.subscription_id.clone(),
            resource_group: settings.resource_group.clone(),
            poll_interval: settings.poll_interval,
            run_timeout: settings.run_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> Result<Url, AgentError> {
        let mut url = Url::parse(&format!("{}/{}", self.endpoint, path))?;
        url.query_pairs_mut().append_pair("api-version", &self.api_version);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, AgentError> {
        let token = self.credential.token(resource).await?;
        let response = request.bearer_auth(token).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(AgentError::Api { status, body });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn create_thread(&self) -> Result<Thread, AgentError> {
        let url = self.url("threads")?;
        let thread: Thread = self.send(self.http.post(url).json(&json!({})), AGENTS_RESOURCE).await?;
        debug!("Created thread {}", thread.id);
        Ok(thread)
    }

    pub async fn create_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str,
    ) -> Result<ThreadMessage, AgentError> {
        let url = self.url(&format!("threads/{thread_id}/messages"))?;
        let body = json!({ "role": role, "content": content });
        self.send(self.http.post(url).json(&body), AGENTS_RESOURCE).await
    }

    pub async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run, AgentError> {
        let url = self.url(&format!("threads/{thread_id}/runs"))?;
        let body = json!({ "assistant_id": agent_id });
        self.send(self.http.post(url).json(&body), AGENTS_RESOURCE).await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AgentError> {
        let url = self.url(&format!("threads/{thread_id}/runs/{run_id}"))?;
        self.send(self.http.get(url), AGENTS_RESOURCE).await
    }

    /// Start a run and poll it until it leaves the queued/in-progress states
    pub async fn create_and_process_run(
        &self,
        thread_id: &str,
        agent_id: &str,
    ) -> Result<Run, AgentError> {
        let mut run = self.create_run(thread_id, agent_id).await?;
        let deadline = Instant::now() + self.run_timeout;

        while run.is_pending() {
            if Instant::now() >= deadline {
                return Err(AgentError::RunTimeout {
                    run_id: run.id,
                    seconds: self.run_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
            run = self.get_run(thread_id, &run.id).await?;
            debug!("Run {} status: {}", run.id, run.status);
        }

        info!("Run {} finished with status: {}", run.id, run.status);
        Ok(run)
    }

    /// All messages of a thread, following pagination
    pub async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
    ) -> Result<Vec<ThreadMessage>, AgentError> {
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut url = self.url(&format!("threads/{thread_id}/messages"))?;
            url.query_pairs_mut().append_pair("order", order.as_str());
            if let Some(cursor) = &after {
                url.query_pairs_mut().append_pair("after", cursor);
            }

            let page: ListResponse<ThreadMessage> =
                self.send(self.http.get(url), AGENTS_RESOURCE).await?;
            let empty_page = page.data.is_empty();
            messages.extend(page.data);

            match page.last_id {
                Some(last) if page.has_more && !empty_page && after.as_ref() != Some(&last) => {
                    after = Some(last);
                }
                Some(_) if page.has_more => {
                    warn!("Message listing for thread {} stopped advancing", thread_id);
                    break;
                }
                _ => break,
            }
        }

        debug!("Listed {} messages in thread {}", messages.len(), thread_id);
        Ok(messages)
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<Agent, AgentError> {
        let url = self.url(&format!("assistants/{agent_id}"))?;
        self.send(self.http.get(url), AGENTS_RESOURCE).await
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, AgentError> {
        let url = self.url("assistants")?;
        let list: ListResponse<Agent> = self.send(self.http.get(url), AGENTS_RESOURCE).await?;
        Ok(list.data)
    }

    /// Projects visible in the configured subscription and resource group
    pub async fn list_projects(&self) -> Result<Vec<Project>, AgentError> {
        let mut url = Url::parse(&format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces",
            self.management_url, self.subscription_id, self.resource_group
        ))?;
        url.query_pairs_mut().append_pair("api-version", MANAGEMENT_API_VERSION);

        let list: ProjectList = self.send(self.http.get(url), MANAGEMENT_RESOURCE).await?;
        Ok(list.value)
    }
}
