// src/agents/completions.rs
// Chat-completions client (single request, single reply)

use serde::{Deserialize, Serialize};
use url::Url;

use super::messages::ThreadMessage;
use crate::config::CompletionsSettings;
use crate::error::AgentError;

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    // Content may be a string or a list of parts, so reuse the thread model
    pub message: ThreadMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

pub struct CompletionsClient {
    http: reqwest::Client,
    url: Url,
    api_key: String,
    system_prompt: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl CompletionsClient {
    pub fn new(settings: &CompletionsSettings) -> Result<Self, AgentError> {
        let mut url = Url::parse(&format!(
            "{}/openai/deployments/{}/chat/completions",
            settings.endpoint.trim_end_matches('/'),
            settings.deployment
        ))?;
        url.query_pairs_mut()
            .append_pair("api-version", &settings.api_version);

        Ok(Self {
            http: reqwest::Client::new(),
            url,
            api_key: settings.api_key.clone(),
            system_prompt: settings.system_prompt.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }

    /// Send the system prompt plus `user_message`, returning the choices
    /// as thread messages
    pub async fn complete(&self, user_message: &str) -> Result<Vec<ThreadMessage>, AgentError> {
        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::new("system", self.system_prompt.clone()));
        }
        messages.push(ChatMessage::new("user", user_message));

        let request = ChatCompletionRequest {
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(self.url.clone())
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(AgentError::Api { status, body });
        }

        let text = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&text)?;

        Ok(parsed.choices.into_iter().map(|c| c.message).collect())
    }
}
