// src/config/mod.rs
// Configuration: environment variables first, ~/.sagealpha/config.toml for defaults

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ConfigError;

pub const AZURE_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
pub const AZURE_RESOURCE_GROUP: &str = "AZURE_RESOURCE_GROUP";
pub const AZURE_PROJECT_NAME: &str = "AZURE_PROJECT_NAME";
pub const AZURE_PROJECT_ENDPOINT: &str = "AZURE_PROJECT_ENDPOINT";
pub const AZURE_AGENT_ID: &str = "AZURE_AGENT_ID";
pub const AZURE_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const AZURE_OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const AZURE_OPENAI_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT";

const DEFAULT_AGENTS_API_VERSION: &str = "v1";
const DEFAULT_COMPLETIONS_API_VERSION: &str = "2024-02-15-preview";
const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";
const DEFAULT_SYSTEM_PROMPT: &str = "You are SageAlpha, a financial research assistant. \
Answer finance questions clearly and concisely.";

/// Which upstream API shape the chat handler talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Project/agent/thread API
    #[default]
    Agents,
    /// Raw chat-completions API
    Completions,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agents" | "agent" => Ok(BackendKind::Agents),
            "completions" | "chat" => Ok(BackendKind::Completions),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

/// Optional defaults read from the config file
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub backend: Option<BackendKind>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub subscription_id: Option<String>,
    pub resource_group: Option<String>,
    pub project_name: Option<String>,
    pub project_endpoint: Option<String>,
    pub agent_id: Option<String>,
    pub openai_endpoint: Option<String>,
    pub openai_deployment: Option<String>,
    pub system_prompt: Option<String>,
}

impl FileConfig {
    /// Load from ~/.sagealpha/config.toml, falling back to defaults
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".sagealpha")
        .join("config.toml")
}

/// Project/agent/thread API settings, all present
#[derive(Debug, Clone)]
pub struct AgentsSettings {
    pub subscription_id: String,
    pub resource_group: String,
    pub project_name: String,
    pub endpoint: String,
    pub agent_id: String,
    pub api_version: String,
    pub management_url: String,
    pub access_token: Option<String>,
    pub poll_interval: Duration,
    pub run_timeout: Duration,
}

/// Chat-completions API settings, all present
#[derive(Debug, Clone)]
pub struct CompletionsSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub host: String,
    pub port: u16,
    pub debug: bool,

    // ── Agents API
    pub subscription_id: Option<String>,
    pub resource_group: Option<String>,
    pub project_name: Option<String>,
    pub project_endpoint: Option<String>,
    pub agent_id: Option<String>,
    pub agents_api_version: String,
    pub management_url: String,
    pub access_token: Option<String>,
    pub run_poll_interval: Duration,
    pub run_timeout: Duration,

    // ── Chat completions API
    pub openai_endpoint: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_deployment: Option<String>,
    pub openai_api_version: String,
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Config {
    /// Build from the process environment
    pub fn from_env(file: &FileConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), file)
    }

    /// Build from any key lookup, with `file` filling gaps
    pub fn from_lookup<F>(lookup: F, file: &FileConfig) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| clean(lookup(key));

        let backend = match get("SAGEALPHA_BACKEND") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SAGEALPHA_BACKEND".into(),
                value: v,
            })?,
            None => file.backend.unwrap_or_default(),
        };

        let port = match get("PORT") {
            Some(v) => parse_value("PORT", v)?,
            None => file.port.unwrap_or(5000),
        };

        let poll_ms: u64 = match get("RUN_POLL_INTERVAL_MS") {
            Some(v) => parse_value("RUN_POLL_INTERVAL_MS", v)?,
            None => 1000,
        };
        let timeout_secs: u64 = match get("RUN_TIMEOUT_SECS") {
            Some(v) => parse_value("RUN_TIMEOUT_SECS", v)?,
            None => 300,
        };

        let max_tokens = get("AZURE_OPENAI_MAX_TOKENS")
            .map(|v| parse_value("AZURE_OPENAI_MAX_TOKENS", v))
            .transpose()?;
        let temperature = get("AZURE_OPENAI_TEMPERATURE")
            .map(|v| parse_value("AZURE_OPENAI_TEMPERATURE", v))
            .transpose()?;

        let config = Self {
            backend,
            host: get("HOST")
                .or_else(|| file.host.clone())
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            debug: get("APP_ENV").is_some_and(|v| v == "development"),

            subscription_id: get(AZURE_SUBSCRIPTION_ID).or_else(|| file.subscription_id.clone()),
            resource_group: get(AZURE_RESOURCE_GROUP).or_else(|| file.resource_group.clone()),
            project_name: get(AZURE_PROJECT_NAME).or_else(|| file.project_name.clone()),
            project_endpoint: get(AZURE_PROJECT_ENDPOINT)
                .or_else(|| file.project_endpoint.clone()),
            agent_id: get(AZURE_AGENT_ID).or_else(|| file.agent_id.clone()),
            agents_api_version: get("AZURE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AGENTS_API_VERSION.to_string()),
            management_url: get("AZURE_MANAGEMENT_URL")
                .unwrap_or_else(|| DEFAULT_MANAGEMENT_URL.to_string()),
            access_token: get("AZURE_ACCESS_TOKEN"),
            run_poll_interval: Duration::from_millis(poll_ms),
            run_timeout: Duration::from_secs(timeout_secs),

            openai_endpoint: get(AZURE_OPENAI_ENDPOINT).or_else(|| file.openai_endpoint.clone()),
            openai_api_key: get(AZURE_OPENAI_API_KEY),
            openai_deployment: get(AZURE_OPENAI_DEPLOYMENT)
                .or_else(|| file.openai_deployment.clone()),
            openai_api_version: get("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_COMPLETIONS_API_VERSION.to_string()),
            system_prompt: get("SAGEALPHA_SYSTEM_PROMPT")
                .or_else(|| file.system_prompt.clone())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_tokens,
            temperature,
        };

        debug!("Config loaded: backend={:?}, port={}", config.backend, config.port);
        Ok(config)
    }

    /// Required agents variables, in reporting order, with their values
    pub fn agent_variables(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            (AZURE_SUBSCRIPTION_ID, self.subscription_id.as_deref()),
            (AZURE_RESOURCE_GROUP, self.resource_group.as_deref()),
            (AZURE_PROJECT_NAME, self.project_name.as_deref()),
            (AZURE_PROJECT_ENDPOINT, self.project_endpoint.as_deref()),
            (AZURE_AGENT_ID, self.agent_id.as_deref()),
        ]
    }

    /// Required completions variables, in reporting order, with their values
    pub fn completion_variables(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            (AZURE_OPENAI_ENDPOINT, self.openai_endpoint.as_deref()),
            (AZURE_OPENAI_API_KEY, self.openai_api_key.as_deref()),
            (AZURE_OPENAI_DEPLOYMENT, self.openai_deployment.as_deref()),
        ]
    }

    /// Names of required variables that are unset for the selected backend
    pub fn missing_variables(&self) -> Vec<String> {
        let required = match self.backend {
            BackendKind::Agents => self.agent_variables(),
            BackendKind::Completions => self.completion_variables(),
        };
        required
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = self.missing_variables();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingVariables(missing))
        }
    }

    pub fn agents_settings(&self) -> Result<AgentsSettings, ConfigError> {
        let missing: Vec<String> = self
            .agent_variables()
            .into_iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| name.to_string())
            .collect();

        match (
            &self.subscription_id,
            &self.resource_group,
            &self.project_name,
            &self.project_endpoint,
            &self.agent_id,
        ) {
            (Some(sub), Some(rg), Some(project), Some(endpoint), Some(agent)) => {
                Ok(AgentsSettings {
                    subscription_id: sub.clone(),
                    resource_group: rg.clone(),
                    project_name: project.clone(),
                    endpoint: endpoint.clone(),
                    agent_id: agent.clone(),
                    api_version: self.agents_api_version.clone(),
                    management_url: self.management_url.clone(),
                    access_token: self.access_token.clone(),
                    poll_interval: self.run_poll_interval,
                    run_timeout: self.run_timeout,
                })
            }
            _ => Err(ConfigError::MissingVariables(missing)),
        }
    }

    pub fn completions_settings(&self) -> Result<CompletionsSettings, ConfigError> {
        match (&self.openai_endpoint, &self.openai_api_key, &self.openai_deployment) {
            (Some(endpoint), Some(api_key), Some(deployment)) => Ok(CompletionsSettings {
                endpoint: endpoint.clone(),
                api_key: api_key.clone(),
                deployment: deployment.clone(),
                api_version: self.openai_api_version.clone(),
                system_prompt: self.system_prompt.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            }),
            _ => Err(ConfigError::MissingVariables(
                self.completion_variables()
                    .into_iter()
                    .filter(|(_, v)| v.is_none())
                    .map(|(name, _)| name.to_string())
                    .collect(),
            )),
        }
    }
}

// Trims whitespace, drops trailing `# comments`, treats empty as unset
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split('#').next().unwrap_or("").trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_value<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}
