// src/agents/credential.rs
// Bearer tokens for the agent service and management plane

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::AgentError;

/// Resource for project/agent/thread calls
pub const AGENTS_RESOURCE: &str = "https://ai.azure.com";
/// Resource for subscription-level calls (project listing)
pub const MANAGEMENT_RESOURCE: &str = "https://management.azure.com";

// Refresh this long before the token actually expires
const EXPIRY_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
enum TokenSource {
    Static(String),
    AzureCli,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Output of `az account get-access-token --output json`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    #[serde(rename = "expires_on", default)]
    expires_on: Option<i64>,
}

pub struct Credential {
    source: TokenSource,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl Credential {
    /// Use `token` for every resource when given, otherwise ask the Azure CLI
    pub fn new(access_token: Option<String>) -> Self {
        match access_token {
            Some(token) => Self::static_token(token),
            None => Self::azure_cli(),
        }
    }

    pub fn static_token(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn azure_cli() -> Self {
        Self {
            source: TokenSource::AzureCli,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self.source {
            TokenSource::Static(_) => "static access token",
            TokenSource::AzureCli => "Azure CLI",
        }
    }

    /// Get a token for `resource`, reusing a cached one until close to expiry
    pub async fn token(&self, resource: &str) -> Result<String, AgentError> {
        if let TokenSource::Static(token) = &self.source {
            return Ok(token.clone());
        }

        let mut cache = self.cache.lock().await;
        let now = Utc::now();
        if let Some(cached) = cache.get(resource) {
            if cached.expires_at - Duration::minutes(EXPIRY_MARGIN_MINUTES) > now {
                return Ok(cached.token.clone());
            }
        }

        debug!("Requesting token for {} from Azure CLI", resource);
        let fresh = fetch_cli_token(resource).await?;
        let token = fresh.token.clone();
        cache.insert(resource.to_string(), fresh);
        info!("Obtained access token for {}", resource);
        Ok(token)
    }
}

async fn fetch_cli_token(resource: &str) -> Result<CachedToken, AgentError> {
    let output = tokio::process::Command::new("az")
        .args(["account", "get-access-token", "--resource", resource, "--output", "json"])
        .output()
        .await
        .map_err(|e| AgentError::Credential(format!("failed to run az: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AgentError::Credential(format!(
            "az exited with {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    parse_cli_token(&output.stdout, Utc::now())
}

fn parse_cli_token(stdout: &[u8], now: DateTime<Utc>) -> Result<CachedToken, AgentError> {
    let parsed: CliToken = serde_json::from_slice(stdout)
        .map_err(|e| AgentError::Credential(format!("unreadable az output: {e}")))?;

    let expires_at = parsed
        .expires_on
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or(now + Duration::minutes(EXPIRY_MARGIN_MINUTES * 2));

    Ok(CachedToken {
        token: parsed.access_token,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_used_for_every_resource() {
        let credential = Credential::new(Some("tok".into()));
        assert_eq!(credential.token(AGENTS_RESOURCE).await.unwrap(), "tok");
        assert_eq!(credential.token(MANAGEMENT_RESOURCE).await.unwrap(), "tok");
        assert_eq!(credential.describe(), "static access token");
    }

    #[test]
    fn test_parse_cli_token() {
        let now = Utc::now();
        let out = br#"{"accessToken":"abc","expiresOn":"2030-01-01 00:00:00.000000","expires_on":1893456000,"tokenType":"Bearer"}"#;
        let token = parse_cli_token(out, now).unwrap();
        assert_eq!(token.token, "abc");
        assert_eq!(token.expires_at.timestamp(), 1_893_456_000);
    }

    #[test]
    fn test_parse_cli_token_without_expiry() {
        let now = Utc::now();
        let token = parse_cli_token(br#"{"accessToken":"abc"}"#, now).unwrap();
        assert!(token.expires_at > now);
    }

    #[test]
    fn test_parse_cli_token_garbage() {
        let err = parse_cli_token(b"Please run 'az login'", Utc::now()).unwrap_err();
        assert!(matches!(err, AgentError::Credential(_)));
    }
}
