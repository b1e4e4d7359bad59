// src/diagnostics.rs
// Step-by-step checks of the agent account, printed as status lines

use std::io::{self, Write};
use std::sync::Arc;

use crate::agents::client::{AgentsClient, ListOrder};
use crate::agents::credential::{Credential, MANAGEMENT_RESOURCE};
use crate::agents::messages::extract_assistant_response;
use crate::config::Config;

pub const DEFAULT_TEST_MESSAGE: &str = "Hello, what is 2+2?";

const RULE_WIDTH: usize = 60;
const MAX_DISPLAY_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsOutcome {
    pub exit_code: i32,
}

impl DiagnosticsOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn fatal() -> Self {
        Self { exit_code: 1 }
    }
}

fn banner<W: Write>(out: &mut W, step: usize, title: &str, leading_newline: bool) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    if leading_newline {
        writeln!(out)?;
    }
    writeln!(out, "{rule}")?;
    writeln!(out, "🔍 STEP {step}: {title}")?;
    writeln!(out, "{rule}")
}

fn display_value(value: Option<&str>) -> String {
    match value {
        None => "(not set)".to_string(),
        Some(v) if v.chars().count() > MAX_DISPLAY_CHARS => {
            let head: String = v.chars().take(MAX_DISPLAY_CHARS).collect();
            format!("{head}...")
        }
        Some(v) => v.to_string(),
    }
}

/// Run every check in order, writing progress to `out`.
///
/// Missing configuration, an unusable credential or an unusable endpoint stop
/// the run with exit code 1. Later steps report failures and carry on.
pub async fn run_diagnostics<W: Write>(
    config: &Config,
    credential: Arc<Credential>,
    test_message: &str,
    out: &mut W,
) -> io::Result<DiagnosticsOutcome> {
    banner(out, 1, "Checking Environment Variables", false)?;

    let variables = config.agent_variables();
    for (name, value) in &variables {
        let status = if value.is_some() { "✓" } else { "✗" };
        writeln!(out, "{status} {name}: {}", display_value(*value))?;
    }

    let missing: Vec<&str> = variables
        .iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        writeln!(out, "\n❌ MISSING VARIABLES: {}", missing.join(", "))?;
        writeln!(out, "Fix your .env file and retry.\n")?;
        return Ok(DiagnosticsOutcome::fatal());
    }

    banner(out, 2, "Authenticating with Azure", true)?;
    writeln!(out, "✓ Credential initialized ({})", credential.describe())?;
    if let Err(e) = credential.token(MANAGEMENT_RESOURCE).await {
        writeln!(out, "✗ Authentication failed: {e}")?;
        writeln!(out, "\nFix: Run 'az login' and make sure you're authenticated")?;
        return Ok(DiagnosticsOutcome::fatal());
    }
    writeln!(out, "✓ Successfully obtained Azure token")?;

    banner(out, 3, "Connecting to the Agent Service", true)?;
    let settings = match config.agents_settings() {
        Ok(settings) => settings,
        Err(e) => {
            writeln!(out, "✗ Failed to resolve settings: {e}")?;
            return Ok(DiagnosticsOutcome::fatal());
        }
    };
    let client = match AgentsClient::new(&settings, credential) {
        Ok(client) => client,
        Err(e) => {
            writeln!(out, "✗ Failed to create agent client: {e}")?;
            return Ok(DiagnosticsOutcome::fatal());
        }
    };
    writeln!(out, "✓ Agent client initialized for {}", client.endpoint())?;

    banner(out, 4, "Listing Available Projects", true)?;
    match client.list_projects().await {
        Ok(projects) if projects.is_empty() => {
            writeln!(out, "⚠️  No projects found in this subscription/resource group")?;
        }
        Ok(projects) => {
            writeln!(out, "✓ Found {} project(s):", projects.len())?;
            for p in &projects {
                writeln!(out, "  → {} (ID: {})", p.name, p.id.as_deref().unwrap_or("N/A"))?;
                if p.name == settings.project_name {
                    writeln!(out, "    ✓ This matches your AZURE_PROJECT_NAME")?;
                }
            }
        }
        Err(e) => writeln!(out, "✗ Failed to list projects: {e}")?,
    }

    banner(out, 5, "Verifying Agent Exists", true)?;
    match client.get_agent(&settings.agent_id).await {
        Ok(agent) => {
            writeln!(out, "✓ Agent found: {}", agent.id)?;
            writeln!(out, "  Name: {}", agent.name.as_deref().unwrap_or("N/A"))?;
            writeln!(out, "  Model: {}", agent.model.as_deref().unwrap_or("N/A"))?;
        }
        Err(e) => {
            writeln!(out, "✗ Agent not found or error retrieving: {e}")?;
            writeln!(out, "\nTrying to list all agents in the project...")?;
            match client.list_agents().await {
                Ok(agents) if agents.is_empty() => {
                    writeln!(out, "❌ NO AGENTS FOUND in this project")?;
                    writeln!(out, "\nYou need to create an agent first!")?;
                }
                Ok(agents) => {
                    writeln!(out, "✓ Found {} agent(s):", agents.len())?;
                    for a in &agents {
                        writeln!(out, "  → {}", a.id)?;
                        if let Some(name) = &a.name {
                            writeln!(out, "    Name: {name}")?;
                        }
                    }
                }
                Err(list_error) => writeln!(out, "✗ Failed to list agents: {list_error}")?,
            }
        }
    }

    banner(out, 6, "Test Agent Call", true)?;
    if let Err(e) = test_round_trip(&client, &settings.agent_id, test_message, out).await? {
        writeln!(out, "✗ Test failed: {e}")?;
    }

    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{rule}")?;
    writeln!(out, "✅ Debug Complete!")?;
    writeln!(out, "{rule}")?;

    Ok(DiagnosticsOutcome::ok())
}

// Outer result is the writer, inner result is the agent service
async fn test_round_trip<W: Write>(
    client: &AgentsClient,
    agent_id: &str,
    test_message: &str,
    out: &mut W,
) -> io::Result<Result<(), crate::error::AgentError>> {
    writeln!(out, "Creating thread...")?;
    let thread = match client.create_thread().await {
        Ok(thread) => thread,
        Err(e) => return Ok(Err(e)),
    };
    writeln!(out, "✓ Thread created: {}", thread.id)?;

    writeln!(out, "Sending test message...")?;
    if let Err(e) = client.create_message(&thread.id, "user", test_message).await {
        return Ok(Err(e));
    }
    writeln!(out, "✓ Message sent")?;

    writeln!(out, "Running agent...")?;
    let run = match client.create_and_process_run(&thread.id, agent_id).await {
        Ok(run) => run,
        Err(e) => return Ok(Err(e)),
    };
    writeln!(out, "✓ Run completed with status: {}", run.status)?;

    if run.is_failed() {
        writeln!(out, "❌ Run failed: {}", run.error_detail())?;
        return Ok(Ok(()));
    }

    writeln!(out, "✓ Getting agent response...")?;
    let messages = match client.list_messages(&thread.id, ListOrder::Desc).await {
        Ok(messages) => messages,
        Err(e) => return Ok(Err(e)),
    };

    match extract_assistant_response(&messages) {
        Some(text) => {
            writeln!(out, "✓ Assistant response received")?;
            writeln!(out, "  Content: {text}")?;
        }
        None => writeln!(out, "⚠️  No assistant text found in {} message(s)", messages.len())?,
    }

    Ok(Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(endpoint: Option<&str>) -> Config {
        let endpoint = endpoint.map(str::to_string);
        Config::from_lookup(
            move |key| match key {
                "AZURE_SUBSCRIPTION_ID" => Some("sub-1".into()),
                "AZURE_RESOURCE_GROUP" => Some("rg-1".into()),
                "AZURE_PROJECT_NAME" => Some("sagealpha".into()),
                "AZURE_PROJECT_ENDPOINT" => endpoint.clone(),
                "AZURE_MANAGEMENT_URL" => endpoint.clone(),
                "AZURE_AGENT_ID" => Some("asst_1".into()),
                "RUN_POLL_INTERVAL_MS" => Some("5".into()),
                _ => None,
            },
            &FileConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_display_value_truncates() {
        let long = "x".repeat(60);
        assert_eq!(display_value(Some(&long)), format!("{}...", "x".repeat(50)));
        assert_eq!(display_value(Some("short")), "short");
        assert_eq!(display_value(None), "(not set)");
    }

    #[tokio::test]
    async fn test_missing_environment_stops_early() {
        let config = config_for(None);
        let mut out = Vec::new();
        let outcome = run_diagnostics(
            &config,
            Arc::new(Credential::static_token("t")),
            DEFAULT_TEST_MESSAGE,
            &mut out,
        )
        .await
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(outcome.exit_code, 1);
        assert!(text.contains("✗ AZURE_PROJECT_ENDPOINT: (not set)"));
        assert!(text.contains("❌ MISSING VARIABLES: AZURE_PROJECT_ENDPOINT"));
        assert!(!text.contains("STEP 2"));
    }

    #[tokio::test]
    async fn test_full_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.MachineLearningServices/workspaces",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"name": "sagealpha", "id": "ws-1"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/assistants/asst_1"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/assistants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "asst_other", "name": "Analyst"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_9"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_9/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1", "role": "user"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_9/runs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "run_9", "status": "completed"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/threads/thread_9/messages"))
            .and(query_param("order", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"role": "assistant", "content": [{"type": "text", "text": {"value": "2+2 is 4."}}]},
                    {"role": "user", "content": "Hello, what is 2+2?"}
                ]
            })))
            .mount(&server)
            .await;

        let config = config_for(Some(&server.uri()));
        let mut out = Vec::new();
        let outcome = run_diagnostics(
            &config,
            Arc::new(Credential::static_token("t")),
            DEFAULT_TEST_MESSAGE,
            &mut out,
        )
        .await
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(text.contains("✓ This matches your AZURE_PROJECT_NAME"));
        assert!(text.contains("✗ Agent not found"));
        assert!(text.contains("  → asst_other"));
        assert!(text.contains("    Name: Analyst"));
        assert!(text.contains("✓ Thread created: thread_9"));
        assert!(text.contains("  Content: 2+2 is 4."));
        assert!(text.contains("✅ Debug Complete!"));
    }

    #[tokio::test]
    async fn test_failed_run_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_9"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_9/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"role": "user"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_9/runs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_9",
                "status": "failed",
                "last_error": {"message": "model deployment not found"}
            })))
            .mount(&server)
            .await;

        let config = config_for(Some(&server.uri()));
        let mut out = Vec::new();
        let outcome = run_diagnostics(
            &config,
            Arc::new(Credential::static_token("t")),
            DEFAULT_TEST_MESSAGE,
            &mut out,
        )
        .await
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(text.contains("✗ Failed to list projects"));
        assert!(text.contains("❌ Run failed: model deployment not found"));
        assert!(text.contains("✅ Debug Complete!"));
    }
}
