// src/bin/diagnose.rs
// Interactive checks against the agent account

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

use sagealpha::agents::credential::Credential;
use sagealpha::config::{Config, FileConfig};
use sagealpha::diagnostics::{DEFAULT_TEST_MESSAGE, run_diagnostics};

#[derive(Parser)]
#[command(name = "sagealpha-diagnose")]
#[command(about = "Check credentials, projects and the configured agent")]
struct Args {
    /// Message sent during the end-to-end test
    #[arg(long, env = "SAGEALPHA_TEST_MESSAGE", default_value = DEFAULT_TEST_MESSAGE)]
    message: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Status lines go to stdout; keep library logs quiet unless asked for
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let config = Config::from_env(&FileConfig::load())?;
    let credential = Arc::new(Credential::new(config.access_token.clone()));

    let mut out = std::io::stdout();
    let outcome = run_diagnostics(&config, credential, &args.message, &mut out).await?;

    std::process::exit(outcome.exit_code);
}
