// src/main.rs
// SageAlpha chat relay server

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use sagealpha::agents::build_backend;
use sagealpha::api::http::http_router;
use sagealpha::config::{BackendKind, Config, FileConfig};
use sagealpha::state::AppState;

#[derive(Parser)]
#[command(name = "sagealpha")]
#[command(about = "Finance query chat relay for hosted conversational agents")]
struct Args {
    /// Bind host (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Upstream API shape: agents or completions (overrides SAGEALPHA_BACKEND)
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Verbose logging, same as APP_ENV=development
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // CLI args > env vars > config file > defaults
    let mut config = Config::from_env(&FileConfig::load())?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    config.debug |= args.debug;

    let default_level = if config.debug { "debug" } else { "info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }
    info!("✓ All environment variables validated");

    let backend = build_backend(&config)?;
    info!("✓ Chat backend ready: {}", backend.name());

    let app = http_router(Arc::new(AppState::new(backend)));

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("Starting SageAlpha.ai on http://{}", bind_address);
    info!("Debug mode: {}", config.debug);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
