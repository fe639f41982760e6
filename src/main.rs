//! ClawBridge - OpenClaw session adapter and event bridge
//!
//! Serves the control API and runs the event bridge against a platform
//! deployment.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clawbridge::{
    api::{build_app, ApiState},
    bus::{MemoryBus, MessageBus},
    config::ClawBridgeConfig,
    context::Registry,
    platform::HttpPlatformClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clawbridge")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "OpenClaw session adapter and event bridge for the Dash agent platform")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CLAWBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the control API and event bridge
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },

    /// Validate the configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("clawbridge={},tower_http=info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &cli.config {
        Some(path) => ClawBridgeConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ClawBridgeConfig::default(),
    };

    match cli.command {
        Commands::Serve { host, port } => run_server(config, host, port).await?,
        Commands::Config { default } => show_config(if default { None } else { Some(&config) })?,
        Commands::Check => {
            config.validate()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}

async fn run_server(
    mut config: ClawBridgeConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!(platform = %config.platform.base_url, "Starting ClawBridge");

    let platform = Arc::new(HttpPlatformClient::new(&config.platform)?);
    let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());
    let registry = Arc::new(Registry::new());
    registry.init(&config, platform, bus.clone())?;

    let app = build_app(ApiState {
        registry: registry.clone(),
        bus,
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("ClawBridge listening on http://{}. Press Ctrl+C to stop.", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    tracing::info!("Shutting down...");
    for warning in registry.shutdown().await {
        tracing::warn!("{}", warning);
    }

    Ok(())
}

fn show_config(config: Option<&ClawBridgeConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
