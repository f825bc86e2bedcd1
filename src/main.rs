use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod balancer;
mod config;
mod error;
mod proxy;
mod routing;
mod server;

use config::{GatewayConfig, LogLevel};
use server::Gateway;

#[derive(Parser, Debug)]
#[command(name = "api-gateway")]
#[command(about = "A simple API gateway")]
struct Cli {
    /// Config file path
    #[arg(long, global = true, default_value = "./config.json")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the API gateway server
    Start {
        /// Validate the configuration and exit
        #[arg(long)]
        validate_config: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Start { validate_config } => start(&cli.config, validate_config).await,
    }
}

async fn start(config_path: &str, validate_only: bool) -> Result<()> {
    let config = GatewayConfig::load(config_path).await?;

    init_tracing(config.gateway.log_level);

    if validate_only {
        info!("Configuration is valid");
        return Ok(());
    }

    info!(services = config.services.len(), "Starting API gateway");

    Gateway::new(config)?.run().await?;

    info!("API gateway shutdown complete");
    Ok(())
}

/// RUST_LOG overrides the configured log level when set.
fn init_tracing(level: LogLevel) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_str())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
