//! envhub CLI — the main entry point.
//!
//! Commands:
//! - `init`   — Write a default config file
//! - `serve`  — Start the HTTP server

use clap::{Parser, Subcommand};
use envhub_config::AppConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "envhub",
    about = "envhub — file workspaces with a model conversation attached",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to ~/.envhub/config.toml
    Init,

    /// Start the HTTP server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Use a specific config file instead of ~/.envhub/config.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => init()?,
        Commands::Serve { port, config } => serve(port, config).await?,
    }

    Ok(())
}

fn init() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", config_path.display());
    println!("Set your API key there or export ENVHUB_API_KEY.");
    Ok(())
}

async fn serve(port: Option<u16>, config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => AppConfig::load_from(&path)?,
        None => AppConfig::load()?,
    };

    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::debug!(?config, "Loaded configuration");
    envhub_gateway::start(config).await
}
