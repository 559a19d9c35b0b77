use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "webcapture")]
#[command(about = "Headless web page capture service")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Port for the capture endpoint")]
    pub port: Option<u16>,

    #[arg(long, help = "Maximum pages held open at once")]
    pub pool_capacity: Option<usize>,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Serve Prometheus metrics on this port")]
    pub metrics_port: Option<u16>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

/// Resolves the effective configuration.
///
/// Precedence, lowest to highest: built-in defaults, JSON config file,
/// `PORT` / `CHROME_PATH` environment variables, CLI flags.
pub async fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        let content = tokio::fs::read_to_string(config_path)
            .await
            .with_context(|| format!("reading config file {}", config_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing config file {}", config_path.display()))?
    } else {
        Config::default()
    };

    if let Ok(port) = std::env::var("PORT") {
        config.port = port.parse().context("PORT must be a port number")?;
    }
    if let Ok(chrome_path) = std::env::var("CHROME_PATH") {
        config.chrome_path = Some(chrome_path);
    }

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(pool_capacity) = args.pool_capacity {
        config.pool_capacity = pool_capacity;
    }
    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }

    config.validate().map_err(anyhow::Error::msg)?;

    info!("Configuration loaded");
    info!("Listening port: {}", config.port);
    info!("Pool capacity: {}", config.pool_capacity);
    info!("Capture timeout: {:?}", config.capture_timeout);
    info!("Idle shutdown: {:?}", config.idle_shutdown);

    Ok(config)
}

pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
