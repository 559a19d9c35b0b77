use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use webcapture::{
    gateway, install_prometheus, load_config, setup_logging, CaptureBridge, CaptureService,
    ChromiumRenderer, Cli,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose);

    info!("Starting webcapture v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;

    // The recorder must be in place before any metric handles are created.
    if let Some(metrics_port) = args.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], metrics_port));
        install_prometheus(addr)?;
    }

    let service = Arc::new(CaptureService::new(Arc::new(ChromiumRenderer), config.clone()));
    let bridge = CaptureBridge::start(service.clone());

    gateway::serve(bridge, config.port).await?;

    info!("Shutting down...");
    service.shutdown().await;

    info!("webcapture stopped");
    Ok(())
}
