use anyhow::Context;
use docsearch::{AppConfig, HttpServer, Services};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Docsearch v{}", docsearch::version());

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // First argument, then DOCSEARCH_CONFIG, names an optional YAML file
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("DOCSEARCH_CONFIG").map(PathBuf::from));

    let config = AppConfig::load(config_path.as_deref()).context("invalid configuration")?;
    let services = Services::from_config(&config).context("failed to create service clients")?;

    let server = HttpServer::new(Arc::new(services), config.server.bind.clone(), config.server.port);
    server.start().await.context("server stopped")?;
    Ok(())
}
