/// Duet messaging client - Main entry point
use duet_client::{app, Config};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    // Parse configuration
    let args: Vec<String> = env::args().collect();
    let config = Config::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    info!("Starting Duet messaging client");
    info!("   Store service: {}", config.store_url);

    // Run the client shell (blocks until quit)
    app::run(config).await
        .map_err(|e| anyhow::anyhow!("Client error: {}", e))?;

    Ok(())
}
