use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use my_cloud_client::cli::{run_command, Cli};
use my_cloud_client::config::Config;
use my_cloud_client::Client;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stderr keeps command output clean
    let log_level = cli.log_level.clone().unwrap_or_else(|| "warn".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config.api_base_url = api_url.trim_end_matches('/').to_string();
    }
    tracing::debug!(api = %config.api_base_url, "Configuration loaded");

    let client = Client::open(config)?;
    run_command(&cli, &client).await
}
