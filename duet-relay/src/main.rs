use anyhow::{Context, Result};
use duet_relay::{RelayConfig, RelayService};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RelayConfig::from_env().context("Invalid relay configuration")?;
    info!(
        capacity = config.room_capacity,
        max_message_size = config.max_message_size,
        "Initializing relay..."
    );

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Relay listening on ws://{}/ws", listener.local_addr()?);

    duet_relay::serve(listener, RelayService::new(config))
        .await
        .context("Relay server failed")
}
