//! Integration tests for duet-relay.
//!
//! - `test_relay_sessions` - two sessions negotiate over the relay, a third is turned away
//! - `test_publish_acks` - numbered publishes are acknowledged or refused with their number

mod test_relay_sessions;

use duet_relay::{RelayConfig, RelayService};
use tokio::task::JoinHandle;
use tracing::Level;

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Start a relay on an ephemeral port.
///
/// Returns the WebSocket URL and the server task.
pub async fn start_relay(config: RelayConfig) -> anyhow::Result<(String, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let service = RelayService::new(config);

    let server = tokio::spawn(async move {
        if let Err(e) = duet_relay::serve(listener, service).await {
            tracing::error!("Relay stopped: {}", e);
        }
    });

    Ok((format!("ws://{}/ws", addr), server))
}
