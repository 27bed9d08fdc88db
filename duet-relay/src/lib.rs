mod config;
mod error;
mod room;
mod signaling;

pub use config::*;
pub use error::*;
pub use room::*;
pub use signaling::*;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};

/// Маршруты релея: `/ws` для клиентов и `/health` для проверки живости.
pub fn router(service: RelayService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .with_state(service)
}

/// Serves the relay on an already bound listener until the task is dropped.
pub async fn serve(listener: tokio::net::TcpListener, service: RelayService) -> std::io::Result<()> {
    axum::serve(listener, router(service)).await
}
