use boxlink_server::{RelayState, router};
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn};

/// Listen address from `BOXLINK_RELAY_ADDR`, falling back to the default.
fn listen_addr() -> SocketAddr {
    let fallback = SocketAddr::from(([0, 0, 0, 0], 3030));
    match std::env::var("BOXLINK_RELAY_ADDR") {
        Ok(value) => value.parse().unwrap_or_else(|e| {
            warn!("Ignoring BOXLINK_RELAY_ADDR={:?}: {}; using {}", value, e, fallback);
            fallback
        }),
        Err(_) => fallback,
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxlink_server=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(RelayState::new());
    let addr = listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("BoxLink relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router(state)).await
}
