mod rendezvous_service;
mod ws_handler;

pub use rendezvous_service::RendezvousService;
pub use ws_handler::ws_handler;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

/// Router exposing the rendezvous WebSocket at `/ws`.
pub fn router(service: RendezvousService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(service)
}

/// Serves the rendezvous router until the listener fails.
pub async fn serve(listener: TcpListener, service: RendezvousService) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Rendezvous service listening on ws://{}/ws", addr);
    }
    axum::serve(listener, router(service)).await
}
