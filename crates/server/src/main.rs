mod api;
mod state;

use crate::state::AppState;
use axum::routing::post;
use std::sync::Arc;
use tracing::info;

const PORT: u32 = 3000;
const DEFAULT_UPSTREAM: &str = "https://services.siamgpstrack.com";

/// Pass-through relay for the Siam GPS vendor. The browser-facing client
/// posts here instead of straight at the vendor so the bearer token stays
/// out of browser-visible requests; nothing is analyzed or rewritten.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let upstream =
        std::env::var("SIAMGPS_UPSTREAM").unwrap_or_else(|_| DEFAULT_UPSTREAM.to_string());
    info!("Relaying Siam GPS requests to {upstream}");

    let state = Arc::new(AppState {
        client: reqwest::Client::new(),
        upstream,
    });

    let app = axum::Router::new()
        .route("/siamgps/route-history", post(api::route_history))
        .route("/siamgps/realtime/{vehicle_id}", post(api::realtime))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", PORT))
        .await
        .unwrap();
    info!("Listening to port {PORT}");
    axum::serve(listener, app).await.unwrap();
}
