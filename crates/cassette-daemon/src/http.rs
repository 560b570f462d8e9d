//! Optional read-only HTTP surface for scripting and debugging: the same
//! state snapshot the socket broadcasts, plus a health probe. Commands go
//! through the socket only.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use cassette_proto::state::{PlayerState, StateManager};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "cassette-daemon".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn state(State(state_manager): State<Arc<StateManager>>) -> Json<PlayerState> {
    Json(state_manager.get_state().await)
}

pub fn start_server(
    bind_address: String,
    port: u16,
    state_manager: Arc<StateManager>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = Router::new()
            .route("/api/health", get(health))
            .route("/api/state", get(state))
            .layer(CorsLayer::permissive())
            .with_state(state_manager);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP listener {}: {}", addr, e);
                return;
            }
        };
        info!("HTTP API listening at http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}
