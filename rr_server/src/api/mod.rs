//! HTTP/WebSocket API for the roulette table server.
//!
//! # Architecture
//!
//! - **Axum**: HTTP endpoints and the WebSocket upgrade
//! - **JWT**: a room credential minted by the create/join endpoints and
//!   verified once per connection
//! - **Room registry**: one broadcast group per table; every successful
//!   mutation fans a full table snapshot out to the room
//!
//! # Endpoints
//!
//! ```text
//! GET  /health             - Server health status (public)
//! POST /api/tables         - Create a table, returns a credential
//! POST /api/tables/join    - Join a table, returns a credential
//! GET  /ws?token=<jwt>     - WebSocket session (auth via query token)
//! ```
//!
//! The WebSocket wire is tagged JSON. Inbound commands: `place_bet`,
//! `choose_color`, `remove_participant`, `update_credits`, `start_game`,
//! `end_game`, `roulette_number`. Outbound events: `table_updated` (full
//! snapshot, receivers replace their local view), `participant_removed`,
//! `game_number`, and unicast `exception`.

pub mod driver;
pub mod rate_limiter;
pub mod rooms;
pub mod tables;
pub mod websocket;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use rapid_roulette::{AuthManager, TablesService};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use self::rooms::RoomRegistry;
use crate::config::RoundConfig;

/// Application state shared across all HTTP handlers and WebSocket
/// connections. Cloned per request; cheap due to the Arc wrappers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthManager>,
    pub tables: Arc<TablesService>,
    pub rooms: Arc<RoomRegistry>,
    pub round: RoundConfig,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // WebSocket route handles its own auth via query parameter
        .route("/ws", get(websocket::websocket_handler))
        .route("/api/tables", post(tables::create_table))
        .route("/api/tables/join", post(tables::join_table))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": state.rooms.room_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
