//! Roulette table server binary.
//!
//! Wires the in-memory TTL table store, the credential manager, and the
//! room registry into the axum HTTP/WebSocket API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use pico_args::Arguments;
use rapid_roulette::{AuthManager, MemoryTableStore, TablesService};
use rr_server::api::rooms::RoomRegistry;
use rr_server::config::ServerConfig;
use rr_server::{api, logging, metrics};

const HELP: &str = "\
Run a roulette table server

USAGE:
  rr_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8090]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8090)
  METRICS_BIND             Optional Prometheus exporter bind address
  JWT_SECRET               JWT signing secret (required, >= 32 chars)
  SESSION_DURATION_SECS    Table TTL and credential lifetime  [default: 7200]
  ROUND_TICK_MS            Interval between number broadcasts [default: 400]
  ROUND_STOP_PROBABILITY   Chance each tick ends the round    [default: 0.12]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }
    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;

    logging::init();

    let config = ServerConfig::from_env(bind_override)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        tracing::info!("Metrics exporter listening on {addr}");
    }

    let session_duration = Duration::from_secs(config.session_duration_secs);
    let store = Arc::new(MemoryTableStore::new(session_duration));
    let tables = Arc::new(TablesService::new(store));
    let auth = Arc::new(AuthManager::new(
        config.security.jwt_secret.clone(),
        chrono::Duration::seconds(config.session_duration_secs as i64),
    ));
    let rooms = Arc::new(RoomRegistry::new());

    let state = api::AppState {
        auth,
        tables,
        rooms,
        round: config.round,
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {e}", config.bind))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    tracing::info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
