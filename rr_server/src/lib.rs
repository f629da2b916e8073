//! Roulette table server.
//!
//! Hosts the HTTP create/join endpoints that mint room credentials and the
//! WebSocket session gateway that keeps every participant's view of a table
//! consistent in real time. Table state itself lives in the
//! `rapid_roulette` library; this crate owns the wire.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
