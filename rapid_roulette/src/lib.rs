//! # Rapid Roulette
//!
//! A multiplayer roulette table coordinator: a small group of participants
//! share one table document, place bets and color picks during the lobby
//! phase, and the table admin drives a round that ends with a settlement.
//!
//! The library is transport-agnostic. It provides the pieces a server wires
//! together:
//!
//! - [`game`]: the `Table` aggregate, its phase/value transition rules, and
//!   the roulette wheel mapping
//! - [`store`]: the TTL-bounded, field-addressable table store contract and
//!   its in-memory implementation
//! - [`tables`]: the command service that applies validated transitions
//!   through the store
//! - [`auth`]: the signed room credential (issue/verify)
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rapid_roulette::store::MemoryTableStore;
//! use rapid_roulette::tables::TablesService;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), rapid_roulette::game::GameError> {
//! let store = Arc::new(MemoryTableStore::new(Duration::from_secs(7200)));
//! let tables = TablesService::new(store);
//! let created = tables.create_table(1000, 100).await?;
//! assert_eq!(created.table.initial_credits, 1000);
//! # Ok(())
//! # }
//! ```

/// Credential issuing and verification for table access tokens.
pub mod auth;

/// Core game entities, transition rules, and the roulette wheel.
pub mod game;

/// Table store contract and in-memory TTL implementation.
pub mod store;

/// Table command service built on the store and the state machine.
pub mod tables;

pub use auth::{AccessTokenClaims, AuthManager};
pub use game::{
    GameError, GameResult, Participant, RouletteColor, Table,
    entities::{self, ParticipantId, TableId},
    wheel,
};
pub use store::{MemoryTableStore, TableStore};
pub use tables::{CreatedTable, TablesService};
