//! Roulette game core - entities, transition rules, and the wheel.
//!
//! This module provides the foundational game implementation:
//! - The `Table` aggregate and its `Participant` roster
//! - Phase- and range-checked transitions (betting, color picks, round
//!   start and settlement)
//! - The pocket-to-color wheel mapping

pub mod entities;
pub mod state_machine;
pub mod wheel;

pub use entities::{Participant, ParticipantId, RouletteColor, Table, TableId};
pub use state_machine::{GameError, GameResult};
