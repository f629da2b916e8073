//! Table store contract.
//!
//! The store is a dumb, field-addressable document keyed by room code with
//! a fixed time-to-live measured from creation. It enforces no game rules;
//! every operation is single-document and linearizable per document, and
//! every mutation returns the resulting document the way the wire layer
//! wants to broadcast it.

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryTableStore;

use crate::game::entities::{Participant, ParticipantId, RouletteColor, Table};

/// Store-level errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Document absent or expired
    #[error("document not found")]
    NotFound,

    /// Create hit an existing live document
    #[error("document already exists")]
    Conflict,

    /// The backing store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A targeted overwrite of a single field or participant sub-field.
///
/// These are the only paths commands ever touch, the document-store
/// equivalent of patching `.hasStarted` or `.participants.<id>.bet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TablePatch {
    /// Flip the round-phase flag
    HasStarted(bool),
    /// Upsert a whole participant entry
    Participant(ParticipantId, Participant),
    /// Overwrite one participant's bet
    Bet(ParticipantId, i64),
    /// Overwrite one participant's color pick
    ChosenColor(ParticipantId, RouletteColor),
    /// Overwrite one participant's balance
    Credits(ParticipantId, i64),
}

/// A targeted removal of a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableField {
    /// Remove a participant entry; idempotent when already absent
    Participant(ParticipantId),
}

/// Durable, TTL-bounded storage of one `Table` document per room.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Persist a new table under its id with the store's TTL.
    ///
    /// Fails with `Conflict` if a live document already holds the id.
    async fn create(&self, table: Table) -> StoreResult<Table>;

    /// Fetch the current table. Fails with `NotFound` when the document is
    /// absent or its TTL has elapsed.
    async fn get(&self, table_id: &str) -> StoreResult<Table>;

    /// Atomically overwrite one field and return the updated table.
    ///
    /// Patching a sub-field of a participant that does not exist fails with
    /// `NotFound`, the same as patching a missing document.
    async fn patch_field(&self, table_id: &str, patch: TablePatch) -> StoreResult<Table>;

    /// Atomically remove one field and return the updated table.
    async fn delete_field(&self, table_id: &str, field: TableField) -> StoreResult<Table>;
}
