//! In-memory table store with per-document expiry.
//!
//! Documents live in a map behind a single lock, which serializes every
//! read and write per process and gives the linearizable per-document
//! history the coordinator relies on. Expiry is lazy: a document past its
//! deadline is dropped by whichever operation touches it next. The clock is
//! `tokio::time`, so tests can pause and advance it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::time::Instant;

use super::{StoreError, StoreResult, TableField, TablePatch, TableStore};
use crate::game::entities::Table;

struct StoredTable {
    table: Table,
    expires_at: Instant,
}

/// In-memory `TableStore` implementation.
pub struct MemoryTableStore {
    entries: Mutex<HashMap<String, StoredTable>>,
    ttl: Duration,
}

impl MemoryTableStore {
    /// Create a store whose documents expire `ttl` after creation.
    ///
    /// The TTL is not renewed by later writes; a table lives exactly one
    /// session from the moment it was created.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of live (unexpired) documents.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.retain(|_, stored| stored.expires_at > now);
        entries.len()
    }

    /// Whether the store holds no live documents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_live_entry<T>(
        &self,
        table_id: &str,
        op: impl FnOnce(&mut StoredTable) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        match entries.get_mut(table_id) {
            Some(stored) if stored.expires_at > Instant::now() => op(stored),
            Some(_) => {
                debug!("table {table_id} expired, dropping");
                entries.remove(table_id);
                Err(StoreError::NotFound)
            }
            None => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn create(&self, table: Table) -> StoreResult<Table> {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("store lock poisoned");
        if let Some(existing) = entries.get(&table.id)
            && existing.expires_at > now
        {
            return Err(StoreError::Conflict);
        }
        debug!("creating table {} with ttl {:?}", table.id, self.ttl);
        entries.insert(
            table.id.clone(),
            StoredTable {
                table: table.clone(),
                expires_at: now + self.ttl,
            },
        );
        Ok(table)
    }

    async fn get(&self, table_id: &str) -> StoreResult<Table> {
        self.with_live_entry(table_id, |stored| Ok(stored.table.clone()))
    }

    async fn patch_field(&self, table_id: &str, patch: TablePatch) -> StoreResult<Table> {
        self.with_live_entry(table_id, |stored| {
            let table = &mut stored.table;
            match patch {
                TablePatch::HasStarted(value) => table.has_started = value,
                TablePatch::Participant(id, participant) => {
                    table.participants.insert(id, participant);
                }
                TablePatch::Bet(id, amount) => {
                    table
                        .participants
                        .get_mut(&id)
                        .ok_or(StoreError::NotFound)?
                        .bet = amount;
                }
                TablePatch::ChosenColor(id, color) => {
                    table
                        .participants
                        .get_mut(&id)
                        .ok_or(StoreError::NotFound)?
                        .chosen_color = color;
                }
                TablePatch::Credits(id, credits) => {
                    table
                        .participants
                        .get_mut(&id)
                        .ok_or(StoreError::NotFound)?
                        .credits = credits;
                }
            }
            Ok(table.clone())
        })
    }

    async fn delete_field(&self, table_id: &str, field: TableField) -> StoreResult<Table> {
        self.with_live_entry(table_id, |stored| {
            match field {
                TableField::Participant(id) => {
                    stored.table.participants.remove(&id);
                }
            }
            Ok(stored.table.clone())
        })
    }
}
