//! Table service implementation.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::game::entities::{self, ParticipantId, RouletteColor, Table};
use crate::game::state_machine::{GameError, GameResult};
use crate::store::{TableField, TablePatch, TableStore};

/// How many room codes to try before giving up on creation. A collision is
/// practically unreachable with a 36^6 code space; the retry exists because
/// the store still reports it.
const CREATE_ATTEMPTS: usize = 3;

/// A freshly created table together with its admin's participant id.
#[derive(Debug, Clone)]
pub struct CreatedTable {
    pub table: Table,
    pub admin_id: ParticipantId,
}

/// Command service over the table store.
///
/// Every method re-reads the authoritative document, validates the command
/// against it, then persists targeted patches. Identity rules are layered
/// above in the gateway; this service only knows phase and value rules.
#[derive(Clone)]
pub struct TablesService {
    store: Arc<dyn TableStore>,
}

impl TablesService {
    /// Create a new service over the given store.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Create a table with a generated room code and admin id.
    ///
    /// The creator becomes the admin but is not yet a participant; their
    /// roster entry is created when their connection is admitted.
    ///
    /// # Errors
    ///
    /// * `Conflict` - every generated code collided with a live table
    /// * `StoreUnavailable` - the store write failed
    pub async fn create_table(&self, initial_credits: i64, max_bet: i64) -> GameResult<CreatedTable> {
        let admin_id = entities::new_participant_id();
        let mut last_err = GameError::Conflict;
        for _ in 0..CREATE_ATTEMPTS {
            let code = entities::new_table_code();
            let table = Table::new(code.clone(), admin_id.clone(), initial_credits, max_bet);
            match self.store.create(table).await {
                Ok(table) => {
                    info!("created table {} (admin {})", table.id, admin_id);
                    return Ok(CreatedTable { table, admin_id });
                }
                Err(err) => {
                    last_err = err.into();
                    if last_err != GameError::Conflict {
                        return Err(last_err);
                    }
                    warn!("room code {code} collided, retrying");
                }
            }
        }
        Err(last_err)
    }

    /// Mint a participant id for joining an existing table.
    ///
    /// Verifies the table is still live; the roster entry itself is created
    /// at connection admission, not here.
    pub async fn join_table(&self, table_id: &str) -> GameResult<ParticipantId> {
        self.store.get(table_id).await?;
        Ok(entities::new_participant_id())
    }

    /// Fetch the current table.
    pub async fn get_table(&self, table_id: &str) -> GameResult<Table> {
        Ok(self.store.get(table_id).await?)
    }

    /// Admit a participant and return the updated table.
    pub async fn add_participant(
        &self,
        table_id: &str,
        participant_id: &str,
        name: &str,
    ) -> GameResult<Table> {
        let mut table = self.store.get(table_id).await?;
        let participant = table.add_participant(participant_id, name);
        let updated = self
            .store
            .patch_field(
                table_id,
                TablePatch::Participant(participant_id.to_string(), participant),
            )
            .await?;
        info!("participant {participant_id} joined table {table_id}");
        Ok(updated)
    }

    /// Remove a participant.
    ///
    /// Returns `Ok(None)` when the removal is deferred (round in progress,
    /// or the admin while others remain); the caller retries on a later
    /// removal attempt after settlement and must not broadcast anything.
    pub async fn remove_participant(
        &self,
        table_id: &str,
        participant_id: &str,
    ) -> GameResult<Option<Table>> {
        let table = self.store.get(table_id).await?;
        if !table.removable(participant_id) {
            debug!("removal of {participant_id} from table {table_id} deferred");
            return Ok(None);
        }
        let updated = self
            .store
            .delete_field(table_id, TableField::Participant(participant_id.to_string()))
            .await?;
        info!("participant {participant_id} removed from table {table_id}");
        Ok(Some(updated))
    }

    /// Place a bet and return the updated table.
    pub async fn place_bet(
        &self,
        table_id: &str,
        participant_id: &str,
        amount: i64,
    ) -> GameResult<Table> {
        let mut table = self.store.get(table_id).await?;
        table.place_bet(participant_id, amount)?;
        let updated = self
            .store
            .patch_field(table_id, TablePatch::Bet(participant_id.to_string(), amount))
            .await?;
        Ok(updated)
    }

    /// Pick a color and return the updated table.
    pub async fn choose_color(
        &self,
        table_id: &str,
        participant_id: &str,
        color: RouletteColor,
    ) -> GameResult<Table> {
        let mut table = self.store.get(table_id).await?;
        table.choose_color(participant_id, color)?;
        let updated = self
            .store
            .patch_field(
                table_id,
                TablePatch::ChosenColor(participant_id.to_string(), color),
            )
            .await?;
        Ok(updated)
    }

    /// Overwrite a participant's balance and return the updated table.
    pub async fn update_credits(
        &self,
        table_id: &str,
        participant_id: &str,
        credits: i64,
    ) -> GameResult<Table> {
        let mut table = self.store.get(table_id).await?;
        table.update_credits(participant_id, credits)?;
        let updated = self
            .store
            .patch_field(
                table_id,
                TablePatch::Credits(participant_id.to_string(), credits),
            )
            .await?;
        Ok(updated)
    }

    /// Begin a round and return the updated table.
    pub async fn start_round(&self, table_id: &str) -> GameResult<Table> {
        let mut table = self.store.get(table_id).await?;
        table.start_round()?;
        let updated = self
            .store
            .patch_field(table_id, TablePatch::HasStarted(true))
            .await?;
        info!("round started on table {table_id}");
        Ok(updated)
    }

    /// Settle the round against the winning color and return the updated
    /// table.
    ///
    /// Settlement is one participant write per participant plus the phase
    /// flip; the sequence is not atomic as a whole, so a removal racing a
    /// settlement can observe a partially settled roster. Accepted for this
    /// domain; a failed write mid-sequence surfaces as `StoreUnavailable`
    /// and leaves the table mixed until the admin settles again.
    pub async fn settle_round(
        &self,
        table_id: &str,
        winning_color: RouletteColor,
    ) -> GameResult<Table> {
        let mut table = self.store.get(table_id).await?;
        table.settle_round(winning_color)?;
        for (id, participant) in &table.participants {
            self.store
                .patch_field(
                    table_id,
                    TablePatch::Participant(id.clone(), participant.clone()),
                )
                .await?;
        }
        let updated = self
            .store
            .patch_field(table_id, TablePatch::HasStarted(false))
            .await?;
        info!("round settled on table {table_id} with {winning_color:?}");
        Ok(updated)
    }
}
