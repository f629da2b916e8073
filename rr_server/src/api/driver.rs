//! Round driver: the live number stream between start and settlement.
//!
//! Once a round starts, a driver task ticks on a fixed interval, draws a
//! pocket, broadcasts it as a cosmetic `game_number` event, and stops with
//! a fixed per-tick probability; round length is geometric and unbounded.
//! The final pocket decides the settlement color.
//!
//! The registry owns the driver's abort handle: the task dies when the room
//! empties, when the admin connection that started it disconnects, or when
//! the admin settles manually with `end_game`.

use std::time::Duration;

use rapid_roulette::game::wheel;

use super::AppState;
use super::rooms::ServerEvent;
use crate::metrics;

/// Spawn a round driver for a table and register it with the room.
pub(crate) fn spawn_round(state: &AppState, table_id: &str, owner: &str) {
    let task_state = state.clone();
    let task_table_id = table_id.to_string();
    let handle = tokio::spawn(async move {
        run_round(task_state, task_table_id).await;
    });
    state.rooms.install_driver(table_id, owner, handle.abort_handle());
}

/// Tick out numbers until the stop draw hits, then settle.
async fn run_round(state: AppState, table_id: String) {
    let mut ticker = tokio::time::interval(Duration::from_millis(state.round.tick_ms));

    let final_pocket = loop {
        ticker.tick().await;
        let pocket = wheel::random_pocket();
        state
            .rooms
            .broadcast(&table_id, ServerEvent::GameNumber { number: pocket });
        if rand::random_bool(state.round.stop_probability) {
            break pocket;
        }
    };

    let color = match wheel::color_of(final_pocket) {
        Ok(color) => color,
        Err(err) => {
            tracing::error!(table_id, final_pocket, error = %err, "drew a pocket off the wheel");
            return;
        }
    };

    match state.tables.settle_round(&table_id, color).await {
        Ok(table) => {
            tracing::info!(table_id, ?color, final_pocket, "round settled");
            metrics::round_settled();
            state
                .rooms
                .broadcast(&table_id, ServerEvent::TableUpdated { table });
        }
        Err(err) => {
            // the admin can retry with end_game; the table may be mixed
            // until then (per-participant settlement writes are not atomic)
            tracing::warn!(table_id, error = %err, "driver settlement failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::rooms::RoomRegistry;
    use crate::config::RoundConfig;
    use chrono::Duration as ChronoDuration;
    use rapid_roulette::{
        AuthManager, MemoryTableStore, RouletteColor, TablesService,
    };
    use std::sync::Arc;

    fn test_state(stop_probability: f64) -> AppState {
        AppState {
            auth: Arc::new(AuthManager::new(
                "test_secret_key_for_testing_only_0123".to_string(),
                ChronoDuration::hours(2),
            )),
            tables: Arc::new(TablesService::new(Arc::new(MemoryTableStore::new(
                Duration::from_secs(3600),
            )))),
            rooms: Arc::new(RoomRegistry::new()),
            round: RoundConfig {
                tick_ms: 50,
                stop_probability,
            },
        }
    }

    #[tokio::test]
    async fn test_driver_broadcasts_then_settles() {
        // stop probability 1.0 makes the round exactly one tick long
        let state = test_state(1.0);
        let created = state.tables.create_table(1000, 100).await.unwrap();
        let table_id = created.table.id.clone();

        state
            .tables
            .add_participant(&table_id, &created.admin_id, "Admin")
            .await
            .unwrap();
        state
            .tables
            .choose_color(&table_id, &created.admin_id, RouletteColor::Red)
            .await
            .unwrap();
        state.tables.start_round(&table_id).await.unwrap();

        let mut events = state.rooms.join(&table_id);
        run_round(state.clone(), table_id.clone()).await;

        let first = events.recv().await.unwrap();
        let pocket = match first {
            ServerEvent::GameNumber { number } => number,
            other => panic!("expected game_number first, got {other:?}"),
        };
        assert!((0..=36).contains(&pocket));

        match events.recv().await.unwrap() {
            ServerEvent::TableUpdated { table } => {
                assert!(!table.has_started);
                assert_eq!(
                    table.participants[&created.admin_id].chosen_color,
                    RouletteColor::None
                );
            }
            other => panic!("expected table_updated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_driver_settlement_matches_final_pocket_color() {
        let state = test_state(1.0);
        let created = state.tables.create_table(1000, 100).await.unwrap();
        let table_id = created.table.id.clone();

        state
            .tables
            .add_participant(&table_id, &created.admin_id, "Admin")
            .await
            .unwrap();
        state
            .tables
            .place_bet(&table_id, &created.admin_id, 100)
            .await
            .unwrap();
        state
            .tables
            .choose_color(&table_id, &created.admin_id, RouletteColor::Red)
            .await
            .unwrap();
        state.tables.start_round(&table_id).await.unwrap();

        let mut events = state.rooms.join(&table_id);
        run_round(state.clone(), table_id.clone()).await;

        let pocket = match events.recv().await.unwrap() {
            ServerEvent::GameNumber { number } => number,
            other => panic!("expected game_number, got {other:?}"),
        };
        let winner = wheel::color_of(pocket).unwrap();

        let table = state.tables.get_table(&table_id).await.unwrap();
        let expected = if winner == RouletteColor::Red {
            1100
        } else {
            900
        };
        assert_eq!(table.participants[&created.admin_id].credits, expected);
    }
}
