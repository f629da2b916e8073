//! WebSocket session gateway.
//!
//! One connection per participant. The credential presented at upgrade
//! binds the connection to a `(participant, table, name)` triple; that
//! identity is threaded through every command handler rather than held in
//! any shared "current user" state, so connections can never bleed into
//! each other.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws?token=<jwt>`
//! 2. Server verifies the token and binds the identity
//! 3. The connection joins its room's broadcast group and the participant
//!    is admitted to the table; the room sees a fresh snapshot
//! 4. Inbound commands are validated and applied; every successful
//!    mutation broadcasts the full updated table
//! 5. On disconnect the participant is removed (or the removal is deferred
//!    while a round runs) and the room sees the result
//!
//! Command failures never travel to the room: they go back to the sender
//! alone as an `exception{kind, message}` event.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use rapid_roulette::game::{GameError, GameResult, RouletteColor, wheel};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::rate_limiter::CommandRateLimiter;
use super::rooms::ServerEvent;
use super::{AppState, driver};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: String,
}

/// The identity a verified credential binds to one connection.
#[derive(Debug, Clone)]
struct ConnectionIdentity {
    participant_id: String,
    table_id: String,
    name: String,
}

/// Commands accepted over an established connection.
///
/// Admin-only commands are marked; the admin check happens per command
/// against the freshly fetched table, never against cached state.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientCommand {
    /// Stake an amount for the next round
    PlaceBet { amount: i64 },
    /// Pick (or clear) a color for the next round
    ChooseColor { color: RouletteColor },
    /// Evict a participant (admin only)
    RemoveParticipant { id: String },
    /// Overwrite a participant's balance (admin only)
    UpdateCredits { id: String, credits: i64 },
    /// Start the round and its number stream (admin only)
    StartGame,
    /// Settle the round manually with a color (admin only)
    EndGame { color: RouletteColor },
    /// Cosmetic number broadcast with no table effect (admin only)
    RouletteNumber { number: i64 },
}

/// Upgrade to a table session.
///
/// Validates the JWT from the query string; the token's claims decide which
/// table and participant this connection speaks for.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let claims = match state.auth.verify_token(&query.token) {
        Ok(claims) => claims,
        Err(err) => {
            warn!(error = %err, "rejected connection");
            return (StatusCode::UNAUTHORIZED, err.client_message()).into_response();
        }
    };

    let identity = ConnectionIdentity {
        participant_id: claims.sub,
        table_id: claims.table_id,
        name: claims.name,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, identity, state))
}

/// Handle an established connection until it closes.
async fn handle_socket(socket: WebSocket, identity: ConnectionIdentity, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // join the broadcast group before admission so this connection cannot
    // miss the snapshot produced by its own admission
    let mut events = state.rooms.join(&identity.table_id);

    match state
        .tables
        .add_participant(&identity.table_id, &identity.participant_id, &identity.name)
        .await
    {
        Ok(table) => {
            state
                .rooms
                .broadcast(&identity.table_id, ServerEvent::TableUpdated { table });
        }
        Err(err) => {
            warn!(
                table_id = %identity.table_id,
                participant_id = %identity.participant_id,
                error = %err,
                "admission failed"
            );
            if let Ok(json) = serde_json::to_string(&exception_event(&err)) {
                let _ = sender.send(Message::Text(json.into())).await;
            }
            state.rooms.leave(&identity.table_id, &identity.participant_id);
            return;
        }
    }

    info!(
        table_id = %identity.table_id,
        participant_id = %identity.participant_id,
        "connection admitted"
    );
    metrics::connection_opened();

    // unicast lane for error events; room events arrive on the broadcast
    let (unicast_tx, mut unicast_rx) = mpsc::channel::<ServerEvent>(32);

    let own_id = identity.participant_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "slow connection skipped broadcasts");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                unicast = unicast_rx.recv() => match unicast {
                    Some(event) => event,
                    None => break,
                },
            };
            // an eviction of this participant must also end this
            // connection's group membership, or it would keep receiving
            // snapshots it no longer appears in
            let evicted =
                matches!(&event, ServerEvent::ParticipantRemoved { id } if *id == own_id);
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize event");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            if evicted {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    });

    let mut limiter = CommandRateLimiter::per_connection();

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                metrics::command_received();
                if !limiter.allow() {
                    let _ = unicast_tx
                        .send(ServerEvent::Exception {
                            kind: "rate_limited".to_string(),
                            message: "too many commands, slow down".to_string(),
                        })
                        .await;
                    continue;
                }

                let outcome = match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(command) => dispatch_command(&state, &identity, command).await,
                    Err(err) => Err(GameError::InvalidArgument(format!(
                        "malformed command: {err}"
                    ))),
                };

                if let Err(err) = outcome {
                    debug!(
                        participant_id = %identity.participant_id,
                        kind = err.kind(),
                        error = %err,
                        "command rejected"
                    );
                    metrics::command_rejected(err.kind());
                    if unicast_tx.send(exception_event(&err)).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "socket error");
                break;
            }
        }
    }

    // membership and roster leave together: drop out of the broadcast
    // group exactly where the removal is attempted
    send_task.abort();
    state.rooms.leave(&identity.table_id, &identity.participant_id);
    match state
        .tables
        .remove_participant(&identity.table_id, &identity.participant_id)
        .await
    {
        Ok(Some(table)) => {
            state
                .rooms
                .broadcast(&identity.table_id, ServerEvent::TableUpdated { table });
        }
        // round in progress: the roster entry stays until a removal
        // attempt after settlement
        Ok(None) => debug!(
            participant_id = %identity.participant_id,
            "removal deferred until after settlement"
        ),
        // the table expired with the session; nothing left to update
        Err(GameError::NotFound) => {}
        Err(err) => warn!(
            participant_id = %identity.participant_id,
            error = %err,
            "removal on disconnect failed"
        ),
    }

    info!(
        table_id = %identity.table_id,
        participant_id = %identity.participant_id,
        "connection closed"
    );
    metrics::connection_closed();
}

fn exception_event(err: &GameError) -> ServerEvent {
    ServerEvent::Exception {
        kind: err.kind().to_string(),
        message: err.to_string(),
    }
}

/// Re-derive the caller's admin status from the authoritative table.
///
/// Privileged commands call this on every invocation; caching the role on
/// the connection would leave a window where a stale admin keeps driving
/// the round.
async fn ensure_admin(state: &AppState, identity: &ConnectionIdentity) -> GameResult<()> {
    let table = state.tables.get_table(&identity.table_id).await?;
    if table.admin_id != identity.participant_id {
        return Err(GameError::Unauthorized(
            "admin privileges required".to_string(),
        ));
    }
    Ok(())
}

/// Apply one inbound command for the bound identity.
///
/// Successful mutations broadcast the full updated table to the room;
/// errors propagate to the caller and stay unicast.
async fn dispatch_command(
    state: &AppState,
    identity: &ConnectionIdentity,
    command: ClientCommand,
) -> GameResult<()> {
    let table_id = &identity.table_id;
    match command {
        ClientCommand::PlaceBet { amount } => {
            let table = state
                .tables
                .place_bet(table_id, &identity.participant_id, amount)
                .await?;
            state
                .rooms
                .broadcast(table_id, ServerEvent::TableUpdated { table });
        }
        ClientCommand::ChooseColor { color } => {
            let table = state
                .tables
                .choose_color(table_id, &identity.participant_id, color)
                .await?;
            state
                .rooms
                .broadcast(table_id, ServerEvent::TableUpdated { table });
        }
        ClientCommand::RemoveParticipant { id } => {
            ensure_admin(state, identity).await?;
            match state.tables.remove_participant(table_id, &id).await? {
                Some(table) => {
                    // the id-bearing event lets the evicted client leave
                    // locally before the snapshot lands
                    state
                        .rooms
                        .broadcast(table_id, ServerEvent::ParticipantRemoved { id });
                    state
                        .rooms
                        .broadcast(table_id, ServerEvent::TableUpdated { table });
                }
                None => debug!(evicted = %id, "eviction deferred until after settlement"),
            }
        }
        ClientCommand::UpdateCredits { id, credits } => {
            ensure_admin(state, identity).await?;
            let table = state.tables.update_credits(table_id, &id, credits).await?;
            state
                .rooms
                .broadcast(table_id, ServerEvent::TableUpdated { table });
        }
        ClientCommand::StartGame => {
            ensure_admin(state, identity).await?;
            let table = state.tables.start_round(table_id).await?;
            state
                .rooms
                .broadcast(table_id, ServerEvent::TableUpdated { table });
            driver::spawn_round(state, table_id, &identity.participant_id);
        }
        ClientCommand::EndGame { color } => {
            ensure_admin(state, identity).await?;
            state.rooms.abort_driver(table_id);
            let table = state.tables.settle_round(table_id, color).await?;
            metrics::round_settled();
            state
                .rooms
                .broadcast(table_id, ServerEvent::TableUpdated { table });
        }
        ClientCommand::RouletteNumber { number } => {
            ensure_admin(state, identity).await?;
            // numbers off the wheel violate the input contract
            wheel::color_of(number)?;
            state
                .rooms
                .broadcast(table_id, ServerEvent::GameNumber { number });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::rooms::RoomRegistry;
    use crate::config::RoundConfig;
    use chrono::Duration as ChronoDuration;
    use rapid_roulette::{AuthManager, MemoryTableStore, TablesService};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_state() -> AppState {
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
                stop_probability: 1.0,
            },
        }
    }

    async fn admitted(state: &AppState, table_id: &str, pid: &str, name: &str) -> ConnectionIdentity {
        state
            .tables
            .add_participant(table_id, pid, name)
            .await
            .unwrap();
        ConnectionIdentity {
            participant_id: pid.to_string(),
            table_id: table_id.to_string(),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_non_admin_cannot_start_round() {
        let state = test_state();
        let created = state.tables.create_table(1000, 100).await.unwrap();
        let table_id = created.table.id.clone();
        let _admin = admitted(&state, &table_id, &created.admin_id, "Admin").await;
        let guest = admitted(&state, &table_id, "guest-1", "Robin").await;

        let err = dispatch_command(&state, &guest, ClientCommand::StartGame)
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::Unauthorized(_)));
        assert_eq!(err.kind(), "unauthorized");

        // the table did not move
        let table = state.tables.get_table(&table_id).await.unwrap();
        assert!(!table.has_started);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_touch_others() {
        let state = test_state();
        let created = state.tables.create_table(1000, 100).await.unwrap();
        let table_id = created.table.id.clone();
        let _admin = admitted(&state, &table_id, &created.admin_id, "Admin").await;
        let guest = admitted(&state, &table_id, "guest-1", "Robin").await;

        for command in [
            ClientCommand::RemoveParticipant {
                id: created.admin_id.clone(),
            },
            ClientCommand::UpdateCredits {
                id: created.admin_id.clone(),
                credits: 1,
            },
            ClientCommand::EndGame {
                color: RouletteColor::Red,
            },
            ClientCommand::RouletteNumber { number: 7 },
        ] {
            let err = dispatch_command(&state, &guest, command).await.unwrap_err();
            assert!(matches!(err, GameError::Unauthorized(_)));
        }
    }

    #[tokio::test]
    async fn test_own_commands_need_no_admin() {
        let state = test_state();
        let created = state.tables.create_table(1000, 100).await.unwrap();
        let table_id = created.table.id.clone();
        let _admin = admitted(&state, &table_id, &created.admin_id, "Admin").await;
        let guest = admitted(&state, &table_id, "guest-1", "Robin").await;

        dispatch_command(&state, &guest, ClientCommand::PlaceBet { amount: 50 })
            .await
            .unwrap();
        dispatch_command(
            &state,
            &guest,
            ClientCommand::ChooseColor {
                color: RouletteColor::Black,
            },
        )
        .await
        .unwrap();

        let table = state.tables.get_table(&table_id).await.unwrap();
        assert_eq!(table.participants["guest-1"].bet, 50);
        assert_eq!(
            table.participants["guest-1"].chosen_color,
            RouletteColor::Black
        );
    }

    #[tokio::test]
    async fn test_admin_eviction_broadcasts_removal_then_snapshot() {
        let state = test_state();
        let created = state.tables.create_table(1000, 100).await.unwrap();
        let table_id = created.table.id.clone();
        let admin = admitted(&state, &table_id, &created.admin_id, "Admin").await;
        let _guest = admitted(&state, &table_id, "guest-1", "Robin").await;

        let mut events = state.rooms.join(&table_id);
        dispatch_command(
            &state,
            &admin,
            ClientCommand::RemoveParticipant {
                id: "guest-1".to_string(),
            },
        )
        .await
        .unwrap();

        match events.recv().await.unwrap() {
            ServerEvent::ParticipantRemoved { id } => assert_eq!(id, "guest-1"),
            other => panic!("expected participant_removed, got {other:?}"),
        }
        match events.recv().await.unwrap() {
            ServerEvent::TableUpdated { table } => {
                assert!(!table.participants.contains_key("guest-1"));
            }
            other => panic!("expected table_updated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_roulette_number_rejects_off_wheel_values() {
        let state = test_state();
        let created = state.tables.create_table(1000, 100).await.unwrap();
        let table_id = created.table.id.clone();
        let admin = admitted(&state, &table_id, &created.admin_id, "Admin").await;

        let err = dispatch_command(&state, &admin, ClientCommand::RouletteNumber { number: 99 })
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_privileged_command_rechecks_the_table() {
        // the admin check re-fetches the authoritative table on every
        // privileged call; a room that expired out from under a still-open
        // connection fails the check with not_found, not with stale access
        let state = test_state();
        let created = state.tables.create_table(1000, 100).await.unwrap();
        let admin = admitted(&state, &created.table.id, &created.admin_id, "Admin").await;

        let vanished = ConnectionIdentity {
            table_id: "GONE00".to_string(),
            ..admin
        };
        let err = dispatch_command(&state, &vanished, ClientCommand::StartGame)
            .await
            .unwrap_err();
        assert_eq!(err, GameError::NotFound);
    }
}
