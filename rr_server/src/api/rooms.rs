//! Room broadcast registry.
//!
//! One broadcast group per live table. The registry is the only owner of
//! group membership, and the gateway keeps it in lockstep with store-level
//! participant removal: a connection leaves the group exactly where its
//! removal is attempted, so nobody keeps receiving snapshots after being
//! dropped from the roster.
//!
//! Fan-out goes through a `tokio::sync::broadcast` channel, so one slow or
//! dead receiver never blocks delivery to the rest of the room; a lagged
//! receiver just skips ahead.

use std::collections::HashMap;
use std::sync::Mutex;

use rapid_roulette::Table;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use tracing::debug;

/// Capacity of each room's event channel; a receiver further behind than
/// this starts skipping snapshots instead of blocking the sender.
const ROOM_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by the gateway to a room.
///
/// `TableUpdated` always carries the full table; receivers replace their
/// local view instead of merging. `Exception` is only ever sent unicast to
/// the offending connection, never through the room channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    TableUpdated { table: Table },
    ParticipantRemoved { id: String },
    GameNumber { number: i64 },
    Exception { kind: String, message: String },
}

struct DriverHandle {
    owner: String,
    abort: AbortHandle,
}

struct Room {
    events: broadcast::Sender<ServerEvent>,
    members: usize,
    driver: Option<DriverHandle>,
}

/// Registry of room broadcast groups, keyed by table id.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a room's broadcast group, creating the room on first join.
    pub fn join(&self, table_id: &str) -> broadcast::Receiver<ServerEvent> {
        let mut rooms = self.rooms.lock().expect("registry lock poisoned");
        let room = rooms.entry(table_id.to_string()).or_insert_with(|| {
            debug!(table_id, "opening room");
            let (events, _) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
            Room {
                events,
                members: 0,
                driver: None,
            }
        });
        room.members += 1;
        room.events.subscribe()
    }

    /// Leave a room's broadcast group.
    ///
    /// Cancels the room's round driver when the leaving connection is the
    /// one that started it, and closes the room entirely when it empties.
    pub fn leave(&self, table_id: &str, participant_id: &str) {
        let mut rooms = self.rooms.lock().expect("registry lock poisoned");
        let Some(room) = rooms.get_mut(table_id) else {
            return;
        };
        room.members = room.members.saturating_sub(1);
        if room.members == 0 {
            debug!(table_id, "room empty, closing");
            if let Some(driver) = room.driver.take() {
                driver.abort.abort();
            }
            rooms.remove(table_id);
            return;
        }
        if room.driver.as_ref().is_some_and(|d| d.owner == participant_id)
            && let Some(driver) = room.driver.take()
        {
            debug!(table_id, "driving connection left, cancelling round");
            driver.abort.abort();
        }
    }

    /// Broadcast an event to every connection in a room. Returns the number
    /// of receivers the event reached.
    pub fn broadcast(&self, table_id: &str, event: ServerEvent) -> usize {
        let rooms = self.rooms.lock().expect("registry lock poisoned");
        match rooms.get(table_id) {
            // send only fails when no receiver is subscribed
            Some(room) => room.events.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Install a round driver for a room, cancelling any previous one.
    pub fn install_driver(&self, table_id: &str, owner: &str, abort: AbortHandle) {
        let mut rooms = self.rooms.lock().expect("registry lock poisoned");
        let Some(room) = rooms.get_mut(table_id) else {
            // room vanished between settle and install; kill the orphan
            abort.abort();
            return;
        };
        if let Some(previous) = room.driver.replace(DriverHandle {
            owner: owner.to_string(),
            abort,
        }) {
            previous.abort.abort();
        }
    }

    /// Cancel a room's round driver if one is running.
    pub fn abort_driver(&self, table_id: &str) {
        let mut rooms = self.rooms.lock().expect("registry lock poisoned");
        if let Some(room) = rooms.get_mut(table_id)
            && let Some(driver) = room.driver.take()
        {
            driver.abort.abort();
        }
    }

    /// Number of open rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.lock().expect("registry lock poisoned").len()
    }

    /// Number of connections currently in a room.
    pub fn member_count(&self, table_id: &str) -> usize {
        self.rooms
            .lock()
            .expect("registry lock poisoned")
            .get(table_id)
            .map_or(0, |room| room.members)
    }
}
