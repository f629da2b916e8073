//! Game data entities.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Table identifier: a 6-character room code
pub type TableId = String;

/// Participant identifier: an opaque unique string
pub type ParticipantId = String;

/// Length of a generated room code
pub const TABLE_CODE_LEN: usize = 6;

/// Alphabet for generated room codes
pub const TABLE_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Display name length bounds
pub const MIN_NAME_LEN: usize = 1;
pub const MAX_NAME_LEN: usize = 25;

/// Bounds for the starting balance fixed at table creation
pub const MIN_INITIAL_CREDITS: i64 = 10;
pub const MAX_INITIAL_CREDITS: i64 = 100_000;

/// Bounds for the per-round bet ceiling fixed at table creation
pub const MIN_MAX_BET: i64 = 10;
pub const MAX_MAX_BET: i64 = 100_000;

/// A roulette color pick. `None` means no pick has been made this round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouletteColor {
    Red,
    Black,
    Green,
    #[default]
    None,
}

/// One joined user's per-table state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    pub credits: i64,
    pub bet: i64,
    pub chosen_color: RouletteColor,
}

impl Participant {
    /// Create a fresh participant with the table's starting balance.
    pub fn new(name: impl Into<String>, credits: i64) -> Self {
        Self {
            name: name.into(),
            credits,
            bet: 0,
            chosen_color: RouletteColor::None,
        }
    }
}

/// Root aggregate for one game room.
///
/// `id` and `admin_id` are fixed at creation, as are `initial_credits` and
/// `max_bet`. `has_started` tracks the round phase: `false` is the
/// lobby/betting phase, `true` means a round is in progress. Field names on
/// the wire match the stored document (`adminID`, `initialCredits`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: TableId,
    #[serde(rename = "adminID")]
    pub admin_id: ParticipantId,
    pub initial_credits: i64,
    pub max_bet: i64,
    pub has_started: bool,
    pub participants: HashMap<ParticipantId, Participant>,
}

impl Table {
    /// Create a new table in the lobby phase with an empty roster.
    pub fn new(
        id: impl Into<TableId>,
        admin_id: impl Into<ParticipantId>,
        initial_credits: i64,
        max_bet: i64,
    ) -> Self {
        Self {
            id: id.into(),
            admin_id: admin_id.into(),
            initial_credits,
            max_bet,
            has_started: false,
            participants: HashMap::new(),
        }
    }
}

/// Generate a room code: 6 characters drawn from `[0-9A-Z]`.
///
/// Uniqueness is enforced by the store's existence check at creation, not
/// here.
pub fn new_table_code() -> TableId {
    let mut rng = rand::rng();
    (0..TABLE_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..TABLE_CODE_ALPHABET.len());
            TABLE_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate an opaque participant identifier.
pub fn new_participant_id() -> ParticipantId {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_participant_defaults() {
        let p = Participant::new("Dana", 1000);
        assert_eq!(p.name, "Dana");
        assert_eq!(p.credits, 1000);
        assert_eq!(p.bet, 0);
        assert_eq!(p.chosen_color, RouletteColor::None);
    }

    #[test]
    fn test_table_code_format() {
        for _ in 0..100 {
            let code = new_table_code();
            assert_eq!(code.len(), TABLE_CODE_LEN);
            assert!(
                code.bytes().all(|b| TABLE_CODE_ALPHABET.contains(&b)),
                "unexpected character in code {code}"
            );
        }
    }

    #[test]
    fn test_participant_ids_are_unique() {
        let a = new_participant_id();
        let b = new_participant_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_color_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RouletteColor::Red).unwrap(),
            "\"red\""
        );
        assert_eq!(
            serde_json::to_string(&RouletteColor::None).unwrap(),
            "\"none\""
        );
        let c: RouletteColor = serde_json::from_str("\"black\"").unwrap();
        assert_eq!(c, RouletteColor::Black);
    }

    #[test]
    fn test_table_wire_field_names() {
        let mut table = Table::new("AB12CD", "admin-1", 1000, 100);
        table
            .participants
            .insert("admin-1".into(), Participant::new("Dana", 1000));

        let json: serde_json::Value = serde_json::to_value(&table).unwrap();
        assert_eq!(json["id"], "AB12CD");
        assert_eq!(json["adminID"], "admin-1");
        assert_eq!(json["initialCredits"], 1000);
        assert_eq!(json["maxBet"], 100);
        assert_eq!(json["hasStarted"], false);
        assert_eq!(json["participants"]["admin-1"]["chosenColor"], "none");

        let decoded: Table = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, table);
    }
}
