//! Table transition rules.
//!
//! Translates a command plus the current `Table` into a validated new
//! `Table`, or rejects it. Only phase and value-range rules live here;
//! identity rules (who may invoke a command) are the session layer's job,
//! which is assumed to have run before any of these methods are called.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{Participant, RouletteColor, Table};
use crate::store::StoreError;

/// Errors surfaced by table commands
#[derive(Debug, Clone, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("table not found")]
    NotFound,
    #[error("table already exists")]
    Conflict,
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Precondition(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl GameError {
    /// Stable error kind for the wire `exception` event.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::NotFound => "not_found",
            GameError::Conflict => "conflict",
            GameError::InvalidArgument(_) => "invalid_argument",
            GameError::InvalidState(_) => "invalid_state",
            GameError::Precondition(_) => "precondition",
            GameError::Unauthorized(_) => "unauthorized",
            GameError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => GameError::NotFound,
            StoreError::Conflict => GameError::Conflict,
            StoreError::Unavailable(reason) => GameError::StoreUnavailable(reason),
        }
    }
}

/// Result type for table commands
pub type GameResult<T> = Result<T, GameError>;

impl Table {
    /// Admit a participant with the table's starting balance.
    ///
    /// Always valid. Re-admitting an existing id overwrites the previous
    /// entry, which is how a rejoin resets a stale participant.
    pub fn add_participant(&mut self, id: &str, name: &str) -> Participant {
        let participant = Participant::new(name, self.initial_credits);
        self.participants
            .insert(id.to_string(), participant.clone());
        participant
    }

    /// Whether a removal would apply right now.
    ///
    /// Removal is deferred while a round is in progress, and for the admin
    /// while anyone else is still at the table: the admin id must stay on
    /// the roster as long as the table has participants.
    pub fn removable(&self, id: &str) -> bool {
        if self.has_started {
            return false;
        }
        id != self.admin_id || self.participants.len() <= 1
    }

    /// Remove a participant. Returns `false` when the removal is deferred
    /// (round in progress, or admin with a non-empty roster); deferral is a
    /// no-op, not an error, and the caller retries after settlement.
    pub fn remove_participant(&mut self, id: &str) -> bool {
        if !self.removable(id) {
            return false;
        }
        self.participants.remove(id);
        true
    }

    /// Place a bet for a participant.
    ///
    /// Only valid in the lobby phase. The amount must be within
    /// `0..=max_bet` and covered by the participant's current balance;
    /// checking coverage here is what keeps settlement from ever driving a
    /// balance negative.
    pub fn place_bet(&mut self, id: &str, amount: i64) -> GameResult<()> {
        if self.has_started {
            return Err(GameError::InvalidState(
                "bets are closed while a round is in progress".into(),
            ));
        }
        let participant = self.participants.get_mut(id).ok_or(GameError::NotFound)?;
        if amount < 0 {
            return Err(GameError::InvalidArgument("bet must not be negative".into()));
        }
        if amount > self.max_bet {
            return Err(GameError::InvalidArgument(format!(
                "bet exceeds the table maximum of {}",
                self.max_bet
            )));
        }
        if amount > participant.credits {
            return Err(GameError::InvalidArgument(format!(
                "bet exceeds available credits ({})",
                participant.credits
            )));
        }
        participant.bet = amount;
        Ok(())
    }

    /// Pick a color for a participant. Only valid in the lobby phase;
    /// picking `none` clears the previous pick.
    pub fn choose_color(&mut self, id: &str, color: RouletteColor) -> GameResult<()> {
        if self.has_started {
            return Err(GameError::InvalidState(
                "color picks are closed while a round is in progress".into(),
            ));
        }
        let participant = self.participants.get_mut(id).ok_or(GameError::NotFound)?;
        participant.chosen_color = color;
        Ok(())
    }

    /// Overwrite a participant's balance.
    ///
    /// This is a raw admin override valid in any phase; it does not touch
    /// the participant's standing bet.
    pub fn update_credits(&mut self, id: &str, credits: i64) -> GameResult<()> {
        if credits < 0 {
            return Err(GameError::InvalidArgument(
                "credits must not be negative".into(),
            ));
        }
        let participant = self.participants.get_mut(id).ok_or(GameError::NotFound)?;
        participant.credits = credits;
        Ok(())
    }

    /// Begin a round.
    ///
    /// Requires every current participant to have picked a color; an empty
    /// roster satisfies that vacuously.
    pub fn start_round(&mut self) -> GameResult<()> {
        if self.has_started {
            return Err(GameError::InvalidState(
                "a round is already in progress".into(),
            ));
        }
        let undecided = self
            .participants
            .values()
            .filter(|p| p.chosen_color == RouletteColor::None)
            .count();
        if undecided > 0 {
            return Err(GameError::Precondition(format!(
                "{undecided} participant(s) have not picked a color"
            )));
        }
        self.has_started = true;
        Ok(())
    }

    /// End the round: adjust every balance against the winning color, then
    /// reset bets and picks and return to the lobby phase.
    ///
    /// Winners gain their bet, losers lose it, participants without a pick
    /// keep their balance but are still reset.
    pub fn settle_round(&mut self, winning_color: RouletteColor) -> GameResult<()> {
        if !self.has_started {
            return Err(GameError::InvalidState("no round is in progress".into()));
        }
        for participant in self.participants.values_mut() {
            match participant.chosen_color {
                RouletteColor::None => {}
                color if color == winning_color => participant.credits += participant.bet,
                _ => participant.credits -= participant.bet,
            }
            participant.bet = 0;
            participant.chosen_color = RouletteColor::None;
        }
        self.has_started = false;
        Ok(())
    }
}
