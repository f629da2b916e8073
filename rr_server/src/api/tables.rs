//! Table create/join HTTP handlers.
//!
//! These endpoints sit in front of the session gateway: they validate the
//! creation/join parameters, mint the room code and participant id, and
//! return the signed credential a client presents when opening its
//! WebSocket. Field bounds are enforced here, before the state machine ever
//! sees the data.

use axum::{Json, extract::State, http::StatusCode};
use rapid_roulette::game::GameError;
use rapid_roulette::game::entities::{
    MAX_INITIAL_CREDITS, MAX_MAX_BET, MAX_NAME_LEN, MIN_INITIAL_CREDITS, MIN_MAX_BET,
    MIN_NAME_LEN, TABLE_CODE_ALPHABET, TABLE_CODE_LEN,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::metrics;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    pub name: String,
    pub initial_credits: i64,
    pub max_bet: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTableRequest {
    pub table_id: String,
    pub name: String,
}

/// Credential response for both create and join.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub table_id: String,
    pub participant_id: String,
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn validate_name(name: &str) -> Result<(), HandlerError> {
    let len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(bad_request(format!(
            "name must be {MIN_NAME_LEN}-{MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_table_code(code: &str) -> Result<(), HandlerError> {
    let well_formed = code.len() == TABLE_CODE_LEN
        && code.bytes().all(|b| TABLE_CODE_ALPHABET.contains(&b));
    if !well_formed {
        return Err(bad_request(format!(
            "table id must be exactly {TABLE_CODE_LEN} characters from 0-9A-Z"
        )));
    }
    Ok(())
}

fn map_game_error(err: GameError) -> HandlerError {
    match err {
        GameError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "table not found".to_string(),
            }),
        ),
        GameError::InvalidArgument(msg)
        | GameError::InvalidState(msg)
        | GameError::Precondition(msg) => bad_request(msg),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: other.to_string(),
            }),
        ),
    }
}

/// Create a new table.
///
/// The caller becomes the table's admin; their roster entry is created when
/// their WebSocket connection is admitted, not here.
///
/// # Request Body
///
/// ```json
/// {"name": "Dana", "initialCredits": 1000, "maxBet": 100}
/// ```
///
/// # Response
///
/// Returns `200 OK` with the room code, the admin's participant id, and the
/// access token to present on the WebSocket.
///
/// # Errors
///
/// - `400 Bad Request`: name or bounds outside their allowed ranges
/// - `500 Internal Server Error`: store failure or exhausted room codes
pub async fn create_table(
    State(state): State<AppState>,
    Json(request): Json<CreateTableRequest>,
) -> Result<Json<SessionResponse>, HandlerError> {
    validate_name(&request.name)?;
    if !(MIN_INITIAL_CREDITS..=MAX_INITIAL_CREDITS).contains(&request.initial_credits) {
        return Err(bad_request(format!(
            "initialCredits must be between {MIN_INITIAL_CREDITS} and {MAX_INITIAL_CREDITS}"
        )));
    }
    if !(MIN_MAX_BET..=MAX_MAX_BET).contains(&request.max_bet) {
        return Err(bad_request(format!(
            "maxBet must be between {MIN_MAX_BET} and {MAX_MAX_BET}"
        )));
    }

    let created = state
        .tables
        .create_table(request.initial_credits, request.max_bet)
        .await
        .map_err(map_game_error)?;

    let access_token = state
        .auth
        .issue_token(&created.admin_id, &created.table.id, &request.name)
        .map_err(|err| {
            tracing::error!(error = %err, "failed to issue credential");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "failed to issue credential".to_string(),
                }),
            )
        })?;

    metrics::table_created();

    Ok(Json(SessionResponse {
        table_id: created.table.id,
        participant_id: created.admin_id,
        access_token,
    }))
}

/// Join an existing table.
///
/// Mints a fresh participant id and credential. The table must still be
/// live; admission itself happens when the WebSocket connects.
///
/// # Request Body
///
/// ```json
/// {"tableId": "AB12CD", "name": "Robin"}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: malformed room code or name
/// - `404 Not Found`: no live table under that code
pub async fn join_table(
    State(state): State<AppState>,
    Json(request): Json<JoinTableRequest>,
) -> Result<Json<SessionResponse>, HandlerError> {
    validate_table_code(&request.table_id)?;
    validate_name(&request.name)?;

    let participant_id = state
        .tables
        .join_table(&request.table_id)
        .await
        .map_err(map_game_error)?;

    let access_token = state
        .auth
        .issue_token(&participant_id, &request.table_id, &request.name)
        .map_err(|err| {
            tracing::error!(error = %err, "failed to issue credential");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "failed to issue credential".to_string(),
                }),
            )
        })?;

    Ok(Json(SessionResponse {
        table_id: request.table_id,
        participant_id,
        access_token,
    }))
}
