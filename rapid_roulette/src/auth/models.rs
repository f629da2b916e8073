//! Credential data models.

use serde::{Deserialize, Serialize};

/// JWT claims embedded in a room access token.
///
/// `sub` is the participant id; `table_id` travels as `tableID`, the field
/// name clients decode out of the token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub name: String,
    #[serde(rename = "tableID")]
    pub table_id: String,
    pub iat: i64,
    pub exp: i64,
}
