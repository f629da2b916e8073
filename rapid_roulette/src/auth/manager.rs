//! Credential manager implementation.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::errors::{AuthError, AuthResult};
use super::models::AccessTokenClaims;

/// Mints and verifies room access tokens (HS256).
///
/// Token lifetime matches the table's session duration, so a credential
/// outliving its table is impossible by construction.
#[derive(Clone)]
pub struct AuthManager {
    jwt_secret: String,
    token_duration: Duration,
}

impl AuthManager {
    /// Create a new credential manager.
    ///
    /// # Arguments
    ///
    /// * `jwt_secret` - Secret key for JWT signing
    /// * `token_duration` - Token lifetime, normally the session duration
    pub fn new(jwt_secret: String, token_duration: Duration) -> Self {
        Self {
            jwt_secret,
            token_duration,
        }
    }

    /// Mint an access token binding a participant to a table.
    pub fn issue_token(
        &self,
        participant_id: &str,
        table_id: &str,
        name: &str,
    ) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: participant_id.to_string(),
            name: name.to_string(),
            table_id: table_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_duration).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Verify an access token and return its claims.
    ///
    /// # Errors
    ///
    /// * `AuthError::TokenExpired` - the token's `exp` has passed
    /// * `AuthError::Jwt` - bad signature or malformed token
    pub fn verify_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|err| match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::Jwt(err),
        })?;

        Ok(token_data.claims)
    }
}
