//! Room credential management.
//!
//! Tables are joined with an opaque signed token minted by the create/join
//! endpoints. The token binds a participant id, a room code and a display
//! name for the lifetime of one session; the gateway verifies it once per
//! connection and trusts nothing else from the client.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{AuthError, AuthResult};
pub use manager::AuthManager;
pub use models::AccessTokenClaims;
