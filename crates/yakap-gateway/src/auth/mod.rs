//! Authentication and authorization for the gateway.
//!
//! This module provides:
//! - The signed session-token codec
//! - User accounts with argon2 password verification
//! - The session cookie adapter
//! - Route classification and the access-gateway middleware

pub mod cookie;
mod middleware;
mod routes;
mod token;
mod users;

pub use cookie::SESSION_COOKIE;
pub use middleware::{CurrentUser, RequireAdmin, access_gateway, decide, Verdict};
pub use routes::{RouteClass, classify};
pub use token::{Claims, SessionCodec};
pub use users::{PublicUser, Role, User, UserStore};

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials provided. Deliberately covers both unknown
    /// usernames and wrong passwords so callers cannot tell them apart.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No valid session present.
    #[error("Unauthorized")]
    Unauthorized,

    /// Session token invalid (bad signature, malformed, or expired).
    #[error("Invalid session token")]
    InvalidToken,

    /// Caller's role does not permit the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Username already taken.
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}
