//! # Yakap Gateway
//!
//! Session-gated HTTP server for the Yakap registry. Every request passes
//! through the access gateway, which classifies the route, verifies the
//! session cookie, and allows, redirects, or rejects.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication, session tokens, and the access gateway.
pub mod auth;
mod server;

pub use auth::{AuthError, Claims, PublicUser, Role, SessionCodec, User, UserStore};
pub use server::{AppState, Gateway, GatewayConfig, build_router};

/// Start the gateway server.
///
/// # Errors
///
/// Returns error if the server fails to start.
pub async fn start(config: GatewayConfig) -> Result<(), GatewayError> {
    let gateway = Gateway::new(config)?;
    gateway.run().await
}

/// Gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Server error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
