//! # Identity Resolution
//!
//! The presence engine does not issue or verify credentials itself. It asks an
//! [`IdentityResolver`] to turn the credentials presented at handshake time
//! into an [`Identity`], or to reject the connection.
//!
//! [`StaticTokenResolver`] is the config-driven implementation used by the
//! binary; deployments backed by a user service implement the trait directly.

pub mod credentials;
pub mod static_tokens;

pub use credentials::Credentials;
pub use static_tokens::{StaticTokenResolver, TokenEntry};

use async_trait::async_trait;
use party_events::Identity;

/// Reasons a connection is refused at authentication time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Neither a token nor a guest name was presented
    #[error("missing credentials")]
    MissingCredentials,

    /// The presented token is unknown or invalid
    #[error("invalid token")]
    InvalidToken,

    /// A guest name was presented but guest access is disabled
    #[error("guest access is disabled")]
    GuestsDisabled,

    /// The identity backend failed
    #[error("identity backend error: {0}")]
    Backend(String),
}

/// Resolves connection credentials to an authenticated identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Authenticates a new connection.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError>;
}
