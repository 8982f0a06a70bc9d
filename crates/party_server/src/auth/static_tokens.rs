//! Config-driven identity resolver.

use super::{AuthError, Credentials, IdentityResolver};
use async_trait::async_trait;
use party_events::Identity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Role given to identities admitted through guest access.
pub const GUEST_ROLE: &str = "guest";

/// One accepted token and the principal it stands for.
///
/// ```toml
/// [[auth.tokens]]
/// token = "s3cr3t"
/// user_id = "64f1c2"
/// username = "alice"
/// role = "host"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// The bearer token clients present
    pub token: String,
    /// Principal id; the username is used as id when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Display name
    pub username: String,
    /// Optional role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Resolves identities from a fixed token table, with optional guest access.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, TokenEntry>,
    allow_guests: bool,
}

impl StaticTokenResolver {
    /// Builds a resolver from token entries. Later duplicates of a token
    /// replace earlier ones.
    pub fn new(entries: impl IntoIterator<Item = TokenEntry>, allow_guests: bool) -> Self {
        let tokens = entries
            .into_iter()
            .map(|entry| (entry.token.clone(), entry))
            .collect();
        Self {
            tokens,
            allow_guests,
        }
    }

    /// Number of accepted tokens.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

#[async_trait]
impl IdentityResolver for StaticTokenResolver {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        if let Some(token) = &credentials.token {
            let entry = self.tokens.get(token).ok_or(AuthError::InvalidToken)?;
            return Ok(Identity::from_principal(
                entry.user_id.as_deref(),
                entry.username.clone(),
                entry.role.clone(),
            ));
        }

        match (&credentials.name, self.allow_guests) {
            (Some(name), true) => {
                debug!(name = %name, "Admitting guest connection");
                Ok(Identity::from_principal(None, name.clone(), Some(GUEST_ROLE.to_string())))
            }
            (Some(_), false) => Err(AuthError::GuestsDisabled),
            (None, _) => Err(AuthError::MissingCredentials),
        }
    }
}
