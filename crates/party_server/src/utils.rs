//! Convenience constructors for [`PartyServer`].

use crate::{auth::StaticTokenResolver, config::ServerConfig, server::PartyServer};
use std::sync::Arc;

/// Creates a server with default configuration that admits guests by name.
pub fn create_server() -> PartyServer {
    create_server_with_config(ServerConfig::default())
}

/// Creates a server with `config` that admits guests by name.
///
/// Deployments that need token authentication build the server with
/// [`PartyServer::new`] and their own resolver instead.
pub fn create_server_with_config(config: ServerConfig) -> PartyServer {
    PartyServer::new(config, Arc::new(StaticTokenResolver::new(Vec::new(), true)))
}
