//! Configuration management for the party server.
//!
//! This module handles loading, validation, and conversion of server
//! configuration from TOML files and command-line arguments.

use party_server::{ServerConfig, StaticTokenResolver, TokenEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Authentication settings
    #[serde(default)]
    pub auth: AuthSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Network and connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Idle timeout in seconds (0 to disable)
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    /// Frames buffered per connection before new ones are dropped
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
}

fn default_max_connections() -> usize {
    1000
}

/// Default for connection_timeout
pub fn default_connection_timeout() -> u64 {
    60
}

fn default_outbound_queue_capacity() -> usize {
    256
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
        }
    }
}

/// Who may connect.
///
/// ```toml
/// [auth]
/// allow_guests = false
///
/// [[auth.tokens]]
/// token = "s3cr3t"
/// user_id = "64f1c2"
/// username = "alice"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Admit clients that present only a display name
    #[serde(default = "default_allow_guests")]
    pub allow_guests: bool,
    /// Accepted bearer tokens
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

fn default_allow_guests() -> bool {
    true
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            allow_guests: default_allow_guests(),
            tokens: Vec::new(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes a default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to a party server configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            connection_timeout: self.server.connection_timeout,
            outbound_queue_capacity: self.server.outbound_queue_capacity,
        })
    }

    /// Builds the identity resolver described by the `[auth]` section.
    pub fn build_resolver(&self) -> StaticTokenResolver {
        StaticTokenResolver::new(self.auth.tokens.iter().cloned(), self.auth.allow_guests)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", &self.server.bind_address));
        }

        if self.server.max_connections == 0 {
            return Err("max_connections must be greater than zero".to_string());
        }

        if self.server.outbound_queue_capacity == 0 {
            return Err("outbound_queue_capacity must be greater than zero".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.auth.tokens {
            if entry.token.is_empty() {
                return Err(format!("Empty token configured for user '{}'", entry.username));
            }
            if entry.username.is_empty() {
                return Err("Token entries must have a username".to_string());
            }
            if !seen.insert(entry.token.as_str()) {
                return Err(format!("Duplicate token configured for user '{}'", entry.username));
            }
        }

        if self.auth.tokens.is_empty() && !self.auth.allow_guests {
            return Err("No tokens configured and guest access is disabled".to_string());
        }

        Ok(())
    }
}
