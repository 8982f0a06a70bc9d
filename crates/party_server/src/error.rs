//! Error types and handling for the party server.
//!
//! Transport and bootstrap failures are reported as [`ServerError`]. Failures
//! of the presence engine itself are never surfaced to callers; see the
//! lifecycle coordinator for how malformed requests are dropped.

/// Enumeration of possible server errors.
///
/// Categorizes errors into network-related and protocol errors to help with
/// debugging and error handling.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or handshake issues
    #[error("Network error: {0}")]
    Network(String),

    /// A client frame that could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<party_events::ProtocolError> for ServerError {
    fn from(error: party_events::ProtocolError) -> Self {
        ServerError::Protocol(error.to_string())
    }
}
