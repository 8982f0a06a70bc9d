//! Message routing logic for dispatching client frames to the coordinator.

use crate::{connection::ClientConnection, error::ServerError, lifecycle::PresenceCoordinator};
use party_events::ClientEvent;
use tracing::debug;

/// Routes a raw client frame to the presence coordinator.
///
/// # Arguments
///
/// * `text` - The raw frame text from the client (expected to be JSON)
/// * `connection` - The connection the frame arrived on
/// * `coordinator` - Coordinator that applies the request
///
/// # Returns
///
/// `Ok(true)` if the request changed party membership, `Ok(false)` if it was
/// valid but dropped or redundant, or a `ServerError` if the frame could not
/// be decoded.
///
/// # Example Message Format
///
/// ```json
/// { "event": "join:party", "data": { "partyId": "movie-night" } }
/// ```
pub async fn route_client_message(
    text: &str,
    connection: &ClientConnection,
    coordinator: &PresenceCoordinator,
) -> Result<bool, ServerError> {
    let event = ClientEvent::parse(text)?;

    debug!(
        "📨 Routing '{}' from {} (connection {})",
        event.name(),
        connection.identity,
        connection.id
    );

    Ok(coordinator.handle_client_event(connection, event).await)
}
