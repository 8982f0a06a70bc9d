//! Per-socket connection handling.
//!
//! A socket moves through the handshake, authentication, the read loop and
//! finally teardown. Outbound frames are written by a separate task draining
//! the connection's queue, so a slow socket never stalls the presence engine.

use crate::{
    auth::Credentials, connection::Transport, error::ServerError,
    lifecycle::PresenceCoordinator, messaging::route_client_message,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

/// Handshake deadline used when the idle timeout is disabled.
const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// How long teardown waits for the writer to flush its close frame.
const WRITER_GRACE: Duration = Duration::from_secs(1);

/// Serves one accepted socket until it closes.
///
/// # Arguments
///
/// * `stream` - The accepted TCP stream
/// * `addr` - Remote address of the peer
/// * `coordinator` - Presence engine the connection registers with
/// * `queue_capacity` - Capacity of the connection's outbound queue
/// * `idle_timeout` - Seconds without an inbound frame before the connection
///   is closed; `0` disables the timeout. The handshake must also finish
///   within this many seconds (10 when the idle timeout is disabled).
///
/// # Returns
///
/// `Ok(())` once the connection has been torn down, or a `ServerError` if the
/// WebSocket handshake failed or timed out.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    coordinator: Arc<PresenceCoordinator>,
    queue_capacity: usize,
    idle_timeout: u64,
) -> Result<(), ServerError> {
    let handshake: Arc<OnceLock<Credentials>> = Arc::new(OnceLock::new());
    let captured = handshake.clone();

    let handshake_limit = Duration::from_secs(if idle_timeout > 0 {
        idle_timeout
    } else {
        DEFAULT_HANDSHAKE_TIMEOUT_SECS
    });
    let accept = tokio_tungstenite::accept_hdr_async(
        stream,
        move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            let authorization = request
                .headers()
                .get("authorization")
                .and_then(|value| value.to_str().ok());
            let _ = captured.set(Credentials::from_parts(request.uri().query(), authorization));
            Ok(response)
        },
    );
    let ws_stream = timeout(handshake_limit, accept)
        .await
        .map_err(|_| {
            ServerError::Network(format!(
                "WebSocket handshake from {addr} not completed within {}s",
                handshake_limit.as_secs()
            ))
        })?
        .map_err(|e| ServerError::Network(format!("WebSocket handshake failed for {addr}: {e}")))?;

    let credentials = handshake.get().cloned().unwrap_or_default();
    let (mut ws_sink, mut ws_receiver) = ws_stream.split();
    let (transport, mut outbound) = Transport::channel(queue_capacity, Some(addr));

    let connection = match coordinator.on_connect(&credentials, transport).await {
        Ok(connection) => connection,
        Err(e) => {
            warn!("🔒 Rejected connection from {}: {}", addr, e);
            let frame = CloseFrame {
                code: CloseCode::Policy,
                reason: e.to_string().into(),
            };
            let _ = ws_sink.send(Message::Close(Some(frame))).await;
            return Ok(());
        }
    };

    let mut close_signal = connection.close_signal();
    let mut writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                superseded = async { close_signal.wait_for(|requested| *requested).await.is_ok() } => {
                    if superseded {
                        let frame = CloseFrame {
                            code: CloseCode::Normal,
                            reason: "superseded by a newer connection".into(),
                        };
                        let _ = ws_sink.send(Message::Close(Some(frame))).await;
                    }
                    break;
                }
                frame = outbound.recv() => match frame {
                    Some(frame) => {
                        if let Err(e) = ws_sink.send(Message::text(frame.to_string())).await {
                            debug!("Write to {} failed: {}", addr, e);
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        let _ = ws_sink.close().await;
    });

    let idle_limit = (idle_timeout > 0).then(|| Duration::from_secs(idle_timeout));

    loop {
        let read = async {
            match idle_limit {
                Some(limit) => timeout(limit, ws_receiver.next()).await.ok(),
                None => Some(ws_receiver.next().await),
            }
        };
        let next = tokio::select! {
            _ = connection.close_requested() => {
                info!("🔁 Connection {} superseded, closing", connection.id);
                break;
            }
            read = read => match read {
                Some(next) => next,
                None => {
                    info!("⏱️ Connection {} idle for {}s, closing", connection.id, idle_timeout);
                    break;
                }
            },
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                if let Err(e) = route_client_message(text.as_str(), &connection, &coordinator).await {
                    trace!("Dropped frame from connection {}: {}", connection.id, e);
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                debug!("Connection {} closed by peer", connection.id);
                break;
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
            Some(Ok(_)) => {
                trace!("Ignoring non-text frame from connection {}", connection.id);
            }
            Some(Err(e)) => {
                debug!("WebSocket error on connection {}: {}", connection.id, e);
                break;
            }
        }
    }

    coordinator.on_disconnect(&connection).await;

    // The writer stops and closes the sink once the last handle is gone
    drop(connection);
    if timeout(WRITER_GRACE, &mut writer).await.is_err() {
        writer.abort();
    }
    Ok(())
}
