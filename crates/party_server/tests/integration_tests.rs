//! Integration tests for the WebSocket transport
//!
//! These tests run a real server on an ephemeral port and drive it with
//! tokio-tungstenite clients, checking the presence events each client sees.

use futures::{SinkExt, StreamExt};
use party_events::{PartyId, ServerEvent};
use party_server::{PartyServer, ServerConfig, StaticTokenResolver, TokenEntry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

fn entry(token: &str, user_id: &str, username: &str) -> TokenEntry {
    TokenEntry {
        token: token.to_string(),
        user_id: Some(user_id.to_string()),
        username: username.to_string(),
        role: None,
    }
}

/// Helper to start a server on an ephemeral port
async fn start_server(config: ServerConfig) -> (Arc<PartyServer>, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let resolver = StaticTokenResolver::new(
        vec![entry("token-a", "u-a", "alice"), entry("token-b", "u-b", "bob")],
        true,
    );
    let server = Arc::new(PartyServer::new(config, Arc::new(resolver)));

    let serving = server.clone();
    tokio::spawn(async move {
        serving.serve(listener).await.unwrap();
    });

    (server, addr)
}

async fn connect(addr: SocketAddr, query: &str) -> Client {
    let url = format!("ws://{addr}/?{query}");
    let (client, _) = timeout(WAIT, connect_async(url))
        .await
        .expect("connect timed out")
        .expect("handshake failed");
    client
}

/// Reads frames until the next presence event arrives.
async fn next_event(client: &mut Client) -> ServerEvent {
    loop {
        let message = timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = message {
            return ServerEvent::parse(text.as_str()).expect("invalid server frame");
        }
    }
}

async fn send(client: &mut Client, event: &str, party_id: &str) {
    let frame = serde_json::json!({"event": event, "data": {"partyId": party_id}});
    client.send(Message::text(frame.to_string())).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_presence_over_websocket() {
    let (server, addr) = start_server(ServerConfig::default()).await;
    let party = PartyId::from("movie-night");

    let mut alice = connect(addr, "token=token-a").await;
    send(&mut alice, "join:party", "movie-night").await;
    match next_event(&mut alice).await {
        ServerEvent::PartyMembers(members) => assert_eq!(members.len(), 1),
        other => panic!("unexpected event: {other:?}"),
    }

    let mut bob = connect(addr, "token=token-b").await;
    match next_event(&mut alice).await {
        ServerEvent::UserConnected(identity) => assert_eq!(identity.display_name, "bob"),
        other => panic!("unexpected event: {other:?}"),
    }

    send(&mut bob, "join:party", "movie-night").await;
    match next_event(&mut bob).await {
        ServerEvent::PartyMembers(members) => {
            let names: Vec<_> = members.iter().map(|m| m.display_name.as_str()).collect();
            assert_eq!(names, vec!["alice", "bob"]);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    match next_event(&mut alice).await {
        ServerEvent::MemberJoined(notice) => {
            assert_eq!(notice.party_id, party);
            assert_eq!(notice.member.id.as_str(), "u-b");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    bob.close(None).await.unwrap();
    match next_event(&mut alice).await {
        ServerEvent::MemberLeft(notice) => assert_eq!(notice.member.id.as_str(), "u-b"),
        other => panic!("unexpected event: {other:?}"),
    }
    match next_event(&mut alice).await {
        ServerEvent::UserDisconnected(identity) => assert_eq!(identity.id.as_str(), "u-b"),
        other => panic!("unexpected event: {other:?}"),
    }

    let coordinator = server.coordinator();
    assert_eq!(coordinator.members(&party).await.len(), 1);
    server.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_guest_and_bearer_header() {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    let (server, addr) = start_server(ServerConfig::default()).await;

    let mut guest = connect(addr, "name=popcorn").await;
    // The member list proves the guest is registered
    send(&mut guest, "join:party", "lobby").await;
    assert!(matches!(next_event(&mut guest).await, ServerEvent::PartyMembers(_)));

    let mut request = format!("ws://{addr}/").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Authorization", "Bearer token-a".parse().unwrap());
    let (_alice, _) = timeout(WAIT, connect_async(request)).await.unwrap().unwrap();

    match next_event(&mut guest).await {
        ServerEvent::UserConnected(identity) => assert_eq!(identity.id.as_str(), "u-a"),
        other => panic!("unexpected event: {other:?}"),
    }

    let coordinator = server.coordinator();
    assert!(coordinator.is_connected(&"popcorn".into()).await);
    assert_eq!(coordinator.stats().await.connections, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_token_is_closed_with_policy_code() {
    let (server, addr) = start_server(ServerConfig::default()).await;

    let mut client = connect(addr, "token=forged").await;
    let message = timeout(WAIT, client.next())
        .await
        .expect("timed out waiting for close")
        .expect("stream ended")
        .expect("websocket error");

    match message {
        Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Policy),
        other => panic!("expected close frame, got {other:?}"),
    }
    assert_eq!(server.coordinator().stats().await.connections, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_limit() {
    let config = ServerConfig {
        max_connections: 1,
        ..ServerConfig::default()
    };
    let (_server, addr) = start_server(config).await;

    let _first = connect(addr, "token=token-a").await;
    let second = timeout(WAIT, connect_async(format!("ws://{addr}/?token=token-b")))
        .await
        .expect("connect timed out");
    assert!(second.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_idle_connection_is_closed() {
    let config = ServerConfig {
        connection_timeout: 1,
        ..ServerConfig::default()
    };
    let (server, addr) = start_server(config).await;

    let mut client = connect(addr, "token=token-a").await;
    let coordinator = server.coordinator();

    let ended = timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(_))) | Some(Ok(Message::Ping(_))) => continue,
                _ => break,
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "idle connection was not closed");

    // Teardown runs right after the reader exits
    let mut cleared = false;
    for _ in 0..50 {
        if !coordinator.is_connected(&"u-a".into()).await {
            cleared = true;
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert!(cleared);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_silent_socket_releases_its_slot() {
    let config = ServerConfig {
        max_connections: 1,
        connection_timeout: 1,
        ..ServerConfig::default()
    };
    let (server, addr) = start_server(config).await;

    // Opens TCP but never sends a handshake
    let _silent = TcpStream::connect(addr).await.unwrap();

    let mut released = false;
    for _ in 0..100 {
        sleep(Duration::from_millis(50)).await;
        if server.active_connections() == 0 {
            released = true;
            break;
        }
    }
    assert!(released, "handshake never timed out");

    let mut alice = connect(addr, "name=alice").await;
    send(&mut alice, "join:party", "lobby").await;
    assert!(matches!(next_event(&mut alice).await, ServerEvent::PartyMembers(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reconnect_closes_previous_socket() {
    let (server, addr) = start_server(ServerConfig::default()).await;

    let mut first = connect(addr, "token=token-a").await;
    send(&mut first, "join:party", "movie-night").await;
    assert!(matches!(next_event(&mut first).await, ServerEvent::PartyMembers(_)));

    let mut second = connect(addr, "token=token-a").await;

    let closed = timeout(WAIT, async {
        loop {
            match first.next().await {
                Some(Ok(Message::Close(frame))) => return frame.map(|f| f.code),
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    })
    .await
    .expect("previous socket was not closed");
    assert_eq!(closed, Some(CloseCode::Normal));

    // The replacement keeps the identity and its memberships
    send(&mut second, "join:party", "lobby").await;
    assert!(matches!(next_event(&mut second).await, ServerEvent::PartyMembers(_)));

    let coordinator = server.coordinator();
    assert_eq!(coordinator.stats().await.connections, 1);
    let parties = coordinator.parties_of(&"u-a".into()).await;
    assert_eq!(parties, vec![PartyId::from("lobby"), PartyId::from("movie-night")]);
    let mut released = false;
    for _ in 0..50 {
        if server.active_connections() == 1 {
            released = true;
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert!(released);
}
