//! End-to-end tests over real WebSocket connections

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use room_chat_server::{handle_connection, ChatServer, ServerCommand, ServerConfig};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a server on an ephemeral port and return its address
async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    tokio::spawn(ChatServer::new(cmd_rx, ServerConfig::default()).run());

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let cmd_tx = cmd_tx.clone();
            tokio::spawn(handle_connection(stream, cmd_tx));
        }
    });

    format!("ws://{}", addr)
}

async fn send(socket: &mut Socket, event: Value) {
    socket
        .send(Message::Text(event.to_string().into()))
        .await
        .unwrap();
}

/// Next text frame as JSON, or `None` once the server closes the socket
async fn next_event(socket: &mut Socket) -> Option<Value> {
    loop {
        let frame = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for server");
        match frame {
            Some(Ok(Message::Text(text))) => return Some(serde_json::from_str(&text).unwrap()),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

/// Skip frames until one of the given type arrives
async fn expect(socket: &mut Socket, kind: &str) -> Value {
    loop {
        let event = next_event(socket)
            .await
            .unwrap_or_else(|| panic!("socket closed while waiting for {}", kind));
        if event["type"] == kind {
            return event;
        }
    }
}

async fn connect(url: &str) -> (Socket, String) {
    let (mut socket, _) = connect_async(url).await.unwrap();
    let connected = expect(&mut socket, "connected").await;
    let sid = connected["sid"].as_str().unwrap().to_string();
    (socket, sid)
}

#[tokio::test]
async fn test_chat_over_websocket() {
    let url = start_server().await;
    let (mut alice, alice_sid) = connect(&url).await;
    let (mut bob, _) = connect(&url).await;

    send(&mut alice, json!({"type": "join", "room": "ABC", "nickname": "Alice"})).await;
    let joined = expect(&mut alice, "join_success").await;
    assert_eq!(joined["sid"], alice_sid);
    assert_eq!(joined["users"][&alice_sid]["role"], "owner");

    send(&mut bob, json!({"type": "join", "room": "ABC", "nickname": "Bob"})).await;
    expect(&mut bob, "join_success").await;

    send(
        &mut alice,
        json!({"type": "send_message", "id": 1, "message": "hi Bob", "timestamp": 0}),
    )
    .await;
    let received = expect(&mut bob, "receive_message").await;
    assert_eq!(received["message"], "hi Bob");
    assert_eq!(received["sid"], alice_sid);

    // Garbage is dropped without closing the connection
    bob.send(Message::Text("not json".to_string().into()))
        .await
        .unwrap();
    send(&mut bob, json!({"type": "typing", "is_typing": true})).await;
    let typing = expect(&mut alice, "typing_status").await;
    assert_eq!(typing["nickname"], "Bob");
}

#[tokio::test]
async fn test_kick_closes_connection() {
    let url = start_server().await;
    let (mut alice, _) = connect(&url).await;
    let (mut bob, bob_sid) = connect(&url).await;

    send(&mut alice, json!({"type": "join", "room": "KICK", "nickname": "Alice"})).await;
    expect(&mut alice, "join_success").await;
    send(&mut bob, json!({"type": "join", "room": "KICK", "nickname": "Bob"})).await;
    expect(&mut bob, "join_success").await;

    send(&mut alice, json!({"type": "kick_user", "sid": bob_sid})).await;

    let kicked = expect(&mut bob, "kicked").await;
    assert_eq!(kicked["reason"], "You have been kicked by Alice.");
    while next_event(&mut bob).await.is_some() {}

    // Alice eventually sees Bob gone from the member list
    loop {
        let update = expect(&mut alice, "update_user_list").await;
        if update["users"].get(&bob_sid).is_none() {
            break;
        }
    }
}

#[tokio::test]
async fn test_owner_leaving_hands_over() {
    let url = start_server().await;
    let (mut alice, _) = connect(&url).await;
    let (mut bob, bob_sid) = connect(&url).await;

    send(&mut alice, json!({"type": "join", "room": "HAND", "nickname": "Alice"})).await;
    expect(&mut alice, "join_success").await;
    send(&mut bob, json!({"type": "join", "room": "HAND", "nickname": "Bob"})).await;
    expect(&mut bob, "join_success").await;

    alice.close(None).await.unwrap();

    let promoted = expect(&mut bob, "role_changed").await;
    assert_eq!(promoted["sid"], bob_sid);
    assert_eq!(promoted["role"], "owner");
}

#[tokio::test]
async fn test_abrupt_close_reports_disconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (cmd_tx, mut cmd_rx) = mpsc::channel(16);

    let handler = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        handle_connection(stream, cmd_tx).await
    });

    let (socket, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

    let registered = timeout(Duration::from_secs(5), cmd_rx.recv())
        .await
        .expect("timed out waiting for connect");
    let Some(ServerCommand::Connect { client_id, sender, .. }) = registered else {
        panic!("expected connect command");
    };

    // Drop the socket without a close handshake
    drop(socket);

    let next = timeout(Duration::from_secs(5), cmd_rx.recv())
        .await
        .expect("timed out waiting for disconnect");
    match next {
        Some(ServerCommand::Disconnect { client_id: gone }) => assert_eq!(gone, client_id),
        _ => panic!("expected disconnect command"),
    }

    assert!(handler.await.unwrap().is_ok());
    drop(sender);
}
