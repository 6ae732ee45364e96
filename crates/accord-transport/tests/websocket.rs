//! Integration tests for the outbound WebSocket connection.
//!
//! These spin up a real in-process WebSocket server (a bare
//! `tokio-tungstenite` accept loop) and point the client at it, so the
//! frames actually cross a socket.

use accord_transport::{Connection, WebSocketConnection};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

/// Helper: binds a one-shot server on an OS-assigned port and returns
/// its address plus a handle resolving to the accepted server-side
/// stream.
async fn one_shot_server() -> (
    String,
    tokio::task::JoinHandle<
        tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    >,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        tokio_tungstenite::accept_async(stream).await.expect("upgrade")
    });
    (format!("ws://{addr}"), handle)
}

#[tokio::test]
async fn test_connect_send_and_receive() {
    let (url, server) = one_shot_server().await;

    let conn = WebSocketConnection::connect(&url)
        .await
        .expect("client should connect");
    let mut server_ws = server.await.expect("server side");

    assert!(conn.id().into_inner() > 0);

    // --- Client sends, server receives ---
    conn.send(r#"{"op":1,"d":null}"#).await.expect("send");
    let msg = server_ws.next().await.unwrap().unwrap();
    assert_eq!(msg.into_text().unwrap().as_str(), r#"{"op":1,"d":null}"#);

    // --- Server sends, client receives ---
    server_ws
        .send(Message::Text(r#"{"op":11}"#.to_owned().into()))
        .await
        .unwrap();
    let received = conn.recv().await.expect("recv").expect("data");
    assert_eq!(received, br#"{"op":11}"#);
}

#[tokio::test]
async fn test_binary_frames_are_delivered_as_bytes() {
    let (url, server) = one_shot_server().await;
    let conn = WebSocketConnection::connect(&url).await.expect("connect");
    let mut server_ws = server.await.expect("server side");

    server_ws
        .send(Message::Binary(b"\x01\x02\x03".to_vec().into()))
        .await
        .unwrap();
    let received = conn.recv().await.expect("recv").expect("data");
    assert_eq!(received, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_recv_skips_ping_frames() {
    let (url, server) = one_shot_server().await;
    let conn = WebSocketConnection::connect(&url).await.expect("connect");
    let mut server_ws = server.await.expect("server side");

    server_ws
        .send(Message::Ping(b"keepalive".to_vec().into()))
        .await
        .unwrap();
    server_ws
        .send(Message::Text("after-ping".to_owned().into()))
        .await
        .unwrap();

    // The ping never surfaces; the next payload does.
    let received = conn.recv().await.expect("recv").expect("data");
    assert_eq!(received, b"after-ping");
}

#[tokio::test]
async fn test_recv_returns_none_on_server_close() {
    let (url, server) = one_shot_server().await;
    let conn = WebSocketConnection::connect(&url).await.expect("connect");
    let mut server_ws = server.await.expect("server side");

    server_ws.send(Message::Close(None)).await.unwrap();

    let result = conn.recv().await.expect("recv should not error");
    assert!(result.is_none(), "should return None on clean close");
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    // Grab a port, then close the listener so nothing is there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = WebSocketConnection::connect(&format!("ws://{addr}")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_send_while_recv_is_parked() {
    // A recv waiting on a quiet socket must not block a send: the
    // gateway needs exactly this to emit heartbeats while listening.
    let (url, server) = one_shot_server().await;
    let conn = std::sync::Arc::new(
        WebSocketConnection::connect(&url).await.expect("connect"),
    );
    let mut server_ws = server.await.expect("server side");

    let reader = {
        let conn = std::sync::Arc::clone(&conn);
        tokio::spawn(async move { conn.recv().await })
    };
    // Give the reader task time to park inside recv().
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    conn.send("heartbeat-while-parked").await.expect("send");
    let msg = server_ws.next().await.unwrap().unwrap();
    assert_eq!(msg.into_text().unwrap().as_str(), "heartbeat-while-parked");

    // Unblock and finish the reader.
    server_ws
        .send(Message::Text("done".to_owned().into()))
        .await
        .unwrap();
    let received = reader.await.unwrap().expect("recv").expect("data");
    assert_eq!(received, b"done");
}
