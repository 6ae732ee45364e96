//! Integration tests for the gateway session tasks.
//!
//! An in-process websocket server plays the gateway: it sends hello,
//! acknowledges heartbeats, and emits dispatches, while the real
//! listener/writer/heartbeat/identify tasks run against it over an
//! actual socket.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use accord_gateway::{
    run_heartbeat, run_identify, run_listener, run_writer, Disconnect,
    GatewayHandle, OutboundQueue, RestClient, Router, Session,
};
use accord_protocol::JsonCodec;
use accord_transport::WebSocketConnection;

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

async fn gateway_server() -> (String, tokio::task::JoinHandle<ServerWs>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        tokio_tungstenite::accept_async(stream).await.expect("upgrade")
    });
    (format!("ws://{addr}"), handle)
}

async fn send_json(ws: &mut ServerWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("server send");
}

async fn recv_json(ws: &mut ServerWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("server recv timed out")
            .expect("stream ended")
            .expect("frame error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("client sent JSON");
        }
    }
}

/// Spins up the per-connection task set the run loop would spawn.
struct Harness {
    session: Arc<Session>,
    listener: tokio::task::JoinHandle<Disconnect>,
    heartbeat: tokio::task::JoinHandle<()>,
    identify: tokio::task::JoinHandle<()>,
    writer: tokio::task::JoinHandle<()>,
}

impl Harness {
    async fn start(url: &str) -> Self {
        let conn = Arc::new(
            WebSocketConnection::connect(url).await.expect("connect"),
        );
        let session = Arc::new(Session::new());
        let router = Arc::new(Router::new());
        let gateway = GatewayHandle::new();
        let (queue, _queue_rx) = OutboundQueue::channel();
        let rest = RestClient::new(
            "http://127.0.0.1:1/api",
            "http://127.0.0.1:1/oauth2",
            "test-token",
        );

        let writer = {
            let conn = Arc::clone(&conn);
            let rx = gateway.attach();
            tokio::spawn(async move {
                let _ = run_writer(conn, JsonCodec, rx).await;
            })
        };
        let heartbeat = {
            let session = Arc::clone(&session);
            let gateway = gateway.clone();
            tokio::spawn(async move {
                let _ = run_heartbeat(session, gateway).await;
            })
        };
        let identify = {
            let session = Arc::clone(&session);
            let gateway = gateway.clone();
            tokio::spawn(async move {
                let _ = run_identify(session, gateway, "test-token".into()).await;
            })
        };
        let listener = tokio::spawn(run_listener(
            conn,
            JsonCodec,
            Arc::clone(&session),
            router,
            gateway,
            queue,
            rest,
        ));

        Self {
            session,
            listener,
            heartbeat,
            identify,
            writer,
        }
    }

    fn stop(&self) {
        self.heartbeat.abort();
        self.identify.abort();
        self.writer.abort();
    }
}

#[tokio::test]
async fn test_handshake_orders_heartbeat_before_identify() {
    let (url, server) = gateway_server().await;
    let harness = Harness::start(&url).await;
    let mut ws = server.await.expect("server side");

    send_json(&mut ws, json!({"op": 10, "d": {"heartbeat_interval": 500}})).await;

    // The first frame off the client must be a heartbeat, never identify.
    let first = recv_json(&mut ws).await;
    assert_eq!(first["op"], 1, "identify preceded the first heartbeat");
    assert!(first["d"].is_null(), "no dispatch seen yet");

    send_json(&mut ws, json!({"op": 11, "d": null, "s": null, "t": null})).await;

    // Identify follows the ack (steady beats may interleave).
    let identify = loop {
        let frame = recv_json(&mut ws).await;
        if frame["op"] == 2 {
            break frame;
        }
        assert_eq!(frame["op"], 1, "unexpected frame during handshake");
    };
    assert_eq!(identify["d"]["token"], "test-token");
    assert_eq!(identify["d"]["intents"], 0);

    harness.stop();
}

#[tokio::test]
async fn test_ready_dispatch_and_sequence_echo() {
    let (url, server) = gateway_server().await;
    let harness = Harness::start(&url).await;
    let mut ws = server.await.expect("server side");

    // Long interval keeps steady beats out of the picture; the beats we
    // see are the op-1-requested ones.
    send_json(&mut ws, json!({"op": 10, "d": {"heartbeat_interval": 60000}})).await;

    send_json(
        &mut ws,
        json!({
            "op": 0,
            "s": 1,
            "t": "READY",
            "d": {"resume_gateway_url": "wss://resume.example", "session_id": "sess-7"},
        }),
    )
    .await;
    send_json(&mut ws, json!({"op": 0, "s": 5, "t": "GUILD_CREATE", "d": {}})).await;

    // Ask for an immediate out-of-band heartbeat; it must echo the
    // maximum sequence seen so far. (A jittered first beat from the
    // coordinator may race past with an earlier value; every beat from
    // here on must carry 5.)
    send_json(&mut ws, json!({"op": 1, "d": null})).await;
    loop {
        let frame = recv_json(&mut ws).await;
        if frame["op"] == 1 && frame["d"] == 5 {
            break;
        }
        assert_eq!(frame["op"], 1, "unexpected frame: {frame}");
    }

    harness.session.wait_ready().await;
    assert_eq!(
        harness.session.resume_gateway_url().as_deref(),
        Some("wss://resume.example")
    );
    assert_eq!(harness.session.session_id().as_deref(), Some("sess-7"));
    assert_eq!(harness.session.last_sequence(), Some(5));

    harness.stop();
}

#[tokio::test]
async fn test_reconnect_directive_ends_listener() {
    let (url, server) = gateway_server().await;
    let harness = Harness::start(&url).await;
    let mut ws = server.await.expect("server side");

    send_json(&mut ws, json!({"op": 7, "d": null})).await;

    harness.stop();
    let disconnect = tokio::time::timeout(Duration::from_secs(5), harness.listener)
        .await
        .expect("listener should return")
        .expect("listener task");
    assert!(matches!(disconnect, Disconnect::ReconnectRequested));
}

#[tokio::test]
async fn test_voice_handoff_capture() {
    let (url, server) = gateway_server().await;
    let harness = Harness::start(&url).await;
    let mut ws = server.await.expect("server side");

    send_json(
        &mut ws,
        json!({
            "op": 0,
            "s": 2,
            "t": "VOICE_STATE_UPDATE",
            "d": {"session_id": "v-sess", "user_id": "u-1", "channel_id": "c-1"},
        }),
    )
    .await;
    send_json(
        &mut ws,
        json!({
            "op": 0,
            "s": 3,
            "t": "VOICE_SERVER_UPDATE",
            "d": {"token": "v-tok", "guild_id": "g-1", "endpoint": "voice.example:443"},
        }),
    )
    .await;

    let handoff = tokio::time::timeout(
        Duration::from_secs(5),
        harness.session.take_voice_handoff(),
    )
    .await
    .expect("handoff should complete");
    assert_eq!(handoff.endpoint.as_deref(), Some("voice.example:443"));
    assert_eq!(handoff.token.as_deref(), Some("v-tok"));
    assert_eq!(handoff.guild_id.as_deref(), Some("g-1"));
    assert_eq!(handoff.session_id.as_deref(), Some("v-sess"));
    assert_eq!(handoff.user_id.as_deref(), Some("u-1"));

    harness.stop();
}

#[tokio::test]
async fn test_anomalous_frames_are_ignored_not_fatal() {
    let (url, server) = gateway_server().await;
    let harness = Harness::start(&url).await;
    let mut ws = server.await.expect("server side");

    // Garbage, an unknown opcode, and a malformed hello…
    send_json(&mut ws, json!({"op": 99, "d": {"weird": true}})).await;
    ws.send(Message::Text("not json at all".to_owned().into()))
        .await
        .unwrap();
    send_json(&mut ws, json!({"op": 10, "d": {}})).await;

    // …and the listener still processes the next good frame.
    send_json(&mut ws, json!({"op": 10, "d": {"heartbeat_interval": 250}})).await;

    let first_beat = recv_json(&mut ws).await;
    assert_eq!(first_beat["op"], 1);
    assert_eq!(harness.session.heartbeat_interval(), Some(250));

    harness.stop();
}

#[tokio::test]
async fn test_server_close_ends_listener_with_closed() {
    let (url, server) = gateway_server().await;
    let harness = Harness::start(&url).await;
    let mut ws = server.await.expect("server side");

    ws.send(Message::Close(None)).await.unwrap();

    harness.stop();
    let disconnect = tokio::time::timeout(Duration::from_secs(5), harness.listener)
        .await
        .expect("listener should return")
        .expect("listener task");
    assert!(matches!(disconnect, Disconnect::Closed));
}
