//! End-to-end watch flow against a local Socket.IO server.
//!
//! The REST side is a scripted `FakeBackend`; the realtime side is a real
//! WebSocket speaking Engine.IO v4 / Socket.IO v5 on 127.0.0.1.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use waiterdesk::headless::{watch_calls, HeadlessEvent, WatchCommand};
use waiterdesk_app::{AppContext, Settings};
use waiterdesk_client::test_utils::{call_json, sample_session, FakeBackend};
use waiterdesk_client::SessionStore;
use waiterdesk_core::{CallStatus, Error};

const OPEN: &str = r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;
const TIMEOUT: Duration = Duration::from_secs(10);

type ServerSocket = WebSocketStream<TcpStream>;

async fn next_text(ws: &mut ServerSocket) -> String {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return text.as_str().to_string(),
            Some(Ok(_)) => continue,
            other => panic!("server stream ended: {other:?}"),
        }
    }
}

async fn send(ws: &mut ServerSocket, text: String) {
    ws.send(Message::Text(text.into())).await.unwrap();
}

/// Accept one client and run the handshake; returns the CONNECT and room
/// join packets the client sent.
async fn accept_client(listener: &TcpListener) -> (ServerSocket, String, String) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = accept_async(stream).await.unwrap();
    send(&mut ws, OPEN.to_string()).await;
    let connect = next_text(&mut ws).await;
    send(&mut ws, r#"40{"sid":"x"}"#.to_string()).await;
    let join = next_text(&mut ws).await;
    (ws, connect, join)
}

async fn setup() -> (AppContext<FakeBackend>, FakeBackend, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut settings = Settings::default();
    settings.environments.dev.socket_url = format!("http://{addr}");
    settings.realtime.initial_delay_ms = 20;
    settings.realtime.max_delay_ms = 100;

    let backend = FakeBackend::new();
    let session = SessionStore::in_memory();
    session.save(&sample_session("tok-1")).unwrap();
    let ctx = AppContext::with_backend(settings, backend.clone(), session).unwrap();
    (ctx, backend, listener)
}

fn is_added(event: &HeadlessEvent, id: &str) -> bool {
    matches!(event, HeadlessEvent::CallAdded { call, .. } if call.call_id == id)
}

#[tokio::test]
async fn test_watch_applies_realtime_events() {
    let (ctx, backend, listener) = setup().await;
    backend.push_json(200, json!({"success": true, "data": [call_json("A", "pending")]}));
    backend.push_json(200, call_json("A", "resolved"));

    let (go_tx, go_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let (mut ws, connect, join) = accept_client(&listener).await;
        go_rx.await.unwrap();

        let new_call = json!(["new_waiter_call", call_json("B", "pending")]).to_string();
        send(&mut ws, format!("42{new_call}")).await;
        // Duplicate delivery
        send(&mut ws, format!("42{new_call}")).await;
        send(
            &mut ws,
            r#"42["waiter_call_status_updated",{"callId":"A","status":"acknowledged"}]"#
                .to_string(),
        )
        .await;

        let leave = next_text(&mut ws).await;
        (connect, join, leave)
    });

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::channel(4);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let watcher = watch_calls(&ctx, "r1", cmd_rx, shutdown_rx, move |event| {
        let _ = events_tx.send(event);
    });

    let driver = async {
        let mut seen = Vec::new();

        let first = events_rx.recv().await.unwrap();
        match &first {
            HeadlessEvent::Snapshot { restaurant_id, calls, .. } => {
                assert_eq!(restaurant_id, "r1");
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].call_id, "A");
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
        go_tx.send(()).unwrap();

        // Both changes may arrive in one notification, in either order
        while !(seen.iter().any(|e| is_added(e, "B"))
            && seen.iter().any(|e| matches!(e, HeadlessEvent::CallStatusChanged { .. })))
        {
            seen.push(events_rx.recv().await.unwrap());
        }

        cmd_tx
            .send(WatchCommand::Resolve("A".to_string()))
            .await
            .unwrap();
        loop {
            let event = events_rx.recv().await.unwrap();
            let done = matches!(event, HeadlessEvent::CommandSucceeded { .. });
            seen.push(event);
            if done {
                break;
            }
        }

        cmd_tx.send(WatchCommand::Quit).await.unwrap();
        seen
    };

    let (result, seen) = tokio::time::timeout(TIMEOUT, async { tokio::join!(watcher, driver) })
        .await
        .expect("watch flow timed out");
    result.unwrap();

    assert_eq!(seen.iter().filter(|e| is_added(e, "B")).count(), 1);
    assert!(seen.iter().any(|e| matches!(
        e,
        HeadlessEvent::CallStatusChanged { call_id, from: CallStatus::Pending, to: CallStatus::Acknowledged, .. }
            if call_id == "A"
    )));
    assert!(seen.iter().any(|e| matches!(
        e,
        HeadlessEvent::CommandSucceeded { command, call_id: Some(id), .. }
            if command == "resolve" && id == "A"
    )));

    // The resolve request went out; the list only follows server events
    let request = backend.last_request().unwrap();
    assert_eq!(request.url.path(), "/api/waiter-calls/A/status");
    assert_eq!(request.body, Some(json!({"status": "resolved"})));

    let (connect, join, leave) = server.await.unwrap();
    assert_eq!(connect, r#"40{"token":"tok-1"}"#);
    assert_eq!(join, r#"42["joinRestaurantRoom","r1"]"#);
    assert_eq!(leave, "41");
    assert!(ctx.realtime.joined_rooms().is_empty());
}

#[tokio::test]
async fn test_watch_stops_when_session_cleared() {
    let (ctx, backend, listener) = setup().await;
    backend.push_json(200, json!([]));

    let server = tokio::spawn(async move {
        let (mut ws, _, _) = accept_client(&listener).await;
        next_text(&mut ws).await
    });

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (_cmd_tx, cmd_rx) = mpsc::channel(4);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let watcher = watch_calls(&ctx, "r1", cmd_rx, shutdown_rx, move |event| {
        let _ = events_tx.send(event);
    });
    let driver = async {
        let first = events_rx.recv().await.unwrap();
        assert_eq!(first.name(), "snapshot");
        ctx.session().clear().unwrap();

        loop {
            let event = events_rx.recv().await.unwrap();
            if matches!(event, HeadlessEvent::SessionCleared { .. }) {
                break;
            }
        }
    };

    let (result, ()) = tokio::time::timeout(TIMEOUT, async { tokio::join!(watcher, driver) })
        .await
        .expect("watch did not stop");
    result.unwrap();
    assert_eq!(server.await.unwrap(), "41");
}

#[tokio::test]
async fn test_watch_ends_on_server_disconnect() {
    let (ctx, backend, listener) = setup().await;
    backend.push_json(200, json!([]));

    let (go_tx, go_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let (mut ws, _, _) = accept_client(&listener).await;
        go_rx.await.unwrap();
        send(&mut ws, "41".to_string()).await;
        // Keep the socket open until the client goes away
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (_cmd_tx, cmd_rx) = mpsc::channel(4);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let watcher = watch_calls(&ctx, "r1", cmd_rx, shutdown_rx, move |event| {
        let _ = events_tx.send(event);
    });
    let driver = async {
        assert_eq!(events_rx.recv().await.unwrap().name(), "snapshot");
        assert_eq!(events_rx.recv().await.unwrap().name(), "connection");
        go_tx.send(()).unwrap();

        let mut last_state = None;
        while let Some(event) = events_rx.recv().await {
            if let HeadlessEvent::Connection { state, .. } = event {
                last_state = Some(state);
            }
        }
        last_state
    };

    let (result, last_state) =
        tokio::time::timeout(TIMEOUT, async { tokio::join!(watcher, driver) })
            .await
            .expect("watch did not end");

    assert!(matches!(result, Err(Error::Realtime { .. })));
    assert_eq!(last_state.as_deref(), Some("disconnected"));
    server.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_signal_ends_watch() {
    let (ctx, backend, listener) = setup().await;
    backend.push_json(200, json!([call_json("A", "pending")]));

    let server = tokio::spawn(async move {
        let (mut ws, _, _) = accept_client(&listener).await;
        next_text(&mut ws).await
    });

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (_cmd_tx, cmd_rx) = mpsc::channel(4);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let watcher = watch_calls(&ctx, "r1", cmd_rx, shutdown_rx, move |event| {
        let _ = events_tx.send(event);
    });
    let driver = async {
        assert_eq!(events_rx.recv().await.unwrap().name(), "snapshot");
        shutdown_tx.send(true).unwrap();
    };

    let (result, ()) = tokio::time::timeout(TIMEOUT, async { tokio::join!(watcher, driver) })
        .await
        .expect("watch did not stop");
    result.unwrap();
    assert_eq!(server.await.unwrap(), "41");
}
