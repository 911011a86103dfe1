//! Owned Socket.IO channel with a background I/O task.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      RealtimeChannel                          │
//! │                                                               │
//! │  ┌───────────────┐        ┌────────────────────────────────┐ │
//! │  │  Public API   │        │   Background Task               │ │
//! │  │               │        │                                 │ │
//! │  │  emit()  ─────┼──cmd──▶│  WebSocket read/write loop      │ │
//! │  │  join_…()     │  chan  │  ping/pong, reconnect + backoff │ │
//! │  │               │        │                                 │ │
//! │  │  on()/off() ──┼──────▶ │  Listeners::dispatch(event)     │ │
//! │  └───────────────┘        └────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is at most one live connection per channel. [`RealtimeChannel::connect`]
//! returns the existing [`RealtimeHandle`] while its task is running.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch, Mutex};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use waiterdesk_core::prelude::*;
use waiterdesk_core::{join_room_payload, require_id, JOIN_RESTAURANT_ROOM};

use crate::session::SessionStore;

use super::listeners::{Callback, ListenerGuard, Listeners};
use super::protocol::{
    namespace_from_url, websocket_url, EngineFrame, OpenHandshake, SocketPacket,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Capacity of the command channel (bounded, to apply backpressure).
const CMD_CHANNEL_CAPACITY: usize = 64;

/// Time allowed for the WebSocket upgrade plus the Socket.IO handshake.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Reconnection schedule after an unexpected connection loss.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt `n` (1-indexed): `initial * 2^(n-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier: u32 = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Server base URL (`http(s)://` or `ws(s)://`).
    pub url: Url,
    pub namespace: String,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout: Duration,
}

impl RealtimeConfig {
    /// Config for `url`; the URL path, if any, selects the namespace.
    pub fn new(url: Url) -> Self {
        let namespace = namespace_from_url(&url);
        Self {
            url,
            namespace,
            reconnect: ReconnectPolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Current connection state of a [`RealtimeChannel`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// Not connected and not attempting to connect.
    Disconnected,
    /// Initial connection attempt in progress.
    Connecting,
    /// Connected and joined to the namespace.
    Connected,
    /// Connection lost; background task is retrying.
    Reconnecting {
        /// The current reconnection attempt number (1-indexed).
        attempt: u32,
    },
}

/// Internal messages sent from the public API to the background task.
#[derive(Debug)]
enum ChannelCommand {
    Emit { name: String, payload: Value },
    Disconnect,
}

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;

/// A clonable handle on a running connection.
///
/// Becomes inert once the background task exits; [`emit`](Self::emit) then
/// returns [`Error::ChannelClosed`].
#[derive(Clone)]
pub struct RealtimeHandle {
    cmd_tx: mpsc::Sender<ChannelCommand>,
    state: watch::Receiver<ConnectionState>,
}

impl std::fmt::Debug for RealtimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeHandle")
            .field("connection_state", &*self.state.borrow())
            .finish()
    }
}

impl RealtimeHandle {
    /// Queue an event for the server. Events queued while reconnecting are
    /// sent once the connection is back.
    pub async fn emit(&self, name: &str, payload: Value) -> Result<()> {
        self.cmd_tx
            .send(ChannelCommand::Emit {
                name: name.to_string(),
                payload,
            })
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.state.borrow() == ConnectionState::Connected
    }

    /// True once the background task has exited.
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    /// Observe state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    async fn disconnect(&self) {
        // The task may already be gone; nothing to do then.
        let _ = self.cmd_tx.send(ChannelCommand::Disconnect).await;
    }
}

// ---------------------------------------------------------------------------
// RealtimeChannel
// ---------------------------------------------------------------------------

struct ChannelInner {
    config: RealtimeConfig,
    listeners: Listeners,
    /// Rooms joined through [`RealtimeChannel::join_restaurant_room`],
    /// replayed after every reconnect.
    rooms: Arc<RwLock<Vec<String>>>,
    auth_token: Arc<RwLock<TokenSource>>,
    handle: Mutex<Option<RealtimeHandle>>,
}

/// Where the `CONNECT` auth token comes from. Read on every (re)connection.
#[derive(Clone, Default)]
enum TokenSource {
    #[default]
    Anonymous,
    Fixed(String),
    Session(SessionStore),
}

impl TokenSource {
    fn token(&self) -> Option<String> {
        match self {
            TokenSource::Anonymous => None,
            TokenSource::Fixed(token) => Some(token.clone()),
            TokenSource::Session(session) => session.token().unwrap_or_else(|e| {
                warn!("Realtime: could not read session token: {}", e);
                None
            }),
        }
    }
}

fn read_token(source: &RwLock<TokenSource>) -> Option<String> {
    source.read().unwrap_or_else(|e| e.into_inner()).token()
}

/// Explicitly owned realtime connection. Clones share the connection,
/// listener table and joined rooms.
#[derive(Clone)]
pub struct RealtimeChannel {
    inner: Arc<ChannelInner>,
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("url", &self.inner.config.url.as_str())
            .field("namespace", &self.inner.config.namespace)
            .finish()
    }
}

impl RealtimeChannel {
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                config,
                listeners: Listeners::new(),
                rooms: Arc::new(RwLock::new(Vec::new())),
                auth_token: Arc::new(RwLock::new(TokenSource::default())),
                handle: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }

    /// Token sent in the Socket.IO `CONNECT` auth payload on the next
    /// (re)connection.
    pub fn set_auth_token(&self, token: Option<String>) {
        self.set_token_source(token.map_or(TokenSource::Anonymous, TokenSource::Fixed));
    }

    /// Read the token from `session` at every (re)connection, so a session
    /// cleared by a 401 or a logout stops being presented.
    pub fn use_session_token(&self, session: SessionStore) {
        self.set_token_source(TokenSource::Session(session));
    }

    fn set_token_source(&self, source: TokenSource) {
        *self.inner.auth_token.write().unwrap_or_else(|e| e.into_inner()) = source;
    }

    /// Connect, or return the handle of the live connection.
    ///
    /// The first connection must succeed before this returns; later losses are
    /// handled by the background task.
    pub async fn connect(&self) -> Result<RealtimeHandle> {
        let mut slot = self.inner.handle.lock().await;
        if let Some(handle) = slot.as_ref() {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }

        let config = self.inner.config.clone();
        let token = read_token(&self.inner.auth_token);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        info!("Connecting to realtime server at {}", config.url);
        let (ws_stream, handshake) = match open_socket(&config, token.as_deref()).await {
            Ok(opened) => opened,
            Err(e) => {
                state_tx.send_replace(ConnectionState::Disconnected);
                return Err(e);
            }
        };
        state_tx.send_replace(ConnectionState::Connected);
        info!("Realtime connected (sid {})", handshake.sid);

        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CHANNEL_CAPACITY);
        tokio::spawn(run_channel_task(
            ChannelTask {
                config,
                listeners: self.inner.listeners.clone(),
                rooms: Arc::clone(&self.inner.rooms),
                auth_token: Arc::clone(&self.inner.auth_token),
                state: state_tx,
            },
            ws_stream,
            handshake,
            cmd_rx,
        ));

        let handle = RealtimeHandle {
            cmd_tx,
            state: state_rx,
        };
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// The live handle, connecting on first use.
    pub async fn handle(&self) -> Result<RealtimeHandle> {
        self.connect().await
    }

    pub fn connection_state(&self) -> ConnectionState {
        match self.inner.handle.try_lock() {
            Ok(slot) => slot
                .as_ref()
                .map_or(ConnectionState::Disconnected, RealtimeHandle::connection_state),
            // A connect() is in flight.
            Err(_) => ConnectionState::Connecting,
        }
    }

    /// Register `callback` for `event`; the listener lives as long as the guard.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerGuard
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        self.inner.listeners.add(event, callback)
    }

    /// Remove every listener for `event`.
    pub fn off(&self, event: &str) -> usize {
        self.inner.listeners.remove_all(event)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.listeners.count(event)
    }

    /// Send `payload` as event `name`, connecting first if needed.
    pub async fn emit(&self, name: &str, payload: Value) -> Result<()> {
        self.handle().await?.emit(name, payload).await
    }

    /// Subscribe this socket to a restaurant's broadcasts. The room is
    /// rejoined automatically after a reconnect.
    pub async fn join_restaurant_room(&self, restaurant_id: &str) -> Result<()> {
        require_id("restaurantId", restaurant_id)?;
        {
            let mut rooms = self.inner.rooms.write().unwrap_or_else(|e| e.into_inner());
            if !rooms.iter().any(|r| r == restaurant_id) {
                rooms.push(restaurant_id.to_string());
            }
        }
        debug!("Joining restaurant room {}", restaurant_id);
        self.emit(JOIN_RESTAURANT_ROOM, join_room_payload(restaurant_id))
            .await
    }

    /// Rooms that will be rejoined after a reconnect.
    pub fn joined_rooms(&self) -> Vec<String> {
        self.inner
            .rooms
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Close the connection. Listeners stay registered; joined rooms are
    /// forgotten.
    pub async fn disconnect(&self) {
        let handle = self.inner.handle.lock().await.take();
        self.inner
            .rooms
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        if let Some(handle) = handle {
            info!("Disconnecting realtime channel");
            handle.disconnect().await;
        }
    }

    /// Deliver an event to local listeners as if the server had sent it.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn inject_event(&self, event: &str, payload: &Value) -> usize {
        self.inner.listeners.dispatch(event, payload)
    }
}

// ---------------------------------------------------------------------------
// Connection setup
// ---------------------------------------------------------------------------

/// Open the WebSocket and complete the Engine.IO and Socket.IO handshakes.
async fn open_socket(
    config: &RealtimeConfig,
    token: Option<&str>,
) -> Result<(WsStream, OpenHandshake)> {
    let url = websocket_url(&config.url)?;
    tokio::time::timeout(config.connect_timeout, handshake(url, &config.namespace, token))
        .await
        .map_err(|_| {
            Error::realtime(format!(
                "handshake timed out after {:?}",
                config.connect_timeout
            ))
        })?
}

async fn handshake(
    url: Url,
    namespace: &str,
    token: Option<&str>,
) -> Result<(WsStream, OpenHandshake)> {
    let (mut ws, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| Error::realtime(format!("Failed to connect to {url}: {e}")))?;

    let open = match next_engine_frame(&mut ws).await? {
        EngineFrame::Open(open) => open,
        other => {
            return Err(Error::protocol(format!(
                "expected engine open packet, got {other:?}"
            )))
        }
    };

    let connect = SocketPacket::Connect {
        namespace: namespace.to_string(),
        data: token.map(|t| json!({ "token": t })),
    };
    ws.send(WsMessage::Text(connect.to_frame().into()))
        .await
        .map_err(|e| Error::realtime(format!("Failed to send connect packet: {e}")))?;

    loop {
        match next_engine_frame(&mut ws).await? {
            EngineFrame::Message(payload) => match SocketPacket::parse(&payload)? {
                SocketPacket::Connect { namespace: ns, .. } if ns == namespace => {
                    return Ok((ws, open));
                }
                SocketPacket::ConnectError { message, .. } => {
                    return Err(Error::realtime(format!("Server refused connection: {message}")));
                }
                other => debug!("Ignoring packet during handshake: {:?}", other),
            },
            EngineFrame::Ping => {
                ws.send(WsMessage::Text(EngineFrame::Pong.encode().into()))
                    .await
                    .map_err(|e| Error::realtime(format!("Failed to send pong: {e}")))?;
            }
            EngineFrame::Close => return Err(Error::realtime("server closed during handshake")),
            _ => {}
        }
    }
}

async fn next_engine_frame(ws: &mut WsStream) -> Result<EngineFrame> {
    loop {
        match ws.next().await {
            Some(Ok(WsMessage::Text(text))) => return EngineFrame::parse(text.as_str()),
            Some(Ok(WsMessage::Close(_))) | None => {
                return Err(Error::realtime("connection closed during handshake"))
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(Error::realtime(format!("WebSocket read error: {e}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Background task
// ---------------------------------------------------------------------------

struct ChannelTask {
    config: RealtimeConfig,
    listeners: Listeners,
    rooms: Arc<RwLock<Vec<String>>>,
    auth_token: Arc<RwLock<TokenSource>>,
    state: watch::Sender<ConnectionState>,
}

/// Why an I/O loop ended.
#[derive(Debug, PartialEq)]
enum LoopExit {
    /// Disconnect command or every handle dropped.
    Shutdown,
    /// The server disconnected this socket on purpose.
    ServerDisconnect,
    /// Transport failure or missed ping; eligible for reconnection.
    Lost,
}

/// What a reconnect wait was interrupted by.
enum WaitOutcome {
    Elapsed,
    Shutdown,
}

async fn run_channel_task(
    task: ChannelTask,
    ws_stream: WsStream,
    handshake: OpenHandshake,
    mut cmd_rx: mpsc::Receiver<ChannelCommand>,
) {
    let mut pending: Vec<(String, Value)> = Vec::new();
    let mut exit = run_io_loop(&task, ws_stream, &handshake, &mut cmd_rx, &mut pending, false).await;

    let policy = &task.config.reconnect;
    let mut attempt: u32 = 1;
    while exit == LoopExit::Lost && policy.enabled {
        if attempt > policy.max_attempts {
            error!(
                "Realtime: exceeded {} reconnection attempts, giving up",
                policy.max_attempts
            );
            break;
        }
        task.state
            .send_replace(ConnectionState::Reconnecting { attempt });

        let backoff = policy.backoff(attempt);
        warn!(
            "Realtime: connection lost, retrying in {:?} (attempt {}/{})",
            backoff, attempt, policy.max_attempts
        );
        if let WaitOutcome::Shutdown = wait_for_retry(backoff, &mut cmd_rx, &mut pending).await {
            exit = LoopExit::Shutdown;
            break;
        }

        let token = read_token(&task.auth_token);
        match open_socket(&task.config, token.as_deref()).await {
            Ok((ws_stream, handshake)) => {
                info!("Realtime: reconnected (attempt {})", attempt);
                task.state.send_replace(ConnectionState::Connected);
                attempt = 1;
                exit =
                    run_io_loop(&task, ws_stream, &handshake, &mut cmd_rx, &mut pending, true)
                        .await;
            }
            Err(e) => {
                warn!("Realtime: reconnection attempt {} failed: {}", attempt, e);
                attempt += 1;
            }
        }
    }

    if exit == LoopExit::ServerDisconnect {
        info!("Realtime: server closed the session");
    }
    task.state.send_replace(ConnectionState::Disconnected);
    debug!("Realtime background task exiting");
}

/// Sleep for `backoff` while still honouring commands: emits are buffered,
/// a disconnect ends the wait.
async fn wait_for_retry(
    backoff: Duration,
    cmd_rx: &mut mpsc::Receiver<ChannelCommand>,
    pending: &mut Vec<(String, Value)>,
) -> WaitOutcome {
    let sleep = tokio::time::sleep(backoff);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return WaitOutcome::Elapsed,
            cmd = cmd_rx.recv() => match cmd {
                Some(ChannelCommand::Emit { name, payload }) => pending.push((name, payload)),
                Some(ChannelCommand::Disconnect) | None => return WaitOutcome::Shutdown,
            },
        }
    }
}

/// Run one connection's read/write select loop.
async fn run_io_loop(
    task: &ChannelTask,
    ws_stream: WsStream,
    handshake: &OpenHandshake,
    cmd_rx: &mut mpsc::Receiver<ChannelCommand>,
    pending: &mut Vec<(String, Value)>,
    rejoin: bool,
) -> LoopExit {
    let (mut ws_sink, mut ws_source) = ws_stream.split();
    let namespace = task.config.namespace.as_str();

    if rejoin {
        rejoin_rooms(task, &mut ws_sink).await;
    }
    for (name, payload) in pending.drain(..) {
        if let Err(e) = send_event(&mut ws_sink, namespace, &name, payload).await {
            warn!("Realtime: failed to flush '{}': {}", name, e);
        }
    }

    let deadline = handshake.ping_deadline();
    let ping_timer = tokio::time::sleep(deadline);
    tokio::pin!(ping_timer);

    loop {
        tokio::select! {
            frame = ws_source.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        match handle_text(text.as_str(), namespace, &task.listeners, &mut ws_sink).await {
                            FrameOutcome::Continue => {}
                            FrameOutcome::Pinged => {
                                ping_timer.as_mut().reset(tokio::time::Instant::now() + deadline);
                            }
                            FrameOutcome::Exit(exit) => return exit,
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        debug!("Realtime: received Close frame");
                        return LoopExit::Lost;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!("Realtime: WebSocket read error: {}", err);
                        return LoopExit::Lost;
                    }
                    None => {
                        debug!("Realtime: WebSocket stream ended");
                        return LoopExit::Lost;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ChannelCommand::Emit { name, payload }) => {
                        if let Err(e) = send_event(&mut ws_sink, namespace, &name, payload.clone()).await {
                            warn!("Realtime: emit '{}' failed, will retry after reconnect: {}", name, e);
                            pending.push((name, payload));
                            return LoopExit::Lost;
                        }
                    }
                    Some(ChannelCommand::Disconnect) | None => {
                        send_close(&mut ws_sink, namespace).await;
                        return LoopExit::Shutdown;
                    }
                }
            }

            _ = &mut ping_timer => {
                warn!("Realtime: no ping from server within {:?}", deadline);
                return LoopExit::Lost;
            }
        }
    }
}

enum FrameOutcome {
    Continue,
    Pinged,
    Exit(LoopExit),
}

async fn handle_text(
    text: &str,
    namespace: &str,
    listeners: &Listeners,
    ws_sink: &mut WsSink,
) -> FrameOutcome {
    let frame = match EngineFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Realtime: dropping frame: {}", e);
            return FrameOutcome::Continue;
        }
    };

    match frame {
        EngineFrame::Ping => {
            if let Err(e) = ws_sink
                .send(WsMessage::Text(EngineFrame::Pong.encode().into()))
                .await
            {
                warn!("Realtime: failed to send pong: {}", e);
                return FrameOutcome::Exit(LoopExit::Lost);
            }
            FrameOutcome::Pinged
        }
        EngineFrame::Close => FrameOutcome::Exit(LoopExit::Lost),
        EngineFrame::Message(payload) => {
            let packet = match SocketPacket::parse(&payload) {
                Ok(packet) => packet,
                Err(e) => {
                    warn!("Realtime: dropping packet: {}", e);
                    return FrameOutcome::Continue;
                }
            };
            if packet.namespace() != namespace {
                trace!("Realtime: packet for namespace {}", packet.namespace());
                return FrameOutcome::Continue;
            }
            match packet {
                SocketPacket::Event {
                    ack_id, name, args, ..
                } => {
                    let payload = args.into_iter().next().unwrap_or(Value::Null);
                    let delivered = listeners.dispatch(&name, &payload);
                    trace!("Realtime: '{}' delivered to {} listener(s)", name, delivered);
                    if let Some(ack_id) = ack_id {
                        let ack = SocketPacket::Ack {
                            namespace: namespace.to_string(),
                            ack_id,
                            args: Vec::new(),
                        };
                        let _ = ws_sink.send(WsMessage::Text(ack.to_frame().into())).await;
                    }
                    FrameOutcome::Continue
                }
                SocketPacket::Disconnect { .. } => FrameOutcome::Exit(LoopExit::ServerDisconnect),
                SocketPacket::ConnectError { message, .. } => {
                    warn!("Realtime: server error: {}", message);
                    FrameOutcome::Exit(LoopExit::ServerDisconnect)
                }
                SocketPacket::Connect { .. } | SocketPacket::Ack { .. } => FrameOutcome::Continue,
            }
        }
        EngineFrame::Open(_) | EngineFrame::Pong | EngineFrame::Upgrade | EngineFrame::Noop => {
            FrameOutcome::Continue
        }
    }
}

async fn send_event(ws_sink: &mut WsSink, namespace: &str, name: &str, payload: Value) -> Result<()> {
    let frame = SocketPacket::event(namespace, name, payload).to_frame();
    ws_sink
        .send(WsMessage::Text(frame.into()))
        .await
        .map_err(|e| Error::realtime(format!("Failed to send '{name}': {e}")))
}

/// Rejoin every remembered room on a fresh connection.
async fn rejoin_rooms(task: &ChannelTask, ws_sink: &mut WsSink) {
    let rooms = task.rooms.read().unwrap_or_else(|e| e.into_inner()).clone();
    for room in rooms {
        match send_event(
            ws_sink,
            &task.config.namespace,
            JOIN_RESTAURANT_ROOM,
            join_room_payload(&room),
        )
        .await
        {
            Ok(()) => debug!("Realtime: rejoined room {}", room),
            Err(e) => warn!("Realtime: failed to rejoin room {}: {}", room, e),
        }
    }
}

/// Leave the namespace and close the socket, ignoring write errors.
async fn send_close(ws_sink: &mut WsSink, namespace: &str) {
    let leave = SocketPacket::Disconnect {
        namespace: namespace.to_string(),
    };
    let _ = ws_sink.send(WsMessage::Text(leave.to_frame().into())).await;
    let _ = ws_sink.send(WsMessage::Close(None)).await;
    let _ = ws_sink.close().await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
