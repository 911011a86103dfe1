//! Realtime channel (Socket.IO over WebSocket)
//!
//! - [`protocol`] - Engine.IO / Socket.IO packet codec
//! - [`listeners`] - event listener table and scoped [`ListenerGuard`]s
//! - [`channel`] - [`RealtimeChannel`], its background task and reconnection

pub mod channel;
pub mod listeners;
pub mod protocol;

pub use channel::{ConnectionState, RealtimeChannel, RealtimeConfig, RealtimeHandle, ReconnectPolicy};
pub use listeners::{Callback, ListenerGuard, Listeners};
pub use protocol::{websocket_url, EngineFrame, OpenHandshake, SocketPacket};
