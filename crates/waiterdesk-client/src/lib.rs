//! # waiterdesk-client - Backend Access
//!
//! Everything that talks to the restaurant backend: the REST transport, the
//! persisted session, the Socket.IO realtime channel and the per-resource
//! domain services.
//!
//! Depends on [`waiterdesk_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Transport (`http`)
//! - [`ApiClient`] - Bearer-token injection, 401 session clearing, envelope unwrapping
//! - [`HttpBackend`] - Async seam over the HTTP engine; [`ReqwestBackend`] in production
//!
//! ### Session (`session`)
//! - [`SessionStore`] - Token + user persisted under fixed keys
//! - [`FileKeyValueStore`], [`MemoryKeyValueStore`] - Backing stores
//!
//! ### Realtime (`realtime`)
//! - [`RealtimeChannel`] - Owned connection with `on`/`off`/`emit` and room replay
//! - [`ListenerGuard`] - Scoped listener registration
//!
//! ### Services (`services`)
//! - [`AuthService`], [`RestaurantService`], [`DishService`], [`TableService`],
//!   [`UserService`], [`WaiterCallService`]

pub mod http;
pub mod realtime;
pub mod services;
pub mod session;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use http::{ApiClient, HttpBackend, HttpRequest, HttpResponse, Method, ReqwestBackend};
pub use realtime::{
    ConnectionState, ListenerGuard, RealtimeChannel, RealtimeConfig, RealtimeHandle,
    ReconnectPolicy,
};
pub use services::{
    AuthService, DishService, RestaurantService, TableService, UserService, WaiterCallApi,
    WaiterCallService,
};
pub use session::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, SessionStore};
