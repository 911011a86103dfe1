//! waiterdesk-app - Configuration and call-list state for waiterdesk
//!
//! This crate loads settings, wires the backend services together and keeps
//! the per-restaurant waiter-call list consistent with the server.

pub mod call_list;
pub mod call_sync;
pub mod config;
pub mod context;

// Re-export primary types
pub use call_list::CallList;
pub use call_sync::CallSync;
pub use config::{Environment, Settings};
pub use context::AppContext;
