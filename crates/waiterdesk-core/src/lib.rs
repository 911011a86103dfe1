//! # waiterdesk-core - Core Domain Types
//!
//! Foundation crate for waiterdesk. Provides domain records, realtime event
//! payloads, error handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`CallStatus`] - Waiter call lifecycle (pending, acknowledged, resolved)
//! - [`Dish`], [`DiningTable`], [`User`], [`Restaurant`] - Backend documents
//! - [`Session`] - Persisted token + user profile
//! - `New*` / `*Update` payloads with client-side validation
//!
//! ### Waiter Calls (`waiter_call`)
//! - [`WaiterCallRecord`] - The call as sent on the wire
//! - [`WaiterCall`] - The normalized call held by the call list
//!
//! ### Events (`events`)
//! - [`CallEvent`] - Decoded `new_waiter_call` / `waiter_call_status_updated`
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use waiterdesk_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod prelude;
pub mod types;
pub mod waiter_call;
pub mod wire;

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use events::{
    join_room_payload, CallEvent, StatusUpdate, JOIN_RESTAURANT_ROOM, NEW_WAITER_CALL,
    WAITER_CALL_STATUS_UPDATED,
};
pub use types::{
    require_id, CallStatus, Credentials, DiningTable, Dish, DishUpdate, NewDish, NewTable,
    NewUser, NewWaiterCall, Restaurant, RestaurantUpdate, Session, TableStatus, TableUpdate, User,
    UserRole, UserUpdate,
};
pub use waiter_call::{format_local, WaiterCall, WaiterCallRecord};
