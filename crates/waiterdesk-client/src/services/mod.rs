//! Domain services
//!
//! One struct per backend resource. Every operation validates its input,
//! issues exactly one request through [`ApiClient`](crate::http::ApiClient)
//! and returns the decoded payload. Failures are logged with context and
//! returned unchanged.

pub mod auth;
pub mod dishes;
pub mod restaurant;
pub mod tables;
pub mod users;
pub mod waiter_calls;

pub use auth::AuthService;
pub use dishes::DishService;
pub use restaurant::RestaurantService;
pub use tables::TableService;
pub use users::UserService;
pub use waiter_calls::{LocalWaiterCallApi, WaiterCallApi, WaiterCallService};
