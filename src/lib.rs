//! waiterdesk library
//!
//! Command-line front end over the waiterdesk crates: argument parsing,
//! one-shot commands and the headless NDJSON watch mode.

pub mod cli;
pub mod headless;

pub use cli::{run, Args};
pub use headless::{run_headless, HeadlessEvent};
