//! HTTP API module.
//!
//! This module provides the HTTP server, response types, and the activity
//! event stream for the RxFlow site and dashboard.

pub mod events;
pub mod server;
pub mod types;

pub use events::*;
pub use server::start_server;
pub use types::*;
