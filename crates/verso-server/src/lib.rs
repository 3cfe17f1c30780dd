//! HTTP server for verso.
//!
//! Exposes site saves and the version history operations over a small JSON
//! and HTML API. Capability flags come from the server's gate configuration;
//! callers may name themselves with the `x-verso-caller` header for logs.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::VersoServer;
pub use state::AppState;
