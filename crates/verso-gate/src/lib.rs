//! Access gate for site history.
//!
//! Every history operation passes through [`AccessGate::authorize`] before it
//! touches a ledger or the blob store. Capability flags are resolved once per
//! request into an [`AccessContext`] and passed down explicitly.

pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod operation;

pub use config::GateConfig;
pub use context::AccessContext;
pub use error::GateError;
pub use gate::AccessGate;
pub use operation::{AccessLevel, Operation};
