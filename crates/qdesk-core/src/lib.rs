//! qdesk Core - Shared contracts for the SQL workbench session manager
//!
//! This crate provides the fundamental types that all other qdesk crates
//! depend on:
//!
//! - `SqlEndpoint` - Trait for the remote SQL execution endpoint
//! - `Notifier` - Side channel for user-visible notifications
//! - `ResultSet`, `TableRef`, `TargetRef` - Data exchanged with the endpoint
//! - `sql` - Builders for the statements the workbench issues

mod endpoint;
mod error;
mod notify;
pub mod sql;
mod types;

pub use endpoint::*;
pub use error::*;
pub use notify::*;
pub use types::*;
