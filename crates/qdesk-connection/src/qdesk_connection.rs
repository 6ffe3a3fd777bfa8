//! qdesk Connection - Connection lifecycle and durable session state
//!
//! This crate owns the active connection: which target is active, the
//! target → connection id mapping, and writing both through to a
//! `SessionStore` so they survive a reload.

mod manager;
mod storage;
mod targets;

pub use manager::{ActiveConnection, ConnectionManager};
pub use storage::{FileSessionStore, MemorySessionStore, PersistedSession, SessionStore};
pub use targets::TargetCatalog;
