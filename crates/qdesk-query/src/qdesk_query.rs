//! qdesk Query - Query execution tracking
//!
//! Every statement the workbench runs lands in one of three result slots:
//! table preview, table description, or the ad-hoc query pane. This crate
//! tracks their loading state and payloads and decides which of several
//! overlapping responses a slot ends up showing.

mod mode;
mod slot;
mod tracker;

pub use mode::QueryMode;
pub use slot::{SlotKind, SlotOrdering, SlotSnapshot};
pub use tracker::{QueryTracker, SlotUpdate};
