//! `labstock-ledger` — immutable stock movement records.
//!
//! A `StockLogEntry` has exactly one state transition, absent → persisted.
//! The decision logic here is pure; the transactional tie between a log
//! entry and the owning component's quantity lives in the infra movement
//! service.

pub mod entry;
pub mod filter;

pub use entry::{apply_direction, Direction, MovementDraft, StockLogEntry};
pub use filter::{sort_most_recent_first, LogFilter};
