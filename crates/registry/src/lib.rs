//! `labstock-registry` — component records and their invariants.
//!
//! The registry owns component identity, stock quantity, pricing and
//! thresholds. Quantity itself is only ever changed through the stock
//! ledger; this crate deliberately offers no quantity mutation at all
//! (the movement service owns that write path).

pub mod component;
pub mod filter;

pub use component::{Component, ComponentDraft, ComponentPatch, StockStatus};
pub use filter::{sort_most_recent_first, ComponentFilter};
