//! `labstock-analytics` — on-demand dashboard aggregation.
//!
//! Pure derivations over registry + ledger state. Every call recomputes
//! from the rows it is given; there is no cache to invalidate. Expected
//! data volumes are a lab inventory, not a warehouse network.

pub mod dashboard;
pub mod monthly;

pub use dashboard::{dashboard_snapshot, ChartSeries, DashboardSnapshot, LowStockRow, StaleStockRow, STALE_WINDOW_MONTHS};
pub use monthly::{chart_series, monthly_totals, DateRange, MonthBucket};
