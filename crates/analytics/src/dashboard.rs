use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use labstock_registry::Component;
use labstock_ledger::StockLogEntry;

use crate::monthly::{monthly_totals, DateRange, MonthBucket};

pub use crate::monthly::ChartSeries;

/// Trailing window after which stock with no outward movement counts as stale.
pub const STALE_WINDOW_MONTHS: u32 = 3;

/// Selected fields of a low-stock component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockRow {
    pub id: labstock_core::ComponentId,
    pub name: String,
    pub part_number: String,
    pub quantity: i64,
    pub critical_threshold: i64,
    pub location: String,
}

/// Selected fields of a stale-stock component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleStockRow {
    pub id: labstock_core::ComponentId,
    pub name: String,
    pub part_number: String,
    pub quantity: i64,
    pub last_outwarded_at: Option<DateTime<Utc>>,
    pub location: String,
}

/// One dashboard snapshot, recomputed per call from current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub monthly: Vec<MonthBucket>,
    pub low_stock: Vec<LowStockRow>,
    pub stale_stock: Vec<StaleStockRow>,
    pub total_components: usize,
    /// Σ(quantity × unit price) in minor units, exact.
    pub total_value_minor: i128,
}

fn low_stock_row(c: &Component) -> LowStockRow {
    LowStockRow {
        id: c.id,
        name: c.name.clone(),
        part_number: c.part_number.clone(),
        quantity: c.quantity,
        critical_threshold: c.critical_threshold,
        location: c.location.clone(),
    }
}

fn stale_stock_row(c: &Component) -> StaleStockRow {
    StaleStockRow {
        id: c.id,
        name: c.name.clone(),
        part_number: c.part_number.clone(),
        quantity: c.quantity,
        last_outwarded_at: c.last_outwarded_at,
        location: c.location.clone(),
    }
}

/// Derive the full dashboard view from registry + ledger state.
///
/// `range` scopes only the monthly series; low/stale/value are always
/// computed over the whole registry, matching the dashboard semantics.
pub fn dashboard_snapshot(
    components: &[Component],
    logs: &[StockLogEntry],
    range: DateRange,
    now: DateTime<Utc>,
) -> DashboardSnapshot {
    let stale_cutoff = now
        .checked_sub_months(Months::new(STALE_WINDOW_MONTHS))
        .unwrap_or(now);

    DashboardSnapshot {
        monthly: monthly_totals(logs, range),
        low_stock: components
            .iter()
            .filter(|c| c.status() == labstock_registry::StockStatus::Low)
            .map(low_stock_row)
            .collect(),
        stale_stock: components
            .iter()
            .filter(|c| c.is_stale(stale_cutoff))
            .map(stale_stock_row)
            .collect(),
        total_components: components.len(),
        total_value_minor: components.iter().map(Component::total_value_minor).sum(),
    }
}
