use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use labstock_ledger::{Direction, StockLogEntry};

/// Optional effective-date range, inclusive on both ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if let Some(from) = self.from {
            if at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if at > to {
                return false;
            }
        }
        true
    }
}

/// One (year, month) bucket with separate inward/outward totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    /// Display label, e.g. "Aug 2026".
    pub label: String,
    pub inward: i64,
    pub outward: i64,
}

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn month_label(year: i32, month: u32) -> String {
    // month is 1-based and bounded by chrono's Datelike.
    format!("{} {}", MONTH_NAMES[(month - 1) as usize], year)
}

/// Group movements by (year, month) of their effective time, summing
/// quantities per direction. Produces one bucket per observed month,
/// chronologically ascending, with the absent direction defaulting to 0.
pub fn monthly_totals(logs: &[StockLogEntry], range: DateRange) -> Vec<MonthBucket> {
    let mut buckets: BTreeMap<(i32, u32), (i64, i64)> = BTreeMap::new();

    for entry in logs {
        if !range.contains(entry.effective_at) {
            continue;
        }
        let key = (entry.effective_at.year(), entry.effective_at.month());
        let slot = buckets.entry(key).or_insert((0, 0));
        match entry.direction {
            Direction::Inward => slot.0 += entry.quantity,
            Direction::Outward => slot.1 += entry.quantity,
        }
    }

    buckets
        .into_iter()
        .map(|((year, month), (inward, outward))| MonthBucket {
            year,
            month,
            label: month_label(year, month),
            inward,
            outward,
        })
        .collect()
}

/// Chart-friendly projection of monthly buckets: one label per bucket plus
/// parallel inward/outward arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub inward: Vec<i64>,
    pub outward: Vec<i64>,
}

pub fn chart_series(buckets: &[MonthBucket]) -> ChartSeries {
    ChartSeries {
        labels: buckets.iter().map(|b| b.label.clone()).collect(),
        inward: buckets.iter().map(|b| b.inward).collect(),
        outward: buckets.iter().map(|b| b.outward).collect(),
    }
}
