use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::ComponentId;

use crate::entry::{Direction, StockLogEntry};

/// Filter set for movement listing. All filters are conjunctive; the date
/// range applies to the effective time, inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub component_id: Option<ComponentId>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl LogFilter {
    pub fn matches(&self, entry: &StockLogEntry) -> bool {
        if let Some(component_id) = self.component_id {
            if entry.component_id != component_id {
                return false;
            }
        }
        if let Some(direction) = self.direction {
            if entry.direction != direction {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.effective_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.effective_at > to {
                return false;
            }
        }
        true
    }
}

/// Listing order: most recent effective time first. Creation time breaks
/// ties (entries may share a backdated effective time).
pub fn sort_most_recent_first(entries: &mut [StockLogEntry]) {
    entries.sort_by(|a, b| {
        b.effective_at
            .cmp(&a.effective_at)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use labstock_core::UserId;

    fn entry(direction: Direction, days_ago: i64) -> StockLogEntry {
        let now = Utc::now();
        StockLogEntry {
            id: labstock_core::StockLogId::new(),
            component_id: ComponentId::new(),
            user_id: UserId::new(),
            direction,
            quantity: 1,
            reason: "test".to_string(),
            effective_at: now - chrono::Duration::days(days_ago),
            created_at: now,
        }
    }

    #[test]
    fn filters_are_conjunctive() {
        let e = entry(Direction::Outward, 0);

        let f = LogFilter {
            component_id: Some(e.component_id),
            direction: Some(Direction::Outward),
            ..Default::default()
        };
        assert!(f.matches(&e));

        let f = LogFilter {
            component_id: Some(e.component_id),
            direction: Some(Direction::Inward),
            ..Default::default()
        };
        assert!(!f.matches(&e));
    }

    #[test]
    fn date_range_is_inclusive_over_effective_time() {
        let e = entry(Direction::Inward, 5);

        let f = LogFilter {
            from: Some(e.effective_at),
            to: Some(e.effective_at),
            ..Default::default()
        };
        assert!(f.matches(&e));

        let f = LogFilter {
            from: Some(e.effective_at + chrono::Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!f.matches(&e));
    }

    #[test]
    fn sort_orders_by_effective_time_descending() {
        let mut entries = vec![entry(Direction::Inward, 3), entry(Direction::Inward, 1), entry(Direction::Inward, 2)];
        sort_most_recent_first(&mut entries);
        assert!(entries[0].effective_at > entries[1].effective_at);
        assert!(entries[1].effective_at > entries[2].effective_at);
    }
}
