use serde::{Deserialize, Serialize};

use crate::component::Component;

/// Filter set for component listing.
///
/// Text filters are case-insensitive substring matches; `search` matches
/// across name, part number and category. All filters are conjunctive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Only components with quantity at or below this value.
    #[serde(default)]
    pub max_quantity: Option<i64>,
    #[serde(default)]
    pub search: Option<String>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl ComponentFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, component: &Component) -> bool {
        if let Some(category) = &self.category {
            if !contains_ci(&component.category, category) {
                return false;
            }
        }
        if let Some(part_number) = &self.part_number {
            if !contains_ci(&component.part_number, part_number) {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !contains_ci(&component.location, location) {
                return false;
            }
        }
        if let Some(max) = self.max_quantity {
            if component.quantity > max {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !contains_ci(&component.name, search)
                && !contains_ci(&component.part_number, search)
                && !contains_ci(&component.category, search)
            {
                return false;
            }
        }
        true
    }
}

/// Listing order: most-recently-created first. Ids are time-ordered
/// (UUIDv7), used as a stable tiebreak for equal timestamps.
pub fn sort_most_recent_first(components: &mut [Component]) {
    components.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
    });
}
