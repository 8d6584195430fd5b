use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{ComponentId, DomainError, Entity};

/// Derived stock status of a component.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Ok,
    Low,
}

/// A trackable inventory item with a unique part number and current quantity.
///
/// `quantity` and `last_outwarded_at` are ledger-owned: the only mutation
/// path for them is the movement service. `version` is the optimistic
/// concurrency token bumped by the store on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub part_number: String,
    pub name: String,
    pub category: String,
    pub location: String,
    pub datasheet_link: Option<String>,
    pub quantity: i64,
    pub critical_threshold: i64,
    /// Price per unit in the currency's minor unit (e.g. cents).
    pub unit_price_minor: i64,
    /// Opaque payload produced by the label/code generator collaborator.
    /// Stored and returned unchanged.
    pub label_payload: String,
    pub last_outwarded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Entity for Component {
    type Id = ComponentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating a component. Omitted numeric fields default to
/// quantity 0, unit price 0, critical threshold 5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDraft {
    pub name: String,
    pub part_number: String,
    pub category: String,
    pub location: String,
    #[serde(default)]
    pub datasheet_link: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit_price_minor: Option<i64>,
    #[serde(default)]
    pub critical_threshold: Option<i64>,
}

/// Partial update for a component. Merge semantics: absent fields are kept.
///
/// There is intentionally no `quantity` field here; quantity changes flow
/// only through the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub datasheet_link: Option<String>,
    #[serde(default)]
    pub unit_price_minor: Option<i64>,
    #[serde(default)]
    pub critical_threshold: Option<i64>,
}

const DEFAULT_CRITICAL_THRESHOLD: i64 = 5;

fn required(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn non_negative(field: &'static str, value: i64) -> Result<i64, DomainError> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(value)
}

impl Component {
    /// Validate a draft and materialize a component.
    ///
    /// The caller (registry service) is responsible for part-number
    /// uniqueness and for producing `label_payload`.
    pub fn create(
        draft: ComponentDraft,
        label_payload: String,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id: ComponentId::new(),
            name: required("name", &draft.name)?,
            part_number: required("part_number", &draft.part_number)?,
            category: required("category", &draft.category)?,
            location: required("location", &draft.location)?,
            datasheet_link: draft.datasheet_link.map(|l| l.trim().to_string()),
            quantity: non_negative("quantity", draft.quantity.unwrap_or(0))?,
            critical_threshold: non_negative(
                "critical_threshold",
                draft.critical_threshold.unwrap_or(DEFAULT_CRITICAL_THRESHOLD),
            )?,
            unit_price_minor: non_negative("unit_price_minor", draft.unit_price_minor.unwrap_or(0))?,
            label_payload,
            last_outwarded_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Merge a patch into this component.
    ///
    /// Returns `true` when the label inputs (part number or location)
    /// changed, signalling the caller to regenerate `label_payload`.
    pub fn apply_patch(&mut self, patch: ComponentPatch, now: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut label_dirty = false;

        if let Some(name) = patch.name {
            self.name = required("name", &name)?;
        }
        if let Some(part_number) = patch.part_number {
            let part_number = required("part_number", &part_number)?;
            if part_number != self.part_number {
                label_dirty = true;
            }
            self.part_number = part_number;
        }
        if let Some(category) = patch.category {
            self.category = required("category", &category)?;
        }
        if let Some(location) = patch.location {
            let location = required("location", &location)?;
            if location != self.location {
                label_dirty = true;
            }
            self.location = location;
        }
        if let Some(link) = patch.datasheet_link {
            self.datasheet_link = Some(link.trim().to_string());
        }
        if let Some(price) = patch.unit_price_minor {
            self.unit_price_minor = non_negative("unit_price_minor", price)?;
        }
        if let Some(threshold) = patch.critical_threshold {
            self.critical_threshold = non_negative("critical_threshold", threshold)?;
        }

        self.updated_at = now;
        Ok(label_dirty)
    }

    /// `Low` iff quantity is at or below the critical threshold.
    pub fn status(&self) -> StockStatus {
        if self.quantity <= self.critical_threshold {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }

    /// Stale stock: no outward movement since `cutoff` (or ever).
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        match self.last_outwarded_at {
            Some(at) => at < cutoff,
            None => true,
        }
    }

    /// Total on-hand value in minor units. Widened to `i128` so dashboard
    /// sums stay exact.
    pub fn total_value_minor(&self) -> i128 {
        self.quantity as i128 * self.unit_price_minor as i128
    }
}
