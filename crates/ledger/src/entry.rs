use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_core::{ComponentId, DomainError, Entity, StockLogId, UserId};

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inward,
    Outward,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inward => "inward",
            Direction::Outward => "outward",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "inward" => Ok(Direction::Inward),
            "outward" => Ok(Direction::Outward),
            other => Err(DomainError::validation(format!(
                "direction must be 'inward' or 'outward', got '{other}'"
            ))),
        }
    }
}

/// An immutable record of stock entering or leaving the system for one
/// component. Never mutated or deleted once persisted; this is the audit
/// trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLogEntry {
    pub id: StockLogId,
    pub component_id: ComponentId,
    pub user_id: UserId,
    pub direction: Direction,
    pub quantity: i64,
    pub reason: String,
    /// Caller-supplied effective time; may be backdated.
    pub effective_at: DateTime<Utc>,
    /// System-assigned creation time, used only as a recency tiebreak.
    pub created_at: DateTime<Utc>,
}

impl Entity for StockLogEntry {
    type Id = StockLogId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Requested movement, before it has been checked against the component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDraft {
    pub component_id: ComponentId,
    pub direction: Direction,
    pub quantity: i64,
    pub reason: String,
    #[serde(default)]
    pub effective_at: Option<DateTime<Utc>>,
}

impl MovementDraft {
    /// Shape validation only; stock sufficiency is checked against the
    /// loaded component by `apply_direction`.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity < 1 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if self.reason.trim().is_empty() {
            return Err(DomainError::validation("reason cannot be empty"));
        }
        Ok(())
    }

    /// Materialize the immutable entry. `effective_at` defaults to `now`.
    pub fn into_entry(self, user_id: UserId, now: DateTime<Utc>) -> StockLogEntry {
        StockLogEntry {
            id: StockLogId::new(),
            component_id: self.component_id,
            user_id,
            direction: self.direction,
            quantity: self.quantity,
            reason: self.reason.trim().to_string(),
            effective_at: self.effective_at.unwrap_or(now),
            created_at: now,
        }
    }
}

/// Compute the on-hand quantity after a movement.
///
/// Outward movements that would overdraw stock are rejected with
/// `InsufficientStock`; no partial application.
pub fn apply_direction(on_hand: i64, direction: Direction, quantity: i64) -> Result<i64, DomainError> {
    match direction {
        Direction::Inward => Ok(on_hand + quantity),
        Direction::Outward => {
            if quantity > on_hand {
                Err(DomainError::insufficient_stock(quantity, on_hand))
            } else {
                Ok(on_hand - quantity)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn draft(direction: Direction, quantity: i64) -> MovementDraft {
        MovementDraft {
            component_id: ComponentId::new(),
            direction,
            quantity,
            reason: "prototype build".to_string(),
            effective_at: None,
        }
    }

    #[test]
    fn draft_rejects_zero_quantity_and_empty_reason() {
        let mut d = draft(Direction::Inward, 0);
        assert!(matches!(d.validate(), Err(DomainError::Validation(_))));

        d.quantity = 3;
        d.reason = "  ".to_string();
        assert!(matches!(d.validate(), Err(DomainError::Validation(_))));

        d.reason = "restock".to_string();
        assert!(d.validate().is_ok());
    }

    #[test]
    fn effective_date_defaults_to_now_and_can_be_backdated() {
        let now = Utc::now();
        let entry = draft(Direction::Inward, 3).into_entry(UserId::new(), now);
        assert_eq!(entry.effective_at, now);
        assert_eq!(entry.created_at, now);

        let backdated = now - chrono::Duration::days(30);
        let mut d = draft(Direction::Inward, 3);
        d.effective_at = Some(backdated);
        let entry = d.into_entry(UserId::new(), now);
        assert_eq!(entry.effective_at, backdated);
        assert_eq!(entry.created_at, now);
    }

    #[test]
    fn outward_cannot_overdraw() {
        assert_eq!(apply_direction(10, Direction::Outward, 6).unwrap(), 4);
        let err = apply_direction(4, Direction::Outward, 10).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 10,
                available: 4
            }
        );
        // Taking exactly the on-hand amount is allowed.
        assert_eq!(apply_direction(4, Direction::Outward, 4).unwrap(), 0);
    }

    proptest! {
        /// Any accepted movement sequence keeps quantity equal to the
        /// running inward-minus-outward sum and never below zero.
        #[test]
        fn accepted_movements_conserve_quantity(
            moves in proptest::collection::vec((any::<bool>(), 1i64..100), 0..64)
        ) {
            let mut on_hand = 0i64;
            let mut inward_total = 0i64;
            let mut outward_total = 0i64;

            for (is_inward, qty) in moves {
                let direction = if is_inward { Direction::Inward } else { Direction::Outward };
                match apply_direction(on_hand, direction, qty) {
                    Ok(next) => {
                        on_hand = next;
                        match direction {
                            Direction::Inward => inward_total += qty,
                            Direction::Outward => outward_total += qty,
                        }
                    }
                    Err(DomainError::InsufficientStock { .. }) => {
                        prop_assert_eq!(direction, Direction::Outward);
                    }
                    Err(e) => return Err(TestCaseError::fail(format!("unexpected error: {e}"))),
                }
                prop_assert!(on_hand >= 0);
                prop_assert_eq!(on_hand, inward_total - outward_total);
            }
        }
    }
}
