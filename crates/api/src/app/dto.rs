use std::str::FromStr;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use labstock_analytics::DateRange;
use labstock_core::ComponentId;
use labstock_ledger::{Direction, LogFilter, MovementDraft, StockLogEntry};
use labstock_registry::{Component, ComponentFilter, StockStatus};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// Query string for `GET /components`. All filters optional; text filters
/// are case-insensitive substring matches.
#[derive(Debug, Default, Deserialize)]
pub struct ComponentQuery {
    pub category: Option<String>,
    pub part_number: Option<String>,
    pub location: Option<String>,
    pub max_quantity: Option<i64>,
    pub search: Option<String>,
}

impl ComponentQuery {
    pub fn into_filter(self) -> ComponentFilter {
        ComponentFilter {
            category: self.category,
            part_number: self.part_number,
            location: self.location,
            max_quantity: self.max_quantity,
            search: self.search,
        }
    }
}

/// Query string for `GET /stocklogs`.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub component_id: Option<String>,
    pub direction: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl LogQuery {
    pub fn into_filter(self) -> Result<LogFilter, axum::response::Response> {
        let component_id = match self.component_id {
            Some(raw) => Some(parse_component_id(&raw)?),
            None => None,
        };
        let direction = match self.direction {
            Some(raw) => Some(Direction::parse(&raw).map_err(|e| {
                errors::json_error(StatusCode::BAD_REQUEST, "invalid_direction", e.to_string())
            })?),
            None => None,
        };

        Ok(LogFilter {
            component_id,
            direction,
            from: self.from,
            to: self.to,
        })
    }
}

/// Optional effective-date range for the dashboard endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl RangeQuery {
    pub fn into_range(self) -> DateRange {
        DateRange {
            from: self.from,
            to: self.to,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordMovementRequest {
    pub component_id: String,
    pub direction: String,
    pub quantity: i64,
    pub reason: String,
    #[serde(default)]
    pub effective_at: Option<DateTime<Utc>>,
}

impl RecordMovementRequest {
    pub fn into_draft(self) -> Result<MovementDraft, axum::response::Response> {
        Ok(MovementDraft {
            component_id: parse_component_id(&self.component_id)?,
            direction: Direction::parse(&self.direction).map_err(|e| {
                errors::json_error(StatusCode::BAD_REQUEST, "invalid_direction", e.to_string())
            })?,
            quantity: self.quantity,
            reason: self.reason,
            effective_at: self.effective_at,
        })
    }
}

pub fn parse_component_id(raw: &str) -> Result<ComponentId, axum::response::Response> {
    ComponentId::from_str(raw)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn component_to_json(c: &Component) -> serde_json::Value {
    serde_json::json!({
        "id": c.id.to_string(),
        "part_number": c.part_number,
        "name": c.name,
        "category": c.category,
        "location": c.location,
        "datasheet_link": c.datasheet_link,
        "quantity": c.quantity,
        "critical_threshold": c.critical_threshold,
        "unit_price_minor": c.unit_price_minor,
        "label_payload": c.label_payload,
        "status": match c.status() {
            StockStatus::Ok => "ok",
            StockStatus::Low => "low",
        },
        "last_outwarded_at": c.last_outwarded_at,
        "created_at": c.created_at,
        "updated_at": c.updated_at,
    })
}

pub fn log_to_json(e: &StockLogEntry) -> serde_json::Value {
    serde_json::json!({
        "id": e.id.to_string(),
        "component_id": e.component_id.to_string(),
        "user_id": e.user_id.to_string(),
        "direction": e.direction.as_str(),
        "quantity": e.quantity,
        "reason": e.reason,
        "effective_at": e.effective_at,
        "created_at": e.created_at,
    })
}
