//! Postgres-backed inventory store.
//!
//! Uniqueness is enforced by the unique index on `part_number`; the
//! movement commit is a single conditional `UPDATE ... WHERE version = $n`,
//! which gives the compare-and-swap row-level atomicity.
//!
//! SQLx errors map to `StoreError` as follows: unique violations (23505)
//! become `Duplicate`, decode failures become `Corrupt`, and everything
//! else is treated as a transient `Connection` failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::instrument;

use labstock_core::{ComponentId, ExpectedVersion, StockLogId};
use labstock_registry::{Component, ComponentFilter};
use labstock_ledger::{Direction, LogFilter, StockLogEntry};

use crate::error::StoreError;
use crate::repository::{ComponentRepository, OutwardStamp, StockLogRepository};

#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS components (
    id UUID PRIMARY KEY,
    part_number TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    location TEXT NOT NULL,
    datasheet_link TEXT,
    quantity BIGINT NOT NULL CHECK (quantity >= 0),
    critical_threshold BIGINT NOT NULL CHECK (critical_threshold >= 0),
    unit_price_minor BIGINT NOT NULL CHECK (unit_price_minor >= 0),
    label_payload TEXT NOT NULL,
    last_outwarded_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    version BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS stock_logs (
    id UUID PRIMARY KEY,
    component_id UUID NOT NULL,
    user_id UUID NOT NULL,
    direction TEXT NOT NULL CHECK (direction IN ('inward', 'outward')),
    quantity BIGINT NOT NULL CHECK (quantity >= 1),
    reason TEXT NOT NULL,
    effective_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stock_logs_component ON stock_logs (component_id, effective_at DESC);
CREATE INDEX IF NOT EXISTS idx_stock_logs_direction ON stock_logs (direction, effective_at DESC);
"#;

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create tables/indexes if absent. Called once at startup.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

fn map_sqlx_error(operation: &'static str, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::Duplicate(db.message().to_string())
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("{operation}: {e}"))
        }
        _ => StoreError::Connection(format!("{operation}: {e}")),
    }
}

fn component_from_row(row: &sqlx::postgres::PgRow) -> Result<Component, StoreError> {
    let corrupt = |e: sqlx::Error| StoreError::Corrupt(format!("components row: {e}"));

    let version: i64 = row.try_get("version").map_err(corrupt)?;

    Ok(Component {
        id: ComponentId::from_uuid(row.try_get("id").map_err(corrupt)?),
        part_number: row.try_get("part_number").map_err(corrupt)?,
        name: row.try_get("name").map_err(corrupt)?,
        category: row.try_get("category").map_err(corrupt)?,
        location: row.try_get("location").map_err(corrupt)?,
        datasheet_link: row.try_get("datasheet_link").map_err(corrupt)?,
        quantity: row.try_get("quantity").map_err(corrupt)?,
        critical_threshold: row.try_get("critical_threshold").map_err(corrupt)?,
        unit_price_minor: row.try_get("unit_price_minor").map_err(corrupt)?,
        label_payload: row.try_get("label_payload").map_err(corrupt)?,
        last_outwarded_at: row.try_get("last_outwarded_at").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
        version: version as u64,
    })
}

fn log_from_row(row: &sqlx::postgres::PgRow) -> Result<StockLogEntry, StoreError> {
    let corrupt = |e: sqlx::Error| StoreError::Corrupt(format!("stock_logs row: {e}"));

    let direction: String = row.try_get("direction").map_err(corrupt)?;
    let direction = Direction::parse(&direction)
        .map_err(|e| StoreError::Corrupt(format!("stock_logs row: {e}")))?;

    Ok(StockLogEntry {
        id: StockLogId::from_uuid(row.try_get("id").map_err(corrupt)?),
        component_id: ComponentId::from_uuid(row.try_get("component_id").map_err(corrupt)?),
        user_id: labstock_core::UserId::from_uuid(row.try_get("user_id").map_err(corrupt)?),
        direction,
        quantity: row.try_get("quantity").map_err(corrupt)?,
        reason: row.try_get("reason").map_err(corrupt)?,
        effective_at: row.try_get("effective_at").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

const COMPONENT_COLUMNS: &str = r#"
    id, part_number, name, category, location, datasheet_link,
    quantity, critical_threshold, unit_price_minor, label_payload,
    last_outwarded_at, created_at, updated_at, version
"#;

#[async_trait]
impl ComponentRepository for PostgresInventoryStore {
    #[instrument(skip(self, component), fields(id = %component.id), err)]
    async fn insert(&self, component: Component) -> Result<Component, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO components (
                id, part_number, name, category, location, datasheet_link,
                quantity, critical_threshold, unit_price_minor, label_payload,
                last_outwarded_at, created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(component.id.as_uuid())
        .bind(&component.part_number)
        .bind(&component.name)
        .bind(&component.category)
        .bind(&component.location)
        .bind(&component.datasheet_link)
        .bind(component.quantity)
        .bind(component.critical_threshold)
        .bind(component.unit_price_minor)
        .bind(&component.label_payload)
        .bind(component.last_outwarded_at)
        .bind(component.created_at)
        .bind(component.updated_at)
        .bind(component.version as i64)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_component", e))?;

        Ok(component)
    }

    async fn get(&self, id: ComponentId) -> Result<Option<Component>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {COMPONENT_COLUMNS} FROM components WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_component", e))?;

        row.as_ref().map(component_from_row).transpose()
    }

    async fn find_by_part_number(&self, part_number: &str) -> Result<Option<Component>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {COMPONENT_COLUMNS} FROM components WHERE part_number = $1"
        ))
        .bind(part_number)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_part_number", e))?;

        row.as_ref().map(component_from_row).transpose()
    }

    #[instrument(skip(self, component), fields(id = %component.id), err)]
    async fn update(&self, component: Component) -> Result<Component, StoreError> {
        // Quantity and last_outwarded_at stay ledger-owned: not in this SET.
        let row = sqlx::query(&format!(
            r#"
            UPDATE components SET
                part_number = $2,
                name = $3,
                category = $4,
                location = $5,
                datasheet_link = $6,
                critical_threshold = $7,
                unit_price_minor = $8,
                label_payload = $9,
                updated_at = $10,
                version = version + 1
            WHERE id = $1 AND version = $11
            RETURNING {COMPONENT_COLUMNS}
            "#
        ))
        .bind(component.id.as_uuid())
        .bind(&component.part_number)
        .bind(&component.name)
        .bind(&component.category)
        .bind(&component.location)
        .bind(&component.datasheet_link)
        .bind(component.critical_threshold)
        .bind(component.unit_price_minor)
        .bind(&component.label_payload)
        .bind(component.updated_at)
        .bind(component.version as i64)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_component", e))?;

        match row {
            Some(row) => component_from_row(&row),
            None => {
                if ComponentRepository::get(self, component.id).await?.is_some() {
                    Err(StoreError::StaleVersion(component.id.to_string()))
                } else {
                    Err(StoreError::NotFound)
                }
            }
        }
    }

    async fn delete(&self, id: ComponentId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM components WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_component", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, filter: &ComponentFilter) -> Result<Vec<Component>, StoreError> {
        // Optional-filter pattern: NULL parameters disable their clause.
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COMPONENT_COLUMNS}
            FROM components
            WHERE ($1::text IS NULL OR category ILIKE '%' || $1 || '%')
                AND ($2::text IS NULL OR part_number ILIKE '%' || $2 || '%')
                AND ($3::text IS NULL OR location ILIKE '%' || $3 || '%')
                AND ($4::bigint IS NULL OR quantity <= $4)
                AND ($5::text IS NULL
                    OR name ILIKE '%' || $5 || '%'
                    OR part_number ILIKE '%' || $5 || '%'
                    OR category ILIKE '%' || $5 || '%')
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.category.as_deref())
        .bind(filter.part_number.as_deref())
        .bind(filter.location.as_deref())
        .bind(filter.max_quantity)
        .bind(filter.search.as_deref())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_components", e))?;

        rows.iter().map(component_from_row).collect()
    }

    async fn list_all(&self) -> Result<Vec<Component>, StoreError> {
        ComponentRepository::find(self, &ComponentFilter::default()).await
    }

    #[instrument(skip(self), fields(id = %id), err)]
    async fn commit_movement(
        &self,
        id: ComponentId,
        expected: ExpectedVersion,
        new_quantity: i64,
        stamp: OutwardStamp,
    ) -> Result<Component, StoreError> {
        let expected_version: Option<i64> = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(v as i64),
        };
        let (apply_stamp, stamp_value): (bool, Option<DateTime<Utc>>) = match stamp {
            OutwardStamp::Keep => (false, None),
            OutwardStamp::Set(at) => (true, Some(at)),
            OutwardStamp::Clear => (true, None),
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE components SET
                quantity = $2,
                last_outwarded_at = CASE WHEN $3 THEN $4 ELSE last_outwarded_at END,
                updated_at = $5,
                version = version + 1
            WHERE id = $1 AND ($6::bigint IS NULL OR version = $6)
            RETURNING {COMPONENT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(new_quantity)
        .bind(apply_stamp)
        .bind(stamp_value)
        .bind(Utc::now())
        .bind(expected_version)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("commit_movement", e))?;

        match row {
            Some(row) => component_from_row(&row),
            None => {
                if ComponentRepository::get(self, id).await?.is_some() {
                    Err(StoreError::StaleVersion(id.to_string()))
                } else {
                    Err(StoreError::NotFound)
                }
            }
        }
    }
}

const LOG_COLUMNS: &str =
    "id, component_id, user_id, direction, quantity, reason, effective_at, created_at";

#[async_trait]
impl StockLogRepository for PostgresInventoryStore {
    #[instrument(skip(self, entry), fields(id = %entry.id), err)]
    async fn append(&self, entry: StockLogEntry) -> Result<StockLogEntry, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO stock_logs (id, component_id, user_id, direction, quantity, reason, effective_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.component_id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(entry.direction.as_str())
        .bind(entry.quantity)
        .bind(&entry.reason)
        .bind(entry.effective_at)
        .bind(entry.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_log", e))?;

        Ok(entry)
    }

    async fn get(&self, id: StockLogId) -> Result<Option<StockLogEntry>, StoreError> {
        let row = sqlx::query(&format!("SELECT {LOG_COLUMNS} FROM stock_logs WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_log", e))?;

        row.as_ref().map(log_from_row).transpose()
    }

    async fn find(&self, filter: &LogFilter) -> Result<Vec<StockLogEntry>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM stock_logs
            WHERE ($1::uuid IS NULL OR component_id = $1)
                AND ($2::text IS NULL OR direction = $2)
                AND ($3::timestamptz IS NULL OR effective_at >= $3)
                AND ($4::timestamptz IS NULL OR effective_at <= $4)
            ORDER BY effective_at DESC, created_at DESC
            "#
        ))
        .bind(filter.component_id.map(|id| *id.as_uuid()))
        .bind(filter.direction.map(|d| d.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_logs", e))?;

        rows.iter().map(log_from_row).collect()
    }

    async fn list_all(&self) -> Result<Vec<StockLogEntry>, StoreError> {
        StockLogRepository::find(self, &LogFilter::default()).await
    }
}
