//! Repository boundaries, one per entity.
//!
//! The movement service is written against these traits so the atomic
//! quantity update can use whatever primitive the backing store offers
//! (here: a versioned compare-and-swap, see `commit_movement`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use labstock_core::{ComponentId, ExpectedVersion, StockLogId};
use labstock_registry::{Component, ComponentFilter};
use labstock_ledger::{LogFilter, StockLogEntry};

use crate::error::StoreError;

/// How a movement commit treats `last_outwarded_at`.
///
/// `Clear` exists for compensating reversals: rolling back the first
/// outward movement must take the stamp back to "never outwarded".
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutwardStamp {
    Keep,
    Set(DateTime<Utc>),
    Clear,
}

#[async_trait]
pub trait ComponentRepository: Send + Sync {
    /// Insert a new component. The store enforces part-number uniqueness
    /// and returns `Duplicate` on a clash (backstop for check-then-insert
    /// races in the service layer).
    async fn insert(&self, component: Component) -> Result<Component, StoreError>;

    async fn get(&self, id: ComponentId) -> Result<Option<Component>, StoreError>;

    async fn find_by_part_number(&self, part_number: &str) -> Result<Option<Component>, StoreError>;

    /// Persist metadata changes. The incoming `version` must match the
    /// stored one (`StaleVersion` otherwise); the stored version is bumped.
    /// Quantity and `last_outwarded_at` are not written by this method.
    async fn update(&self, component: Component) -> Result<Component, StoreError>;

    /// Returns `false` when the component was already absent.
    async fn delete(&self, id: ComponentId) -> Result<bool, StoreError>;

    /// Filtered listing, most-recently-created first.
    async fn find(&self, filter: &ComponentFilter) -> Result<Vec<Component>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Component>, StoreError>;

    /// The ledger's quantity commit: set the new on-hand quantity (and
    /// apply `stamp` to `last_outwarded_at`) iff the stored version still
    /// matches `expected`. This is the per-component mutual-exclusion
    /// boundary; movements against different components never contend.
    async fn commit_movement(
        &self,
        id: ComponentId,
        expected: ExpectedVersion,
        new_quantity: i64,
        stamp: OutwardStamp,
    ) -> Result<Component, StoreError>;
}

#[async_trait]
pub trait StockLogRepository: Send + Sync {
    /// Append-only: entries are never mutated or deleted.
    async fn append(&self, entry: StockLogEntry) -> Result<StockLogEntry, StoreError>;

    async fn get(&self, id: StockLogId) -> Result<Option<StockLogEntry>, StoreError>;

    /// Filtered listing, most recent effective time first.
    async fn find(&self, filter: &LogFilter) -> Result<Vec<StockLogEntry>, StoreError>;

    async fn list_all(&self) -> Result<Vec<StockLogEntry>, StoreError>;
}
