use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use labstock_core::{ComponentId, ExpectedVersion, StockLogId};
use labstock_registry::{sort_most_recent_first, Component, ComponentFilter};
use labstock_ledger::{LogFilter, StockLogEntry};

use crate::error::StoreError;
use crate::repository::{ComponentRepository, OutwardStamp, StockLogRepository};

/// In-memory store backing both repositories.
///
/// Intended for tests/dev. `commit_movement` performs its version check and
/// write under one write-lock window, so the compare-and-swap is atomic.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    components: RwLock<HashMap<ComponentId, Component>>,
    logs: RwLock<Vec<StockLogEntry>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Connection("lock poisoned".to_string())
}

#[async_trait]
impl ComponentRepository for InMemoryInventoryStore {
    async fn insert(&self, component: Component) -> Result<Component, StoreError> {
        let mut map = self.components.write().map_err(|_| poisoned())?;

        if map.values().any(|c| c.part_number == component.part_number) {
            return Err(StoreError::Duplicate(component.part_number));
        }

        map.insert(component.id, component.clone());
        Ok(component)
    }

    async fn get(&self, id: ComponentId) -> Result<Option<Component>, StoreError> {
        let map = self.components.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn find_by_part_number(&self, part_number: &str) -> Result<Option<Component>, StoreError> {
        let map = self.components.read().map_err(|_| poisoned())?;
        Ok(map.values().find(|c| c.part_number == part_number).cloned())
    }

    async fn update(&self, component: Component) -> Result<Component, StoreError> {
        let mut map = self.components.write().map_err(|_| poisoned())?;

        let stored = map.get(&component.id).ok_or(StoreError::NotFound)?;
        if stored.version != component.version {
            return Err(StoreError::StaleVersion(component.id.to_string()));
        }
        if map
            .values()
            .any(|c| c.id != component.id && c.part_number == component.part_number)
        {
            return Err(StoreError::Duplicate(component.part_number));
        }

        // Quantity fields stay ledger-owned even if the caller's copy drifted.
        let mut next = component;
        let stored = &map[&next.id];
        next.quantity = stored.quantity;
        next.last_outwarded_at = stored.last_outwarded_at;
        next.version += 1;

        map.insert(next.id, next.clone());
        Ok(next)
    }

    async fn delete(&self, id: ComponentId) -> Result<bool, StoreError> {
        let mut map = self.components.write().map_err(|_| poisoned())?;
        Ok(map.remove(&id).is_some())
    }

    async fn find(&self, filter: &ComponentFilter) -> Result<Vec<Component>, StoreError> {
        let map = self.components.read().map_err(|_| poisoned())?;
        let mut matched: Vec<Component> = map.values().filter(|c| filter.matches(c)).cloned().collect();
        drop(map);

        sort_most_recent_first(&mut matched);
        Ok(matched)
    }

    async fn list_all(&self) -> Result<Vec<Component>, StoreError> {
        ComponentRepository::find(self, &ComponentFilter::default()).await
    }

    async fn commit_movement(
        &self,
        id: ComponentId,
        expected: ExpectedVersion,
        new_quantity: i64,
        stamp: OutwardStamp,
    ) -> Result<Component, StoreError> {
        if new_quantity < 0 {
            return Err(StoreError::Corrupt(format!(
                "refusing to store negative quantity {new_quantity} for {id}"
            )));
        }

        let mut map = self.components.write().map_err(|_| poisoned())?;
        let stored = map.get_mut(&id).ok_or(StoreError::NotFound)?;

        if !expected.matches(stored.version) {
            return Err(StoreError::StaleVersion(id.to_string()));
        }

        stored.quantity = new_quantity;
        match stamp {
            OutwardStamp::Keep => {}
            OutwardStamp::Set(at) => stored.last_outwarded_at = Some(at),
            OutwardStamp::Clear => stored.last_outwarded_at = None,
        }
        stored.updated_at = Utc::now();
        stored.version += 1;

        Ok(stored.clone())
    }
}

#[async_trait]
impl StockLogRepository for InMemoryInventoryStore {
    async fn append(&self, entry: StockLogEntry) -> Result<StockLogEntry, StoreError> {
        let mut logs = self.logs.write().map_err(|_| poisoned())?;
        logs.push(entry.clone());
        Ok(entry)
    }

    async fn get(&self, id: StockLogId) -> Result<Option<StockLogEntry>, StoreError> {
        let logs = self.logs.read().map_err(|_| poisoned())?;
        Ok(logs.iter().find(|e| e.id == id).cloned())
    }

    async fn find(&self, filter: &LogFilter) -> Result<Vec<StockLogEntry>, StoreError> {
        let logs = self.logs.read().map_err(|_| poisoned())?;
        let mut matched: Vec<StockLogEntry> = logs.iter().filter(|e| filter.matches(e)).cloned().collect();
        drop(logs);

        labstock_ledger::sort_most_recent_first(&mut matched);
        Ok(matched)
    }

    async fn list_all(&self) -> Result<Vec<StockLogEntry>, StoreError> {
        StockLogRepository::find(self, &LogFilter::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labstock_registry::ComponentDraft;

    fn component(part_number: &str, quantity: i64) -> Component {
        Component::create(
            ComponentDraft {
                name: part_number.to_string(),
                part_number: part_number.to_string(),
                category: "misc".to_string(),
                location: "bin".to_string(),
                datasheet_link: None,
                quantity: Some(quantity),
                unit_price_minor: None,
                critical_threshold: None,
            },
            String::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn insert_enforces_part_number_uniqueness() {
        let store = InMemoryInventoryStore::new();
        store.insert(component("R-100", 1)).await.unwrap();

        let err = store.insert(component("R-100", 1)).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate("R-100".to_string()));
    }

    #[tokio::test]
    async fn commit_movement_is_a_versioned_cas() {
        let store = InMemoryInventoryStore::new();
        let c = store.insert(component("R-100", 10)).await.unwrap();

        let updated = store
            .commit_movement(
                c.id,
                ExpectedVersion::Exact(c.version),
                4,
                OutwardStamp::Set(Utc::now()),
            )
            .await
            .unwrap();
        assert_eq!(updated.quantity, 4);
        assert_eq!(updated.version, c.version + 1);
        assert!(updated.last_outwarded_at.is_some());

        // Replaying with the old version loses the swap.
        let err = store
            .commit_movement(c.id, ExpectedVersion::Exact(c.version), 0, OutwardStamp::Keep)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StaleVersion(_)));

        // Keep leaves the stamp alone; Clear takes it back to never-outwarded.
        let kept = store
            .commit_movement(c.id, ExpectedVersion::Exact(updated.version), 6, OutwardStamp::Keep)
            .await
            .unwrap();
        assert_eq!(kept.last_outwarded_at, updated.last_outwarded_at);
        let cleared = store
            .commit_movement(c.id, ExpectedVersion::Exact(kept.version), 6, OutwardStamp::Clear)
            .await
            .unwrap();
        assert!(cleared.last_outwarded_at.is_none());
    }

    #[tokio::test]
    async fn both_repositories_list_through_one_store() {
        let store = InMemoryInventoryStore::new();
        let c = store.insert(component("R-100", 3)).await.unwrap();
        StockLogRepository::append(
            &store,
            labstock_ledger::MovementDraft {
                component_id: c.id,
                direction: labstock_ledger::Direction::Inward,
                quantity: 3,
                reason: "initial stock".to_string(),
                effective_at: None,
            }
            .into_entry(labstock_core::UserId::new(), Utc::now()),
        )
        .await
        .unwrap();

        let components = ComponentRepository::list_all(&store).await.unwrap();
        assert_eq!(components.len(), 1);
        let logs = StockLogRepository::list_all(&store).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn update_does_not_touch_ledger_owned_fields() {
        let store = InMemoryInventoryStore::new();
        let c = store.insert(component("R-100", 10)).await.unwrap();

        let mut edited = c.clone();
        edited.name = "renamed".to_string();
        edited.quantity = 999; // must be ignored
        let updated = store.update(edited).await.unwrap();

        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.quantity, 10);
        assert_eq!(updated.version, c.version + 1);
    }
}
