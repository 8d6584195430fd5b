//! Component lifecycle service.
//!
//! Owns create/update/delete plus the read paths the dashboard needs.
//! Quantity is never written here; see `MovementService`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use labstock_core::{ComponentId, DomainError};
use labstock_registry::{Component, ComponentDraft, ComponentFilter, ComponentPatch};

use crate::error::{ServiceError, StoreError};
use crate::label::{LabelEncoder, LabelRequest};
use crate::repository::ComponentRepository;

const MAX_UPDATE_RETRIES: u32 = 5;

pub struct RegistryService {
    components: Arc<dyn ComponentRepository>,
    labels: Arc<dyn LabelEncoder>,
}

impl RegistryService {
    pub fn new(components: Arc<dyn ComponentRepository>, labels: Arc<dyn LabelEncoder>) -> Self {
        Self { components, labels }
    }

    fn label_for(&self, component: &Component) -> String {
        self.labels.encode(LabelRequest {
            part_number: &component.part_number,
            name: &component.name,
            location: &component.location,
        })
    }

    #[instrument(skip(self, draft), fields(part_number = %draft.part_number), err)]
    pub async fn create(&self, draft: ComponentDraft) -> Result<Component, ServiceError> {
        let now = Utc::now();
        let mut component = Component::create(draft, String::new(), now)?;

        // Friendly pre-check; the store's unique constraint is the backstop.
        if self
            .components
            .find_by_part_number(&component.part_number)
            .await?
            .is_some()
        {
            return Err(DomainError::duplicate_key(component.part_number).into());
        }

        component.label_payload = self.label_for(&component);
        let component = self.components.insert(component).await?;
        info!(id = %component.id, "component created");
        Ok(component)
    }

    /// Merge a patch into the stored component.
    ///
    /// Concurrent movements bump the component's version, so the
    /// read-patch-write is retried on a lost version race rather than
    /// surfacing an error for an unrelated stock commit.
    #[instrument(skip(self, patch), err)]
    pub async fn update(
        &self,
        id: ComponentId,
        patch: ComponentPatch,
    ) -> Result<Component, ServiceError> {
        for _ in 0..MAX_UPDATE_RETRIES {
            let mut component = self
                .components
                .get(id)
                .await?
                .ok_or(DomainError::NotFound)?;

            let previous_part_number = component.part_number.clone();
            let label_dirty = component.apply_patch(patch.clone(), Utc::now())?;

            if component.part_number != previous_part_number
                && self
                    .components
                    .find_by_part_number(&component.part_number)
                    .await?
                    .is_some()
            {
                return Err(DomainError::duplicate_key(component.part_number).into());
            }

            if label_dirty {
                component.label_payload = self.label_for(&component);
            }

            match self.components.update(component).await {
                Ok(updated) => return Ok(updated),
                Err(StoreError::StaleVersion(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Conflict(format!(
            "update for {id} lost {MAX_UPDATE_RETRIES} version races"
        )))
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: ComponentId) -> Result<(), ServiceError> {
        if !self.components.delete(id).await? {
            return Err(DomainError::NotFound.into());
        }
        info!(%id, "component deleted");
        Ok(())
    }

    pub async fn get(&self, id: ComponentId) -> Result<Component, ServiceError> {
        self.components
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound.into())
    }

    pub async fn find(&self, filter: &ComponentFilter) -> Result<Vec<Component>, ServiceError> {
        Ok(self.components.find(filter).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Component>, ServiceError> {
        Ok(self.components.list_all().await?)
    }

    /// Components at or below their critical threshold.
    pub async fn low_stock(&self) -> Result<Vec<Component>, ServiceError> {
        let all = self.components.list_all().await?;
        Ok(all
            .into_iter()
            .filter(|c| c.status() == labstock_registry::StockStatus::Low)
            .collect())
    }

    /// Components with no outward movement since `cutoff`.
    pub async fn stale_stock(&self, cutoff: DateTime<Utc>) -> Result<Vec<Component>, ServiceError> {
        let all = self.components.list_all().await?;
        Ok(all.into_iter().filter(|c| c.is_stale(cutoff)).collect())
    }
}
