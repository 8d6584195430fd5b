//! The stock ledger's write path.
//!
//! `record` is the only way quantity changes. The commit protocol is:
//!
//! 1. load the component and compute the new on-hand quantity;
//! 2. compare-and-swap the quantity against the loaded version,
//!    retrying the whole read-compute-swap on `StaleVersion`;
//! 3. append the log entry only after the swap landed.
//!
//! If the append fails, the swap is reversed with a compensating
//! compare-and-swap so quantity and log never disagree. A reversal that
//! itself fails is surfaced as `ServiceError::Consistency`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use labstock_core::{DomainError, ExpectedVersion, StockLogId, UserId};
use labstock_ledger::{apply_direction, Direction, LogFilter, MovementDraft, StockLogEntry};
use labstock_registry::Component;

use crate::error::{ServiceError, StoreError};
use crate::repository::{ComponentRepository, OutwardStamp, StockLogRepository};

const MAX_CAS_RETRIES: u32 = 5;

pub struct MovementService {
    components: Arc<dyn ComponentRepository>,
    logs: Arc<dyn StockLogRepository>,
}

impl MovementService {
    pub fn new(
        components: Arc<dyn ComponentRepository>,
        logs: Arc<dyn StockLogRepository>,
    ) -> Self {
        Self { components, logs }
    }

    /// Record a movement: adjust the component's on-hand quantity and
    /// append the audit entry, atomically with respect to other movements
    /// against the same component.
    #[instrument(skip(self, draft), fields(component_id = %draft.component_id, direction = draft.direction.as_str()), err)]
    pub async fn record(
        &self,
        draft: MovementDraft,
        acting_user: UserId,
    ) -> Result<(StockLogEntry, Component), ServiceError> {
        draft.validate()?;
        let entry = draft.into_entry(acting_user, Utc::now());

        for attempt in 0..MAX_CAS_RETRIES {
            let component = self
                .components
                .get(entry.component_id)
                .await?
                .ok_or(DomainError::NotFound)?;

            let new_quantity = apply_direction(component.quantity, entry.direction, entry.quantity)?;
            let stamp = match entry.direction {
                Direction::Outward => OutwardStamp::Set(entry.effective_at),
                Direction::Inward => OutwardStamp::Keep,
            };

            let committed = match self
                .components
                .commit_movement(
                    entry.component_id,
                    ExpectedVersion::Exact(component.version),
                    new_quantity,
                    stamp,
                )
                .await
            {
                Ok(c) => c,
                Err(StoreError::StaleVersion(_)) => {
                    warn!(attempt, "movement commit lost the version race, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match self.logs.append(entry.clone()).await {
                Ok(entry) => {
                    info!(
                        entry_id = %entry.id,
                        quantity = entry.quantity,
                        on_hand = committed.quantity,
                        "movement recorded"
                    );
                    return Ok((entry, committed));
                }
                Err(append_err) => {
                    self.reverse(&entry, component.last_outwarded_at).await?;
                    return Err(append_err.into());
                }
            }
        }

        Err(ServiceError::Conflict(format!(
            "movement for {} lost {MAX_CAS_RETRIES} version races",
            entry.component_id
        )))
    }

    /// Compensating swap: undo the quantity change of an entry whose log
    /// append failed, restoring the pre-commit `last_outwarded_at` for
    /// outward movements. Retries its own version races, since unrelated
    /// movements may land in between.
    async fn reverse(
        &self,
        entry: &StockLogEntry,
        prior_outwarded_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), ServiceError> {
        let delta = match entry.direction {
            Direction::Inward => -entry.quantity,
            Direction::Outward => entry.quantity,
        };
        let stamp = match (entry.direction, prior_outwarded_at) {
            (Direction::Inward, _) => OutwardStamp::Keep,
            (Direction::Outward, Some(at)) => OutwardStamp::Set(at),
            (Direction::Outward, None) => OutwardStamp::Clear,
        };

        for _ in 0..MAX_CAS_RETRIES {
            let component = match self.components.get(entry.component_id).await {
                Ok(Some(c)) => c,
                Ok(None) | Err(_) => break,
            };

            match self
                .components
                .commit_movement(
                    entry.component_id,
                    ExpectedVersion::Exact(component.version),
                    component.quantity + delta,
                    stamp,
                )
                .await
            {
                Ok(_) => {
                    warn!(component_id = %entry.component_id, "movement reversed after failed log append");
                    return Ok(());
                }
                Err(StoreError::StaleVersion(_)) => continue,
                Err(_) => break,
            }
        }

        Err(ServiceError::Consistency(format!(
            "quantity adjusted but log append failed for {}, and the reversal did not land",
            entry.component_id
        )))
    }

    pub async fn get(&self, id: StockLogId) -> Result<StockLogEntry, ServiceError> {
        self.logs
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound.into())
    }

    pub async fn find(&self, filter: &LogFilter) -> Result<Vec<StockLogEntry>, ServiceError> {
        Ok(self.logs.find(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryInventoryStore;
    use async_trait::async_trait;
    use labstock_core::ComponentId;
    use labstock_registry::ComponentDraft;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Log repository that fails the next append once, for exercising the
    /// compensation path.
    struct FlakyLogs {
        inner: Arc<InMemoryInventoryStore>,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl StockLogRepository for FlakyLogs {
        async fn append(&self, entry: StockLogEntry) -> Result<StockLogEntry, StoreError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Connection("log write timed out".to_string()));
            }
            self.inner.append(entry).await
        }

        async fn get(&self, id: StockLogId) -> Result<Option<StockLogEntry>, StoreError> {
            StockLogRepository::get(self.inner.as_ref(), id).await
        }

        async fn find(
            &self,
            filter: &LogFilter,
        ) -> Result<Vec<StockLogEntry>, StoreError> {
            StockLogRepository::find(self.inner.as_ref(), filter).await
        }

        async fn list_all(&self) -> Result<Vec<StockLogEntry>, StoreError> {
            StockLogRepository::list_all(self.inner.as_ref()).await
        }
    }

    struct Fixture {
        store: Arc<InMemoryInventoryStore>,
        movements: MovementService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryInventoryStore::new());
        let movements = MovementService::new(store.clone(), store.clone());
        Fixture { store, movements }
    }

    async fn seed(store: &Arc<InMemoryInventoryStore>, quantity: i64) -> Component {
        let component = Component::create(
            ComponentDraft {
                name: "0603 resistor 100R".to_string(),
                part_number: "R-100".to_string(),
                category: "resistor".to_string(),
                location: "shelf A3".to_string(),
                datasheet_link: None,
                quantity: Some(quantity),
                unit_price_minor: None,
                critical_threshold: None,
            },
            String::new(),
            Utc::now(),
        )
        .unwrap();
        ComponentRepository::insert(store.as_ref(), component)
            .await
            .unwrap()
    }

    fn draft(component_id: ComponentId, direction: Direction, quantity: i64) -> MovementDraft {
        MovementDraft {
            component_id,
            direction,
            quantity,
            reason: "prototype build".to_string(),
            effective_at: None,
        }
    }

    #[tokio::test]
    async fn inward_then_outward_adjusts_quantity_and_logs() {
        let f = fixture();
        let c = seed(&f.store, 10).await;

        let (_, after_inward) = f
            .movements
            .record(draft(c.id, Direction::Inward, 5), UserId::new())
            .await
            .unwrap();
        assert_eq!(after_inward.quantity, 15);
        assert!(after_inward.last_outwarded_at.is_none());

        let (entry, after_outward) = f
            .movements
            .record(draft(c.id, Direction::Outward, 7), UserId::new())
            .await
            .unwrap();
        assert_eq!(after_outward.quantity, 8);
        assert_eq!(after_outward.last_outwarded_at, Some(entry.effective_at));

        let logs = f.movements.find(&LogFilter::default()).await.unwrap();
        assert_eq!(logs.len(), 2);
    }

    #[tokio::test]
    async fn rejected_overdraw_leaves_no_trace() {
        let f = fixture();
        let c = seed(&f.store, 4).await;

        let err = f
            .movements
            .record(draft(c.id, Direction::Outward, 10), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InsufficientStock {
                requested: 10,
                available: 4
            })
        ));

        let stored = ComponentRepository::get(f.store.as_ref(), c.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity, 4);
        assert_eq!(stored.version, c.version);
        assert!(f.movements.find(&LogFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn movement_against_missing_component_is_not_found() {
        let f = fixture();
        let err = f
            .movements
            .record(
                draft(ComponentId::new(), Direction::Inward, 1),
                UserId::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_overdraws_admit_exactly_one() {
        let f = fixture();
        let c = seed(&f.store, 10).await;
        let movements = Arc::new(f.movements);

        let a = {
            let movements = movements.clone();
            tokio::spawn(async move {
                movements
                    .record(draft(c.id, Direction::Outward, 7), UserId::new())
                    .await
            })
        };
        let b = {
            let movements = movements.clone();
            tokio::spawn(async move {
                movements
                    .record(draft(c.id, Direction::Outward, 7), UserId::new())
                    .await
            })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        for r in &results {
            if let Err(e) = r {
                assert!(matches!(
                    e,
                    ServiceError::Domain(DomainError::InsufficientStock { .. })
                ));
            }
        }

        let stored = ComponentRepository::get(f.store.as_ref(), c.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity, 3);
        assert_eq!(movements.find(&LogFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quantity_always_equals_log_sum() {
        let f = fixture();
        let c = seed(&f.store, 0).await;
        let user = UserId::new();

        let script = [
            (Direction::Inward, 100),
            (Direction::Outward, 30),
            (Direction::Inward, 7),
            (Direction::Outward, 77),
        ];
        for (direction, qty) in script {
            f.movements
                .record(draft(c.id, direction, qty), user)
                .await
                .unwrap();
        }

        let logs = f.movements.find(&LogFilter::default()).await.unwrap();
        let net: i64 = logs
            .iter()
            .map(|e| match e.direction {
                Direction::Inward => e.quantity,
                Direction::Outward => -e.quantity,
            })
            .sum();

        let stored = ComponentRepository::get(f.store.as_ref(), c.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity, net);
        assert_eq!(stored.quantity, 0);
    }

    #[tokio::test]
    async fn failed_append_restores_quantity_and_outward_stamp() {
        let store = Arc::new(InMemoryInventoryStore::new());
        let logs = Arc::new(FlakyLogs {
            inner: store.clone(),
            fail_next: AtomicBool::new(false),
        });
        let movements = MovementService::new(store.clone(), logs.clone());
        let c = seed(&store, 10).await;
        let user = UserId::new();

        let (first, _) = movements
            .record(draft(c.id, Direction::Outward, 2), user)
            .await
            .unwrap();

        logs.fail_next.store(true, Ordering::SeqCst);
        let err = movements
            .record(draft(c.id, Direction::Outward, 3), user)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Store(StoreError::Connection(_))
        ));

        let stored = ComponentRepository::get(store.as_ref(), c.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity, 8);
        // The stamp reflects the surviving movement, not the rolled-back one.
        assert_eq!(stored.last_outwarded_at, Some(first.effective_at));
        assert_eq!(movements.find(&LogFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_append_on_first_outward_clears_the_stamp() {
        let store = Arc::new(InMemoryInventoryStore::new());
        let logs = Arc::new(FlakyLogs {
            inner: store.clone(),
            fail_next: AtomicBool::new(true),
        });
        let movements = MovementService::new(store.clone(), logs.clone());
        let c = seed(&store, 10).await;

        movements
            .record(draft(c.id, Direction::Outward, 3), UserId::new())
            .await
            .unwrap_err();

        let stored = ComponentRepository::get(store.as_ref(), c.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity, 10);
        assert!(stored.last_outwarded_at.is_none());
    }
}
