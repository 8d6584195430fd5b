//! `labstock-infra` — persistence and orchestration.
//!
//! Repository traits per entity, an in-memory store (tests/dev) and a
//! Postgres store, plus the two services that own all writes:
//! `RegistryService` (component lifecycle) and `MovementService` (the
//! stock ledger's one consistency-critical operation).

pub mod error;
pub mod import;
pub mod label;
pub mod movement;
pub mod registry;
pub mod repository;
pub mod store;

pub use error::{ServiceError, StoreError};
pub use import::{ImportReport, ImportRowOutcome};
pub use label::{LabelEncoder, LabelRequest, PlainLabelEncoder};
pub use movement::MovementService;
pub use registry::RegistryService;
pub use repository::{ComponentRepository, OutwardStamp, StockLogRepository};
pub use store::{InMemoryInventoryStore, PostgresInventoryStore};
