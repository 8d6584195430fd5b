use thiserror::Error;

use labstock_core::DomainError;

/// Storage-level failure.
///
/// `Connection` is the transient bucket: safe to retry, never a domain
/// outcome. Everything else is deterministic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Compare-and-swap lost: the stored version moved under us.
    #[error("stale version for {0}")]
    StaleVersion(String),

    /// The referenced row does not exist.
    #[error("row not found")]
    NotFound,

    /// Transient connectivity/timeout failure; no partial state remains.
    #[error("store unavailable: {0}")]
    Connection(String),

    /// A stored row failed to decode into its domain shape.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Failure surfaced by the registry/movement services to the API boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Optimistic-concurrency retry budget exhausted; safe to retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A partial write was detected and could not be repaired. Should never
    /// be observable when the movement commit protocol is honored.
    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(key) => ServiceError::Domain(DomainError::duplicate_key(key)),
            StoreError::NotFound => ServiceError::Domain(DomainError::NotFound),
            StoreError::StaleVersion(id) => {
                ServiceError::Conflict(format!("version moved under write for {id}"))
            }
            other => ServiceError::Store(other),
        }
    }
}
