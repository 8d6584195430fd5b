//! Store implementations behind the repository traits.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
