// Shieldgate storage layer
//
// Relational shape: workflows own steps and audit events (cascade delete);
// idempotency records stand alone, unique per (scope, key).

pub mod backend;
pub mod memory;
pub mod models;
pub mod repositories;

pub use backend::StorageBackend;
pub use memory::InMemoryDatabase;
pub use models::*;
pub use repositories::Database;
