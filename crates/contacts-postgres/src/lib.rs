//! PostgreSQL adapter for the contacts store port.

pub mod pool;
pub mod schema;
mod search;
pub mod store;

pub use pool::{connect, DatabaseConfig};
pub use store::PgContactStore;
