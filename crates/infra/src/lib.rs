//! `wardgate-infra` — storage and cache adapters behind the authorization
//! core's store traits.
//!
//! Two families: in-memory adapters for tests and embedded setups, and a
//! SQLite-backed store for single-node deployments.

pub mod memory;
pub mod sqlite;


pub use memory::{
    InMemoryMenuStore, InMemoryPermissionStore, InMemoryTaggedCache, InMemoryUserStore,
};
pub use sqlite::SqliteAdminStore;
