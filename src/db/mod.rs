//! Database Module
//!
//! Generic paginated repository over a relational store reached through
//! `sqlx::Any`.

mod connection;
mod entity;
mod pagination;
mod query;
mod repository;

// Re-export public types
pub use connection::{Database, DbHandle};
pub use entity::{Base, Entity};
pub use pagination::{PaginationMetadata, MAX_ITEMS_PER_PAGE, MIN_ITEMS_PER_PAGE};
pub use query::{apply_scopes, scope, Order, Query, Scope, Value};
pub use repository::{GenericRepository, Repository};
