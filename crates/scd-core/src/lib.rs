//! scd-core - Slowly-changing-dimension (Type 2) versioning engine.
//!
//! Every change to an entity is stored as a new immutable row. Rows of one
//! logical entity share a business id; each row has its own version uid and
//! a per-id version number. The engine answers "what is current", "what was
//! current at time T" and "what is the full history" for any type that
//! implements [`Entity`].
//!
//! # Example
//!
//! ```ignore
//! use scd_core::{Database, Direction, Filter, SqliteVersionStore, VersionStore};
//!
//! let store = SqliteVersionStore::<Job>::new(Database::open("scd.db")?)?;
//!
//! let v1 = store.create(job)?;
//! let v2 = store.update(&v1.version_uid(), Box::new(|mut j| { j.rate = 15.5; j }))?;
//!
//! let current = store.get_latest_version(&v1.business_id())?;
//! let before = store.get_version_at(&v1.business_id(), v2.created_at().unwrap())?;
//!
//! let active = store
//!     .query()
//!     .latest()
//!     .filter(Filter::eq("status", "active"))
//!     .order_by("created_at", Direction::Desc)
//!     .find()?;
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod query;
pub mod resolver;
pub mod row;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::StoreConfig;
pub use entity::{Column, ColumnType, Entity, SoftDelete};
pub use error::{ErrorCode, ScdError, ScdResult};
pub use query::{Direction, Filter, FilterOperator, QueryBuilder, SqlFragment};
pub use resolver::Resolution;
pub use store::{Database, SqliteVersionStore, Transform, VersionStore, VersionSummary};
