//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the record store and database probe ports,
//! backed by PostgreSQL through `diesel-async` with `bb8` pooling, plus the
//! in-memory store used when no database is configured.
//!
//! # Architecture
//!
//! - **Thin adapters**: stores only translate between Diesel rows and JSON
//!   records. Soft-delete and field-stripping policy live in the domain.
//! - **Internal models**: row structs (`models.rs`) and schema definitions
//!   (`schema.rs`) never leave this module.
//! - **Stable error codes**: every Diesel failure is mapped onto the
//!   data-layer taxonomy in `diesel_error_mapping.rs`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use b2b_api::outbound::persistence::{DbPool, DieselUserStore, PoolConfig};
//! use mockable::DefaultClock;
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/app")).await?;
//! let store = DieselUserStore::new(pool, Arc::new(DefaultClock));
//! ```

mod diesel_database_probe;
mod diesel_error_mapping;
mod diesel_user_store;
mod in_memory_record_store;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_database_probe::DieselDatabaseProbe;
pub use diesel_user_store::DieselUserStore;
pub use in_memory_record_store::InMemoryRecordStore;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
