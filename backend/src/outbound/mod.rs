//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL record store via Diesel, plus an in-memory
//!   store for database-less runs and tests.
//! - **security**: password hashing.
//!
//! Adapters are thin translators between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod persistence;
pub mod security;
