//! Persistence layer for the Seaway server.
//!
//! SQLite-backed vessel registry and position history. The in-memory
//! DashMap store is rebuilt from the latest rows at startup.

pub mod db;
pub mod vessels;

pub use db::{init_database, Database};
