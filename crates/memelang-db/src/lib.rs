//! Postgres-backed [`memelang_core::Database`] implementation, schema
//! installer and `psql` helper.

pub mod client;
pub mod config;
pub mod pool;
pub mod psql;
pub mod schema;

pub use client::PostgresDatabase;
pub use config::DbConfig;
pub use pool::{build_pool, Pool};
