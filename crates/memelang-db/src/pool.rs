use postgres::NoTls;
use r2d2_postgres::PostgresConnectionManager;

use memelang_core::error::{BackendError, MemelangError, Result};

use crate::config::DbConfig;

pub type Pool = r2d2::Pool<PostgresConnectionManager<NoTls>>;

/// Builds the connection pool, sized per [`DbConfig`] the way
/// `original_source/db.py`'s `ThreadedConnectionPool(minconn=1, maxconn=5)`
/// does.
pub fn build_pool(config: &DbConfig) -> Result<Pool> {
    let pg_config: postgres::Config = config
        .connection_string()
        .parse()
        .map_err(|e| MemelangError::Backend(BackendError::new(format!("invalid connection string: {e}"))))?;
    let manager = PostgresConnectionManager::new(pg_config, NoTls);
    r2d2::Pool::builder()
        .min_idle(Some(config.min_connections))
        .max_size(config.max_connections)
        .build(manager)
        .map_err(|e| MemelangError::Backend(BackendError::new(format!("failed to build connection pool: {e}"))))
}
