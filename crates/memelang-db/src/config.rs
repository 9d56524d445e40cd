//! Connection configuration, loaded from `MEMELANG_*` environment variables
//! with defaults matching the reference implementation's `db.py`.

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            host: "localhost".to_string(),
            user: "memeuser".to_string(),
            password: "memepswd".to_string(),
            dbname: "memedb".to_string(),
            min_connections: 1,
            max_connections: 5,
        }
    }
}

impl DbConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        DbConfig {
            host: std::env::var("MEMELANG_HOST").unwrap_or(defaults.host),
            user: std::env::var("MEMELANG_USER").unwrap_or(defaults.user),
            password: std::env::var("MEMELANG_PASS").unwrap_or(defaults.password),
            dbname: std::env::var("MEMELANG_NAME").unwrap_or(defaults.dbname),
            min_connections: std::env::var("MEMELANG_POOL_MIN").ok().and_then(|s| s.parse().ok()).unwrap_or(defaults.min_connections),
            max_connections: std::env::var("MEMELANG_POOL_MAX").ok().and_then(|s| s.parse().ok()).unwrap_or(defaults.max_connections),
        }
    }

    pub fn connection_string(&self) -> String {
        format!("host={} user={} password={} dbname={}", self.host, self.user, self.password, self.dbname)
    }

    /// A connection string with no `dbname`, used for `CREATE DATABASE`
    /// against the server's default `postgres` database.
    pub fn admin_connection_string(&self) -> String {
        format!("host={} user={} password={} dbname=postgres", self.host, self.user, self.password)
    }
}
