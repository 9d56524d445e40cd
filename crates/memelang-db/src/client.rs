//! [`memelang_core::Database`] implementation over a pooled, synchronous
//! `postgres` connection — one blocking call per job, matching the
//! reference implementation's one-thread-per-request concurrency model
//! (spec §5).

use memelang_core::error::{BackendError, MemelangError, Result};
use memelang_core::{Database, Row, SqlValue};
use postgres::types::ToSql;

use crate::pool::Pool;

pub struct PostgresDatabase {
    pool: Pool,
}

impl PostgresDatabase {
    pub fn new(pool: Pool) -> Self {
        PostgresDatabase { pool }
    }

    fn get(&self) -> Result<r2d2::PooledConnection<r2d2_postgres::PostgresConnectionManager<postgres::NoTls>>> {
        self.pool.get().map_err(|e| MemelangError::Backend(BackendError::new(format!("failed to check out a connection: {e}"))))
    }
}

fn to_sql_params(params: &[SqlValue]) -> Vec<Box<dyn ToSql + Sync>> {
    params
        .iter()
        .map(|p| -> Box<dyn ToSql + Sync> {
            match p {
                SqlValue::Id(v) => Box::new(*v),
                SqlValue::Amt(v) => Box::new(*v),
                SqlValue::Alp(v) => Box::new(v.clone()),
            }
        })
        .collect()
}

fn row_to_sqlvalues(row: &postgres::Row) -> Row {
    let values = (0..row.len())
        .map(|i| {
            let column_type = row.columns()[i].type_();
            if *column_type == postgres::types::Type::INT8 {
                row.get::<_, Option<i64>>(i).map(SqlValue::Id)
            } else if *column_type == postgres::types::Type::FLOAT8 {
                row.get::<_, Option<f64>>(i).map(SqlValue::Amt)
            } else {
                row.get::<_, Option<String>>(i).map(SqlValue::Alp)
            }
        })
        .collect();
    Row(values)
}

impl Database for PostgresDatabase {
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let mut conn = self.get()?;
        let boxed = to_sql_params(params);
        let refs: Vec<&(dyn ToSql + Sync)> = boxed.iter().map(|b| b.as_ref()).collect();
        let rows = conn.query(sql, &refs).map_err(|e| MemelangError::Backend(BackendError::new(e.to_string())))?;
        Ok(rows.iter().map(row_to_sqlvalues).collect())
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let mut conn = self.get()?;
        let boxed = to_sql_params(params);
        let refs: Vec<&(dyn ToSql + Sync)> = boxed.iter().map(|b| b.as_ref()).collect();
        conn.execute(sql, &refs).map_err(|e| MemelangError::Backend(BackendError::new(e.to_string())))
    }

    fn lookup_id(&self, gid: i64, key: &str) -> Result<Option<i64>> {
        let mut conn = self.get()?;
        let row = conn
            .query_opt(
                "SELECT bid FROM name WHERE gid = $1 AND rid = $2 AND alp = $3",
                &[&gid, &memelang_core::constants::KEY_RELATION, &key],
            )
            .map_err(|e| MemelangError::Backend(BackendError::new(e.to_string())))?;
        Ok(row.map(|r| r.get::<_, i64>(0)))
    }

    fn lookup_ids(&self, gid: i64, keys: &[String]) -> Result<Vec<(String, i64)>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.get()?;
        let lowered: Vec<String> = keys.iter().map(|k| k.to_lowercase()).collect();
        let rows = conn
            .query(
                "SELECT alp, bid FROM name WHERE gid = $1 AND rid = $2 AND LOWER(alp) = ANY($3)",
                &[&gid, &memelang_core::constants::KEY_RELATION, &lowered],
            )
            .map_err(|e| MemelangError::Backend(BackendError::new(e.to_string())))?;
        Ok(rows.iter().map(|r| (r.get::<_, String>(0), r.get::<_, i64>(1))).collect())
    }

    fn lookup_key(&self, gid: i64, id: i64) -> Result<Option<String>> {
        let mut conn = self.get()?;
        let row = conn
            .query_opt(
                "SELECT alp FROM name WHERE gid = $1 AND bid = $2 AND rid = $3",
                &[&gid, &id, &memelang_core::constants::KEY_RELATION],
            )
            .map_err(|e| MemelangError::Backend(BackendError::new(e.to_string())))?;
        Ok(row.map(|r| r.get::<_, String>(0)))
    }

    fn lookup_keys(&self, gid: i64, ids: &[i64]) -> Result<Vec<(i64, String)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.get()?;
        let rows = conn
            .query(
                "SELECT bid, alp FROM name WHERE gid = $1 AND rid = $2 AND bid = ANY($3)",
                &[&gid, &memelang_core::constants::KEY_RELATION, &ids],
            )
            .map_err(|e| MemelangError::Backend(BackendError::new(e.to_string())))?;
        Ok(rows.iter().map(|r| (r.get::<_, i64>(0), r.get::<_, String>(1))).collect())
    }

    fn next_id(&self) -> Result<i64> {
        let mut conn = self.get()?;
        let row = conn.query_one("SELECT nextval('seqn')", &[]).map_err(|e| MemelangError::Backend(BackendError::new(e.to_string())))?;
        Ok(row.get::<_, i64>(0))
    }

    fn bind_key(&self, gid: i64, id: i64, key: &str) -> Result<()> {
        let mut conn = self.get()?;
        conn.execute(
            "INSERT INTO name (gid, bid, rid, alp) VALUES ($1, $2, $3, $4) ON CONFLICT (gid, bid, rid) DO NOTHING",
            &[&gid, &id, &memelang_core::constants::KEY_RELATION, &key],
        )
        .map_err(|e| MemelangError::Backend(BackendError::new(e.to_string())))?;
        Ok(())
    }
}
