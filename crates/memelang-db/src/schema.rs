//! DDL install/uninstall, grounded in `original_source/memelang.py`'s
//! `cli_tableadd`/`cli_tabledel`: one sequence seeded above
//! [`memelang_core::constants::COR`] plus the three backing tables with their
//! hash/value indexes.

use memelang_core::constants::{COR, TABLE_NAME, TABLE_NODE, TABLE_NUMB};

use crate::psql;

const TABLE_SEQN: &str = "seqn";

/// Statements that create the sequence, tables and indexes a fresh database
/// needs before it can serve jobs.
pub fn install_statements(user: &str) -> Vec<String> {
    let start = COR + 1;
    vec![
        format!("CREATE SEQUENCE {TABLE_SEQN} AS BIGINT START {start} INCREMENT 1 CACHE 1;"),
        format!("SELECT setval('{TABLE_SEQN}', {start}, false);"),
        format!(
            "CREATE TABLE {TABLE_NODE} (gid BIGINT, bid BIGINT, rid BIGINT, aid BIGINT, PRIMARY KEY (gid,bid,rid)); \
             CREATE INDEX {TABLE_NODE}_rid_idx ON {TABLE_NODE} USING hash (rid); \
             CREATE INDEX {TABLE_NODE}_aid_idx ON {TABLE_NODE} USING hash (aid);"
        ),
        format!(
            "CREATE TABLE {TABLE_NUMB} (gid BIGINT, bid BIGINT, rid BIGINT, amt DOUBLE PRECISION, PRIMARY KEY (gid,bid,rid)); \
             CREATE INDEX {TABLE_NUMB}_rid_idx ON {TABLE_NUMB} USING hash (rid); \
             CREATE INDEX {TABLE_NUMB}_amt_idx ON {TABLE_NUMB} (amt);"
        ),
        format!(
            "CREATE TABLE {TABLE_NAME} (gid BIGINT, bid BIGINT, rid BIGINT, alp VARCHAR(511), PRIMARY KEY (gid,bid,rid)); \
             CREATE INDEX {TABLE_NAME}_rid_idx ON {TABLE_NAME} USING hash (rid); \
             CREATE INDEX {TABLE_NAME}_alp_idx ON {TABLE_NAME} (LOWER(alp));"
        ),
        format!("GRANT USAGE, UPDATE ON SEQUENCE {TABLE_SEQN} TO {user};"),
        format!("GRANT SELECT, INSERT, UPDATE, DELETE ON TABLE {TABLE_NODE} TO {user};"),
        format!("GRANT SELECT, INSERT, UPDATE, DELETE ON TABLE {TABLE_NUMB} TO {user};"),
        format!("GRANT SELECT, INSERT, UPDATE, DELETE ON TABLE {TABLE_NAME} TO {user};"),
    ]
}

/// Statements that tear down everything [`install_statements`] created.
pub fn uninstall_statements() -> Vec<String> {
    vec![
        format!("DROP SEQUENCE IF EXISTS {TABLE_SEQN};"),
        format!("DROP TABLE IF EXISTS {TABLE_NODE};"),
        format!("DROP TABLE IF EXISTS {TABLE_NUMB};"),
        format!("DROP TABLE IF EXISTS {TABLE_NAME};"),
    ]
}

/// Runs [`install_statements`] against `dbname` via the `psql` CLI.
pub fn install(dbname: &str, user: &str) -> std::io::Result<()> {
    for stmt in install_statements(user) {
        psql::run(dbname, &stmt)?;
    }
    Ok(())
}

/// Runs [`uninstall_statements`] against `dbname` via the `psql` CLI.
pub fn uninstall(dbname: &str) -> std::io::Result<()> {
    for stmt in uninstall_statements() {
        psql::run(dbname, &stmt)?;
    }
    Ok(())
}

/// Creates the database and role itself, before tables can be installed into it.
pub fn dbadd(dbname: &str, user: &str, password: &str) -> std::io::Result<()> {
    psql::run_as_superuser("postgres", &format!("CREATE DATABASE {dbname};"))?;
    psql::run_as_superuser(
        "postgres",
        &format!("CREATE USER {user} WITH PASSWORD '{password}'; GRANT ALL PRIVILEGES ON DATABASE {dbname} to {user};"),
    )?;
    Ok(())
}
