//! Subprocess helper wrapping the `psql` CLI, the way
//! `original_source/db.py`'s `psql()` shells out for DDL that a pooled
//! client connection shouldn't (or can't, pre-database-creation) run.

use std::process::Command;

/// Runs `sql` against `dbname` as the invoking OS user.
pub fn run(dbname: &str, sql: &str) -> std::io::Result<()> {
    log::debug!("psql -d {dbname} -c {sql}");
    let status = Command::new("psql").arg("-d").arg(dbname).arg("-c").arg(sql).status()?;
    if !status.success() {
        return Err(std::io::Error::other(format!("psql exited with {status}")));
    }
    Ok(())
}

/// Runs `sql` against `dbname` as the `postgres` superuser, the way
/// database/role creation needs to before the target role exists.
pub fn run_as_superuser(dbname: &str, sql: &str) -> std::io::Result<()> {
    log::debug!("sudo -u postgres psql -d {dbname} -c {sql}");
    let status = Command::new("sudo").arg("-u").arg("postgres").arg("psql").arg("-d").arg(dbname).arg("-c").arg(sql).status()?;
    if !status.success() {
        return Err(std::io::Error::other(format!("psql exited with {status}")));
    }
    Ok(())
}
