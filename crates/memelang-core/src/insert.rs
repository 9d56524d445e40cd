//! INSERT compiler (spec component C7, `put`).
//!
//! Every term in an expression becomes one row in whichever of
//! `node`/`numb`/`name` its target column lives in, sharing one body id per
//! expression. Rows for the same table are batched into a single
//! multi-row `INSERT ... ON CONFLICT (gid, bid, rid) DO NOTHING` so a
//! `put` job is one round trip per table rather than one per term.

use crate::ast::Tokens;
use crate::constants::{TABLE_NAME, TABLE_NODE, TABLE_NUMB};
use crate::error::{MemelangError, Result};
use crate::operand::Operand;
use crate::operator::{Column, OperatorTable};
use crate::resolver::{identify_or_create, Database, SqlValue, SymbolCache};

#[derive(Debug, Clone)]
pub struct CompiledInsert {
    /// One statement per table actually touched.
    pub statements: Vec<(String, Vec<SqlValue>)>,
}

struct Row {
    bid: i64,
    rid: i64,
    value: SqlValue,
}

pub fn compile_put(tokens: &mut Tokens, gid: i64, db: &dyn Database, cache: &mut SymbolCache) -> Result<CompiledInsert> {
    identify_or_create(tokens, gid, db, cache)?;

    let mut node_rows: Vec<Row> = Vec::new();
    let mut numb_rows: Vec<Row> = Vec::new();
    let mut name_rows: Vec<Row> = Vec::new();

    for expression in tokens.iter() {
        if expression.is_empty() {
            continue;
        }

        let mut terms = expression.iter();
        let bid = if expression[0].is_bid_marker() {
            let first = terms.next().unwrap();
            let rhs = first.rhs.as_ref().ok_or_else(|| MemelangError::ShapeViolation("'bid' term requires a value".into()))?;
            let id = rhs.as_id().ok_or_else(|| MemelangError::ShapeViolation("'bid' term's value must be an id".into()))?;
            id
        } else {
            db.next_id()?
        };

        for term in terms {
            let rid = term.lhs.as_ref().and_then(Operand::as_id).ok_or_else(|| MemelangError::ShapeViolation("every put term needs a resolved relation id".into()))?;
            let column = OperatorTable::column_of(term.op);
            let rhs = term.rhs.clone().ok_or_else(|| MemelangError::ShapeViolation("every put term needs a value".into()))?;

            match column {
                Column::Aid => {
                    let aid = rhs.as_id().ok_or_else(|| MemelangError::ShapeViolation("node rows require an id value".into()))?;
                    node_rows.push(Row { bid, rid, value: SqlValue::Id(aid) });
                }
                Column::Amt => {
                    let amt = rhs.as_amt().ok_or_else(|| MemelangError::ShapeViolation("numb rows require a numeric value".into()))?;
                    numb_rows.push(Row { bid, rid, value: SqlValue::Amt(amt) });
                }
                Column::Alp => {
                    let alp = rhs.as_str().ok_or_else(|| MemelangError::ShapeViolation("name rows require a string value".into()))?;
                    name_rows.push(Row { bid, rid, value: SqlValue::Alp(alp.to_string()) });
                }
                Column::Rid | Column::Bid => {
                    return Err(MemelangError::ShapeViolation("a put term cannot target rid/bid directly".into()));
                }
            }
        }
    }

    let mut statements = Vec::new();
    if !node_rows.is_empty() {
        statements.push(batch_insert(TABLE_NODE, "aid", gid, &node_rows));
    }
    if !numb_rows.is_empty() {
        statements.push(batch_insert(TABLE_NUMB, "amt", gid, &numb_rows));
    }
    if !name_rows.is_empty() {
        statements.push(batch_insert(TABLE_NAME, "alp", gid, &name_rows));
    }

    Ok(CompiledInsert { statements })
}

fn batch_insert(table: &str, value_col: &str, gid: i64, rows: &[Row]) -> (String, Vec<SqlValue>) {
    let mut params = Vec::with_capacity(rows.len() * 4);
    let mut tuples = Vec::with_capacity(rows.len());
    for row in rows {
        params.push(SqlValue::Id(gid));
        params.push(SqlValue::Id(row.bid));
        params.push(SqlValue::Id(row.rid));
        params.push(row.value.clone());
        let base = params.len() - 3;
        tuples.push(format!("(${}, ${}, ${}, ${})", base, base + 1, base + 2, base + 3));
    }
    let sql = format!(
        "INSERT INTO {table} (gid, bid, rid, {value_col}) VALUES {} ON CONFLICT (gid, bid, rid) DO NOTHING",
        tuples.join(", ")
    );
    (sql, params)
}

/// Run a compiled `put` job's statements and return the total affected row
/// count across every table touched.
pub fn execute_put(compiled: &CompiledInsert, db: &dyn Database) -> Result<u64> {
    let mut affected = 0u64;
    for (sql, params) in &compiled.statements {
        affected += db.execute(sql, params)?;
    }
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Term;
    use crate::operator::{CmpOp, LinkTier};
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeDb {
        next: RefCell<i64>,
        keys: RefCell<HashMap<String, i64>>,
    }

    impl Database for FakeDb {
        fn query(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<crate::resolver::Row>> {
            Ok(vec![])
        }
        fn execute(&self, _sql: &str, _params: &[SqlValue]) -> Result<u64> {
            Ok(1)
        }
        fn lookup_id(&self, _gid: i64, key: &str) -> Result<Option<i64>> {
            Ok(self.keys.borrow().get(key).copied())
        }
        fn lookup_ids(&self, _gid: i64, keys: &[String]) -> Result<Vec<(String, i64)>> {
            let bound = self.keys.borrow();
            Ok(keys.iter().filter_map(|key| bound.get(key).map(|id| (key.clone(), *id))).collect())
        }
        fn lookup_key(&self, _gid: i64, _id: i64) -> Result<Option<String>> {
            Ok(None)
        }
        fn lookup_keys(&self, _gid: i64, _ids: &[i64]) -> Result<Vec<(i64, String)>> {
            Ok(vec![])
        }
        fn next_id(&self) -> Result<i64> {
            let mut n = self.next.borrow_mut();
            *n += 1;
            Ok(*n)
        }
        fn bind_key(&self, _gid: i64, id: i64, key: &str) -> Result<()> {
            self.keys.borrow_mut().insert(key.to_string(), id);
            Ok(())
        }
    }

    #[test]
    fn new_keys_mint_ids_and_batch_by_table() {
        let db = FakeDb { next: RefCell::new(crate::constants::COR), keys: RefCell::new(HashMap::new()) };
        let mut tokens: Tokens = vec![vec![
            Term { op: OperatorTable::compose(LinkTier::End, Some(CmpOp::Eq)), lhs: Some(Operand::Str("child".into())), rhs: Some(Operand::Str("AbigailAdams".into())) },
            Term { op: OperatorTable::compose(LinkTier::And, Some(CmpOp::Eq)), lhs: Some(Operand::Str("parent".into())), rhs: Some(Operand::Str("JohnAdams".into())) },
        ]];
        let mut cache = SymbolCache::new();
        let compiled = compile_put(&mut tokens, 999, &db, &mut cache).unwrap();
        assert_eq!(compiled.statements.len(), 1);
        assert!(compiled.statements[0].0.contains("INSERT INTO node"));
    }
}
