use std::cell::RefCell;
use std::collections::HashMap;

use memelang_core::{Database, Engine, MemelangError, Result, Row, SqlValue};

/// A tiny in-memory stand-in for `memelang-db`'s Postgres-backed
/// implementation, good enough to exercise the dispatcher end to end
/// without a real database.
struct MemoryDb {
    next_id: RefCell<i64>,
    keys: RefCell<HashMap<(i64, String), i64>>,
    rev: RefCell<HashMap<(i64, i64), String>>,
    node: RefCell<Vec<(i64, i64, i64, i64)>>, // gid, bid, rid, aid
}

impl MemoryDb {
    fn new() -> Self {
        MemoryDb {
            next_id: RefCell::new(1 << 29),
            keys: RefCell::new(HashMap::new()),
            rev: RefCell::new(HashMap::new()),
            node: RefCell::new(Vec::new()),
        }
    }
}

impl Database for MemoryDb {
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        // Only supports the single-term "FROM node n0 WHERE n0.gid=$1 AND n0.rid=$2" shape
        // produced for a bare "relation=aid" lookup, which is all this test drives.
        assert!(sql.contains("FROM node n0"));
        let gid = match &params[0] {
            SqlValue::Id(v) => *v,
            _ => panic!("gid must be an id"),
        };
        let rid = match &params[1] {
            SqlValue::Id(v) => *v,
            _ => panic!("rid must be an id"),
        };
        let rows = self
            .node
            .borrow()
            .iter()
            .filter(|(g, _, r, _)| *g == gid && *r == rid)
            .map(|(_, b, r, a)| Row(vec![Some(SqlValue::Id(*b)), Some(SqlValue::Id(*r)), Some(SqlValue::Id(*a))]))
            .collect();
        Ok(rows)
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        assert!(sql.starts_with("INSERT INTO node"));
        let mut inserted = 0u64;
        for chunk in params.chunks(4) {
            let gid = match &chunk[0] {
                SqlValue::Id(v) => *v,
                _ => unreachable!(),
            };
            let bid = match &chunk[1] {
                SqlValue::Id(v) => *v,
                _ => unreachable!(),
            };
            let rid = match &chunk[2] {
                SqlValue::Id(v) => *v,
                _ => unreachable!(),
            };
            let aid = match &chunk[3] {
                SqlValue::Id(v) => *v,
                _ => unreachable!(),
            };
            self.node.borrow_mut().push((gid, bid, rid, aid));
            inserted += 1;
        }
        Ok(inserted)
    }

    fn lookup_id(&self, gid: i64, key: &str) -> Result<Option<i64>> {
        Ok(self.keys.borrow().get(&(gid, key.to_string())).copied())
    }

    fn lookup_ids(&self, gid: i64, keys: &[String]) -> Result<Vec<(String, i64)>> {
        let bound = self.keys.borrow();
        Ok(keys.iter().filter_map(|key| bound.get(&(gid, key.clone())).map(|id| (key.clone(), *id))).collect())
    }

    fn lookup_key(&self, gid: i64, id: i64) -> Result<Option<String>> {
        Ok(self.rev.borrow().get(&(gid, id)).cloned())
    }

    fn lookup_keys(&self, gid: i64, ids: &[i64]) -> Result<Vec<(i64, String)>> {
        let bound = self.rev.borrow();
        Ok(ids.iter().filter_map(|id| bound.get(&(gid, *id)).map(|key| (*id, key.clone()))).collect())
    }

    fn next_id(&self) -> Result<i64> {
        let mut n = self.next_id.borrow_mut();
        *n += 1;
        Ok(*n)
    }

    fn bind_key(&self, gid: i64, id: i64, key: &str) -> Result<()> {
        self.keys.borrow_mut().insert((gid, key.to_string()), id);
        self.rev.borrow_mut().insert((gid, id), key.to_string());
        Ok(())
    }
}

#[test]
fn put_then_get_round_trips_through_the_dispatcher() {
    let db = MemoryDb::new();
    let mut engine = Engine::new(&db);

    let put_result = engine.query("j=put g=999\nchild=JohnAdams").unwrap();
    assert!(put_result.contains("child"));

    let get_result = engine.query("j=get g=999\nchild").unwrap();
    assert!(get_result.contains("child"));
    assert!(get_result.contains("JohnAdams"));
}

#[test]
fn unrecognized_job_is_rejected() {
    let db = MemoryDb::new();
    let mut engine = Engine::new(&db);
    let err = engine.query("j=bogus g=999\nchild").unwrap_err();
    assert!(matches!(err, MemelangError::InvalidJob(_)));
}
