//! Key <-> id symbol resolver (spec component C5).
//!
//! `memelang-core` never talks to Postgres directly. Everything it needs
//! from a backing store — looking up a key's id, minting a new id, binding a
//! key to one, and running the compiled SQL — goes through the [`Database`]
//! trait, which `memelang-db` implements over a pooled `postgres` connection.

use ahash::RandomState;
use indexmap::IndexMap;

use crate::ast::Tokens;
use crate::error::{MemelangError, Result};
use crate::operand::Operand;
use crate::operator::Column;

pub type IndexMapA<K, V> = IndexMap<K, V, RandomState>;

/// A column value going into or coming out of the backing store, stripped of
/// any SQL-driver-specific type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Id(i64),
    Amt(f64),
    Alp(String),
}

/// One returned row, columns in the order the compiler asked for them.
#[derive(Debug, Clone, Default)]
pub struct Row(pub Vec<Option<SqlValue>>);

/// Everything a compiled job needs from a backing store.
pub trait Database {
    /// Run a compiled `SELECT` and return its rows.
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Run a compiled `INSERT`/`DELETE` and return the affected row count.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Look up the id bound to `key` within graph `gid`, if any.
    fn lookup_id(&self, gid: i64, key: &str) -> Result<Option<i64>>;

    /// Look up every id bound to any of `keys` within graph `gid` in one
    /// round trip. Matching is case-insensitive (`LOWER(alp)`); a key with
    /// no binding is simply absent from the result, not an error.
    fn lookup_ids(&self, gid: i64, keys: &[String]) -> Result<Vec<(String, i64)>>;

    /// Look up the key bound to `id` within graph `gid`, if any.
    fn lookup_key(&self, gid: i64, id: i64) -> Result<Option<String>>;

    /// Look up every key bound to any of `ids` within graph `gid` in one
    /// round trip.
    fn lookup_keys(&self, gid: i64, ids: &[i64]) -> Result<Vec<(i64, String)>>;

    /// Mint a new id, guaranteed greater than the reserved ceiling.
    fn next_id(&self) -> Result<i64>;

    /// Record that `id` is now bound to `key` within graph `gid`.
    fn bind_key(&self, gid: i64, id: i64, key: &str) -> Result<()>;
}

/// Forward/reverse key<->id cache, owned by an [`crate::Engine`] handle and
/// kept alive for the process lifetime: once a key has been seen by any job
/// run through the same `Engine`, no later job re-asks the backing store for
/// it. Keyed by `(gid, ...)` so one cache safely serves every graph a process
/// touches.
pub struct SymbolCache {
    forward: IndexMapA<(i64, String), i64>,
    reverse: IndexMapA<(i64, i64), String>,
    /// The highest id this cache has minted, across every graph. `put` never
    /// hands out an id at or below this value or at or below
    /// [`crate::constants::COR`].
    last_allocated: i64,
}

impl SymbolCache {
    pub fn new() -> Self {
        SymbolCache { forward: IndexMapA::default(), reverse: IndexMapA::default(), last_allocated: crate::constants::COR }
    }
}

impl Default for SymbolCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-job view over a [`SymbolCache`] and a [`Database`], so one
/// `decode` -> `identify`/`identify_or_create` -> `selectify`/`put` pipeline
/// never asks the backing store the same question twice, and nor does the
/// next job run through the same cache.
pub struct Resolver<'a> {
    db: &'a dyn Database,
    gid: i64,
    cache: &'a mut SymbolCache,
}

impl<'a> Resolver<'a> {
    pub fn new(db: &'a dyn Database, gid: i64, cache: &'a mut SymbolCache) -> Self {
        Resolver { db, gid, cache }
    }

    fn resolve(&mut self, key: &str) -> Result<Option<i64>> {
        if let Some(id) = self.cache.forward.get(&(self.gid, key.to_string())) {
            return Ok(Some(*id));
        }
        if let Some(id) = self.db.lookup_id(self.gid, key)? {
            self.cache.forward.insert((self.gid, key.to_string()), id);
            self.cache.reverse.insert((self.gid, id), key.to_string());
            return Ok(Some(id));
        }
        Ok(None)
    }

    /// Resolve every key in `keys` with exactly one `lookup_ids` round trip
    /// for whatever isn't already cached, returning a parallel `Vec` (`None`
    /// where a key has no binding).
    fn resolve_batch(&mut self, keys: &[String]) -> Result<Vec<Option<i64>>> {
        let mut misses: Vec<String> = Vec::new();
        for key in keys {
            if !self.cache.forward.contains_key(&(self.gid, key.clone())) && !misses.iter().any(|m| m == key) {
                misses.push(key.clone());
            }
        }
        if !misses.is_empty() {
            let found = self.db.lookup_ids(self.gid, &misses)?;
            for miss in &misses {
                if let Some((_, id)) = found.iter().find(|(k, _)| k.eq_ignore_ascii_case(miss)) {
                    self.cache.forward.insert((self.gid, miss.clone()), *id);
                    self.cache.reverse.insert((self.gid, *id), miss.clone());
                }
            }
        }
        Ok(keys.iter().map(|key| self.cache.forward.get(&(self.gid, key.clone())).copied()).collect())
    }

    fn unresolve(&mut self, id: i64) -> Result<Option<String>> {
        if let Some(key) = self.cache.reverse.get(&(self.gid, id)) {
            return Ok(Some(key.clone()));
        }
        if let Some(key) = self.db.lookup_key(self.gid, id)? {
            self.cache.reverse.insert((self.gid, id), key.clone());
            self.cache.forward.insert((self.gid, key.clone()), id);
            return Ok(Some(key));
        }
        Ok(None)
    }

    /// Reverse of [`Resolver::resolve_batch`]: one `lookup_keys` round trip
    /// for whatever id isn't already cached.
    fn unresolve_batch(&mut self, ids: &[i64]) -> Result<()> {
        let misses: Vec<i64> = ids.iter().copied().filter(|id| !self.cache.reverse.contains_key(&(self.gid, *id))).collect();
        if misses.is_empty() {
            return Ok(());
        }
        for (id, key) in self.db.lookup_keys(self.gid, &misses)? {
            self.cache.reverse.insert((self.gid, id), key.clone());
            self.cache.forward.insert((self.gid, key), id);
        }
        Ok(())
    }

    /// Get-or-create: used by `put`, where an unresolved key should mint a
    /// fresh id and bind it rather than error.
    fn resolve_or_create(&mut self, key: &str) -> Result<i64> {
        validate_key_charset(key)?;
        if let Some(id) = self.resolve(key)? {
            return Ok(id);
        }

        let id = self.db.next_id()?;
        if id <= crate::constants::COR || id <= self.cache.last_allocated {
            return Err(MemelangError::InvalidId(id));
        }
        self.cache.last_allocated = id;

        self.db.bind_key(self.gid, id, key)?;
        // `bind_key` is `ON CONFLICT DO NOTHING`, so a concurrent writer may
        // have already bound this key to a different id; the insert above
        // would then have silently no-op'd. Read back to catch that rather
        // than cache an id nothing actually points at.
        if let Some(actual) = self.db.lookup_id(self.gid, key)? {
            if actual != id {
                return Err(MemelangError::DuplicateKey { key: key.to_string(), existing: actual, attempted: id });
            }
        }

        self.cache.forward.insert((self.gid, key.to_string()), id);
        self.cache.reverse.insert((self.gid, id), key.to_string());
        Ok(id)
    }
}

fn validate_key_charset(key: &str) -> Result<()> {
    if key.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(MemelangError::Syntax(format!("key '{key}' must contain only letters and digits")))
    }
}

fn collect_keys(tokens: &Tokens, skip_bid_marker: bool) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut push = |key: &str| {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    };
    for expression in tokens {
        for term in expression {
            if skip_bid_marker && term.is_bid_marker() {
                continue;
            }
            if let Some(Operand::Str(key)) = &term.lhs {
                push(key);
            }
            let column = crate::operator::OperatorTable::column_of(term.op);
            if matches!(column, Column::Aid | Column::Bid) {
                if let Some(Operand::Str(key)) = &term.rhs {
                    push(key);
                }
            }
        }
    }
    keys
}

fn collect_ids(tokens: &Tokens) -> Vec<i64> {
    let mut ids: Vec<i64> = Vec::new();
    let mut push = |id: i64| {
        if !ids.contains(&id) {
            ids.push(id);
        }
    };
    for expression in tokens {
        for term in expression {
            if let Some(Operand::Id(id)) = term.lhs {
                push(id);
            }
            let column = crate::operator::OperatorTable::column_of(term.op);
            if matches!(column, Column::Aid | Column::Bid) {
                if let Some(Operand::Id(id)) = term.rhs {
                    push(id);
                }
            }
        }
    }
    ids
}

/// Resolve every id-bearing `Operand::Str` (relation names on the lhs, and
/// rhs values targeting `aid`/`bid`) to its backing-store id in one batched
/// round trip, failing with [`MemelangError::Unknown`] if a key has never
/// been bound. Used on the read path (`query`/`count`), which must not
/// silently mint new ids.
pub fn identify(tokens: &mut Tokens, gid: i64, db: &dyn Database, cache: &mut SymbolCache) -> Result<()> {
    let keys = collect_keys(tokens, false);
    let mut resolver = Resolver::new(db, gid, cache);
    let resolved = resolver.resolve_batch(&keys)?;
    let mut lookup: IndexMapA<String, i64> = IndexMapA::default();
    for (key, id) in keys.into_iter().zip(resolved) {
        if let Some(id) = id {
            lookup.insert(key, id);
        }
    }

    for expression in tokens.iter_mut() {
        for term in expression.iter_mut() {
            if let Some(Operand::Str(key)) = &term.lhs {
                let id = *lookup.get(key).ok_or_else(|| MemelangError::Unknown(key.clone()))?;
                term.lhs = Some(Operand::Id(id));
            }
            let column = crate::operator::OperatorTable::column_of(term.op);
            if matches!(column, Column::Aid | Column::Bid) {
                if let Some(Operand::Str(key)) = &term.rhs {
                    let id = *lookup.get(key).ok_or_else(|| MemelangError::Unknown(key.clone()))?;
                    term.rhs = Some(Operand::Id(id));
                }
            }
        }
    }
    Ok(())
}

/// Get-or-create variant of [`identify`], used by `put`: already-bound keys
/// are resolved with one batched `lookup_ids` round trip; unresolved keys
/// mint a fresh id and are bound before the insert runs (necessarily one
/// round trip per new key, since each needs its own id).
pub fn identify_or_create(tokens: &mut Tokens, gid: i64, db: &dyn Database, cache: &mut SymbolCache) -> Result<()> {
    let keys = collect_keys(tokens, true);
    let mut resolver = Resolver::new(db, gid, cache);
    resolver.resolve_batch(&keys)?;

    for expression in tokens.iter_mut() {
        for term in expression.iter_mut() {
            if term.is_bid_marker() {
                continue;
            }
            if let Some(Operand::Str(key)) = &term.lhs {
                let key = key.clone();
                let id = resolver.resolve_or_create(&key)?;
                term.lhs = Some(Operand::Id(id));
            }
            let column = crate::operator::OperatorTable::column_of(term.op);
            if matches!(column, Column::Aid | Column::Bid) {
                if let Some(Operand::Str(key)) = &term.rhs {
                    let key = key.clone();
                    let id = resolver.resolve_or_create(&key)?;
                    term.rhs = Some(Operand::Id(id));
                }
            }
        }
    }
    Ok(())
}

/// Reverse of [`identify`]: replace resolved ids with their key, where one
/// is bound, so results re-serialize as readable Memelang text rather than
/// raw ids. Ids with no bound key are left as-is (`encode` prints them as
/// `aNNN`). One batched `lookup_keys` round trip warms the cache before the
/// substitution pass runs.
pub fn keyify(tokens: &mut Tokens, gid: i64, db: &dyn Database, cache: &mut SymbolCache) -> Result<()> {
    let ids = collect_ids(tokens);
    let mut resolver = Resolver::new(db, gid, cache);
    resolver.unresolve_batch(&ids)?;

    for expression in tokens.iter_mut() {
        for term in expression.iter_mut() {
            if let Some(Operand::Id(id)) = term.lhs {
                if let Some(key) = resolver.unresolve(id)? {
                    term.lhs = Some(Operand::Str(key));
                }
            }
            let column = crate::operator::OperatorTable::column_of(term.op);
            if matches!(column, Column::Aid | Column::Bid) {
                if let Some(Operand::Id(id)) = term.rhs {
                    if let Some(key) = resolver.unresolve(id)? {
                        term.rhs = Some(Operand::Str(key));
                    }
                }
            }
        }
    }
    Ok(())
}
